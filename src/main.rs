mod categorizer;
mod cli;
mod db;
mod error;
mod fmt;
mod hooks;
mod importer;
mod models;
mod plugins;
mod reconciler;
mod registry;
mod reports;
mod reviewer;
mod settings;

use clap::{CommandFactory, Parser};

use cli::{AccountsCommands, Cli, Commands, ReportCommands, RulesCommands};

fn main() {
    let cli = Cli::parse();

    // All extension points are collected once here and passed down
    // explicitly; nothing below main reaches for global state.
    let hooks = plugins::collect_hooks();
    let registry = hooks.build_registry();

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir, &hooks),
        Commands::Accounts { command } => match command {
            AccountsCommands::Add {
                name,
                account_type,
                institution,
                last_four,
            } => cli::accounts::add(&name, &account_type, institution.as_deref(), last_four.as_deref()),
            AccountsCommands::List => cli::accounts::list(),
        },
        Commands::Import {
            file,
            account,
            format,
        } => cli::import::run(&file, &account, format.as_deref(), &registry),
        Commands::Categorize => cli::categorize::run(),
        Commands::Rules { command } => match command {
            RulesCommands::Add {
                pattern,
                category,
                vendor,
                match_type,
                priority,
            } => cli::rules::add(&pattern, &category, vendor.as_deref(), &match_type, priority),
            RulesCommands::List => cli::rules::list(),
            RulesCommands::Update {
                id,
                pattern,
                category,
                vendor,
                match_type,
                priority,
            } => cli::rules::update(
                id,
                pattern.as_deref(),
                category.as_deref(),
                vendor.as_deref(),
                match_type.as_deref(),
                priority,
            ),
            RulesCommands::Delete { id } => cli::rules::delete(id),
        },
        Commands::Review => cli::review::run(),
        Commands::Report { command } => match command {
            ReportCommands::Pnl {
                month,
                year,
                from_date,
                to_date,
            } => cli::report::pnl(month, year, from_date, to_date),
            ReportCommands::Expenses { month, year } => cli::report::expenses(month, year),
            ReportCommands::Tax { year } => cli::report::tax(year),
            ReportCommands::Cashflow { month, year } => cli::report::cashflow(month, year),
            ReportCommands::Flagged => cli::report::flagged(),
            ReportCommands::Balance => cli::report::balance(),
            ReportCommands::Plugin(args) => cli::report::plugin(&hooks, &args),
        },
        Commands::Importers => cli::importers::run(&registry),
        Commands::Status => cli::status::run(),
        Commands::Demo => cli::demo::run(),
        Commands::Backup { output } => cli::backup::run(output.as_deref()),
        Commands::Reconcile {
            account,
            month,
            balance,
        } => cli::reconcile::run(&account, &month, balance),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "tally", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
