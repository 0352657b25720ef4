pub mod accounts;
pub mod backup;
pub mod categorize;
pub mod demo;
pub mod import;
pub mod importers;
pub mod init;
pub mod reconcile;
pub mod report;
pub mod review;
pub mod rules;
pub mod status;

use clap::{Parser, Subcommand};

/// Split a YYYY-MM option into (year, month).
pub(crate) fn parse_month_opt(month: &Option<String>) -> (Option<i32>, Option<u32>) {
    if let Some(m) = month {
        if let Some((y, m)) = m.split_once('-') {
            return (y.parse().ok(), m.parse().ok());
        }
    }
    (None, None)
}

#[derive(Parser)]
#[command(name = "tally", about = "Cash-basis bookkeeping with rule-based categorization.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and initialize the ledger database.
    Init {
        /// Path for tally data (default: ~/Documents/tally)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Manage accounts.
    Accounts {
        #[command(subcommand)]
        command: AccountsCommands,
    },
    /// Import a CSV/XLSX export and auto-categorize new transactions.
    Import {
        /// Path to the file to import
        file: String,
        /// Account name to import into
        #[arg(long)]
        account: String,
        /// Importer format key (e.g. bofa_checking); skips auto-detection
        #[arg(long)]
        format: Option<String>,
    },
    /// Re-run categorization rules on uncategorized transactions.
    Categorize,
    /// Manage categorization rules.
    Rules {
        #[command(subcommand)]
        command: RulesCommands,
    },
    /// Interactively review flagged transactions.
    Review,
    /// Generate reports.
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },
    /// List registered file-format importers.
    Importers,
    /// Show ledger location and summary statistics.
    Status,
    /// Load sample data to explore tally.
    Demo,
    /// Back up the ledger database.
    Backup {
        /// Output path (default: <data_dir>/backups/tally-YYYYMMDD-HHMMSS.db)
        #[arg(long)]
        output: Option<String>,
    },
    /// Reconcile an account against a statement balance.
    Reconcile {
        /// Account name
        account: String,
        /// Month: YYYY-MM
        #[arg(long)]
        month: String,
        /// Statement ending balance
        #[arg(long)]
        balance: f64,
    },
    /// Generate shell completions.
    Completions {
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum AccountsCommands {
    /// Add a new account.
    Add {
        /// Account name, e.g. 'Biz Checking'
        name: String,
        /// Account type: checking, credit_card, line_of_credit, payroll
        #[arg(long = "type")]
        account_type: String,
        /// Institution name
        #[arg(long)]
        institution: Option<String>,
        /// Last 4 digits of the account number
        #[arg(long = "last-four")]
        last_four: Option<String>,
    },
    /// List all accounts.
    List,
}

#[derive(Subcommand)]
pub enum RulesCommands {
    /// Add a categorization rule.
    Add {
        /// Pattern to match against transaction descriptions
        pattern: String,
        /// Category name to assign
        #[arg(long)]
        category: String,
        /// Normalized vendor name to stamp on match
        #[arg(long)]
        vendor: Option<String>,
        /// Match type: contains, starts_with, regex
        #[arg(long = "match-type", default_value = "contains")]
        match_type: String,
        /// Rule priority (higher evaluated first)
        #[arg(long, default_value = "0")]
        priority: i64,
    },
    /// List active categorization rules.
    List,
    /// Update an existing rule.
    Update {
        /// Rule ID (shown in `tally rules list`)
        id: i64,
        #[arg(long)]
        pattern: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        vendor: Option<String>,
        #[arg(long = "match-type")]
        match_type: Option<String>,
        #[arg(long)]
        priority: Option<i64>,
    },
    /// Deactivate a rule by ID.
    Delete {
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Profit & Loss.
    Pnl {
        /// Month filter: YYYY-MM
        #[arg(long)]
        month: Option<String>,
        /// Year filter: YYYY
        #[arg(long)]
        year: Option<i32>,
        /// Start date: YYYY-MM-DD
        #[arg(long = "from")]
        from_date: Option<String>,
        /// End date: YYYY-MM-DD
        #[arg(long = "to")]
        to_date: Option<String>,
    },
    /// Expense breakdown with percentages.
    Expenses {
        #[arg(long)]
        month: Option<String>,
        #[arg(long)]
        year: Option<i32>,
    },
    /// Tax summary organized by tax line.
    Tax {
        #[arg(long)]
        year: Option<i32>,
    },
    /// Monthly cash flow with running balance.
    Cashflow {
        #[arg(long)]
        month: Option<String>,
        #[arg(long)]
        year: Option<i32>,
    },
    /// All flagged/uncategorized transactions.
    Flagged,
    /// Cash position per account.
    Balance,
    /// Plugin-contributed report commands (e.g. `report k1`).
    #[command(external_subcommand)]
    Plugin(Vec<String>),
}
