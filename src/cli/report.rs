use colored::Colorize;
use comfy_table::Table;

use super::parse_month_opt;
use crate::db;
use crate::error::{Result, TallyError};
use crate::fmt::money;
use crate::hooks::PluginHooks;
use crate::reports;
use crate::reviewer::flagged_transactions;
use crate::settings::db_path;

pub fn pnl(
    month: Option<String>,
    year: Option<i32>,
    from_date: Option<String>,
    to_date: Option<String>,
) -> Result<()> {
    let conn = db::open(&db_path())?;
    let (m_year, m_month) = parse_month_opt(&month);
    let report = reports::pnl(
        &conn,
        year.or(m_year),
        m_month,
        from_date.as_deref(),
        to_date.as_deref(),
    )?;

    let mut table = Table::new();
    table.set_header(vec!["Category", "Amount"]);
    for item in &report.income {
        table.add_row(vec![item.name.clone(), money(item.total)]);
    }
    table.add_row(vec!["Total Income".to_string(), money(report.total_income)]);
    for item in &report.expenses {
        table.add_row(vec![item.name.clone(), money(item.total)]);
    }
    table.add_row(vec!["Total Expenses".to_string(), money(report.total_expenses)]);
    println!("Profit & Loss\n{table}");

    let net = money(report.net);
    let net = if report.net >= 0.0 { net.green() } else { net.red() };
    println!("Net: {net}");
    Ok(())
}

pub fn expenses(month: Option<String>, year: Option<i32>) -> Result<()> {
    let conn = db::open(&db_path())?;
    let (m_year, m_month) = parse_month_opt(&month);
    let breakdown = reports::expense_breakdown(&conn, year.or(m_year), m_month)?;

    let mut table = Table::new();
    table.set_header(vec!["Category", "Amount", "Txns", "%"]);
    for item in &breakdown.categories {
        table.add_row(vec![
            item.name.clone(),
            money(item.total),
            item.count.to_string(),
            format!("{:.1}%", item.pct),
        ]);
    }
    println!("Expenses\n{table}");
    println!("Total: {}", money(breakdown.total));
    Ok(())
}

pub fn tax(year: Option<i32>) -> Result<()> {
    let conn = db::open(&db_path())?;
    let items = reports::tax_summary(&conn, year)?;

    let mut table = Table::new();
    table.set_header(vec!["Category", "Tax Line", "Type", "Amount"]);
    for item in &items {
        table.add_row(vec![
            item.name.clone(),
            item.tax_line.clone().unwrap_or_default(),
            item.category_type.clone(),
            money(item.total),
        ]);
    }
    println!("Tax Summary\n{table}");
    Ok(())
}

pub fn cashflow(month: Option<String>, year: Option<i32>) -> Result<()> {
    let conn = db::open(&db_path())?;
    let (m_year, m_month) = parse_month_opt(&month);
    let months = reports::cashflow(&conn, year.or(m_year), m_month)?;

    let mut table = Table::new();
    table.set_header(vec!["Month", "Inflows", "Outflows", "Net", "Running"]);
    for m in &months {
        table.add_row(vec![
            m.month.clone(),
            money(m.inflows),
            money(m.outflows),
            money(m.net),
            money(m.running_balance),
        ]);
    }
    println!("Cash Flow\n{table}");
    Ok(())
}

pub fn flagged() -> Result<()> {
    let conn = db::open(&db_path())?;
    let txns = flagged_transactions(&conn)?;
    if txns.is_empty() {
        println!("No flagged transactions.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Description", "Amount", "Account"]);
    for txn in &txns {
        table.add_row(vec![
            txn.id.to_string(),
            txn.date.clone(),
            txn.description.clone(),
            money(txn.amount),
            txn.account_name.clone(),
        ]);
    }
    println!("Flagged Transactions\n{table}");
    println!("{} to review. Run `tally review` to categorize them.", txns.len());
    Ok(())
}

pub fn balance() -> Result<()> {
    let conn = db::open(&db_path())?;
    let report = reports::balances(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["Account", "Type", "Balance"]);
    for account in &report.accounts {
        table.add_row(vec![
            account.name.clone(),
            account.account_type.clone(),
            money(account.balance),
        ]);
    }
    println!("Cash Position\n{table}");
    println!("Total: {}", money(report.total));
    Ok(())
}

/// Dispatch a plugin-contributed report command (clap's external
/// subcommand escape hatch hands us the raw argument list).
pub fn plugin(hooks: &PluginHooks, args: &[String]) -> Result<()> {
    let name = args.first().map(String::as_str).unwrap_or_default();
    let command = hooks.find_command("report", name).ok_or_else(|| {
        let mut msg = format!("report {name}");
        let available: Vec<String> = hooks
            .commands()
            .iter()
            .filter(|c| c.group == "report")
            .map(|c| format!("{} ({})", c.name, c.about))
            .collect();
        if !available.is_empty() {
            msg.push_str(&format!(" (plugin commands: {})", available.join(", ")));
        }
        TallyError::UnknownCommand(msg)
    })?;
    let mut conn = db::open(&db_path())?;
    (command.run)(&mut conn, &args[1..])
}
