use colored::Colorize;

use crate::db;
use crate::error::Result;
use crate::fmt::money;
use crate::reconciler::reconcile_month;
use crate::settings::db_path;

pub fn run(account: &str, month: &str, balance: f64) -> Result<()> {
    let conn = db::open(&db_path())?;
    let outcome = reconcile_month(&conn, account, month, balance)?;

    println!("Statement balance:  {}", money(outcome.statement_balance));
    println!("Calculated balance: {}", money(outcome.calculated_balance));
    if outcome.reconciled {
        println!("{}", "Reconciled.".green());
    } else {
        println!(
            "{} difference: {}",
            "Not reconciled.".red(),
            money(outcome.difference)
        );
    }
    Ok(())
}
