//! Statement reconciliation: compare a statement's ending balance against
//! the ledger's running total through the end of a month and record the
//! outcome. Kept outside the import/categorize core.

use rusqlite::Connection;

use crate::error::{Result, TallyError};

pub struct ReconcileOutcome {
    pub statement_balance: f64,
    pub calculated_balance: f64,
    pub difference: f64,
    pub reconciled: bool,
}

/// Balances within a cent count as reconciled.
const TOLERANCE: f64 = 0.005;

pub fn reconcile_month(
    conn: &Connection,
    account_name: &str,
    month: &str, // YYYY-MM
    statement_balance: f64,
) -> Result<ReconcileOutcome> {
    let account_id: i64 = conn
        .query_row("SELECT id FROM accounts WHERE name = ?1", [account_name], |r| r.get(0))
        .map_err(|_| TallyError::UnknownAccount(account_name.to_string()))?;

    // Cash basis: everything dated through the last day of the month.
    let calculated: f64 = conn.query_row(
        "SELECT COALESCE(SUM(amount), 0) FROM transactions \
         WHERE account_id = ?1 AND date <= ?2 || '-31'",
        rusqlite::params![account_id, month],
        |r| r.get(0),
    )?;

    let difference = statement_balance - calculated;
    let reconciled = difference.abs() < TOLERANCE;

    conn.execute(
        "INSERT INTO reconciliations (account_id, month, statement_balance, calculated_balance, \
         is_reconciled, reconciled_at) VALUES (?1, ?2, ?3, ?4, ?5, datetime('now'))",
        rusqlite::params![account_id, month, statement_balance, calculated, reconciled as i64],
    )?;

    Ok(ReconcileOutcome {
        statement_balance,
        calculated_balance: calculated,
        difference,
        reconciled,
    })
}
