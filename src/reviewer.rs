//! Manual review of flagged transactions: assign a category by hand and
//! optionally derive a new `contains` rule so the next import matches
//! automatically.

use rusqlite::Connection;

use crate::error::Result;

pub struct FlaggedTxn {
    pub id: i64,
    pub date: String,
    pub description: String,
    pub amount: f64,
    pub account_name: String,
}

pub struct CategoryChoice {
    pub id: i64,
    pub name: String,
    pub category_type: String,
}

pub fn flagged_transactions(conn: &Connection) -> Result<Vec<FlaggedTxn>> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.date, t.description, t.amount, a.name \
         FROM transactions t JOIN accounts a ON t.account_id = a.id \
         WHERE t.is_flagged = 1 ORDER BY t.date",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(FlaggedTxn {
                id: row.get(0)?,
                date: row.get(1)?,
                description: row.get(2)?,
                amount: row.get(3)?,
                account_name: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn active_categories(conn: &Connection) -> Result<Vec<CategoryChoice>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, category_type FROM categories \
         WHERE is_active = 1 ORDER BY category_type, name",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(CategoryChoice {
                id: row.get(0)?,
                name: row.get(1)?,
                category_type: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Assign a category to a reviewed transaction (clearing its flag) and
/// optionally record a derived rule for future imports.
pub fn apply_review(
    conn: &Connection,
    transaction_id: i64,
    category_id: i64,
    vendor: Option<&str>,
    rule_pattern: Option<&str>,
) -> Result<()> {
    conn.execute(
        "UPDATE transactions SET category_id = ?1, vendor = ?2, is_flagged = 0, flag_reason = NULL \
         WHERE id = ?3",
        rusqlite::params![category_id, vendor, transaction_id],
    )?;
    // An empty contains pattern would match everything; never record one.
    if let Some(pattern) = rule_pattern.map(str::trim).filter(|p| !p.is_empty()) {
        conn.execute(
            "INSERT INTO rules (pattern, match_type, vendor, category_id) \
             VALUES (?1, 'contains', ?2, ?3)",
            rusqlite::params![pattern, vendor, category_id],
        )?;
    }
    Ok(())
}
