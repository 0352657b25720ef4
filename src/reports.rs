//! Report queries. These are plain grouping aggregations over the
//! categorized ledger; the categorization core never depends on them.

use chrono::Datelike;
use rusqlite::Connection;

use crate::error::{Result, TallyError};

/// Date restriction shared by the reports. Defaults to the current year
/// when nothing is specified.
fn date_filter(
    year: Option<i32>,
    month: Option<u32>,
    from_date: Option<&str>,
    to_date: Option<&str>,
) -> Result<(String, Vec<String>)> {
    match (from_date, to_date) {
        (Some(from), Some(to)) => {
            return Ok((
                "t.date BETWEEN ?1 AND ?2".to_string(),
                vec![from.to_string(), to.to_string()],
            ));
        }
        (Some(_), None) | (None, Some(_)) => {
            return Err(TallyError::Other(
                "--from and --to must be specified together".to_string(),
            ));
        }
        (None, None) => {}
    }
    let prefix = match (year, month) {
        (Some(y), Some(m)) => format!("{y:04}-{m:02}"),
        (Some(y), None) => format!("{y}"),
        _ => format!("{}", chrono::Local::now().year()),
    };
    Ok(("t.date LIKE ?1".to_string(), vec![format!("{prefix}%")]))
}

fn to_sql_params(params: &[String]) -> Vec<&dyn rusqlite::types::ToSql> {
    params.iter().map(|p| p as &dyn rusqlite::types::ToSql).collect()
}

// ---------------------------------------------------------------------------
// P&L
// ---------------------------------------------------------------------------

pub struct CategoryTotal {
    pub name: String,
    pub total: f64,
}

pub struct PnlReport {
    pub income: Vec<CategoryTotal>,
    pub expenses: Vec<CategoryTotal>,
    pub total_income: f64,
    pub total_expenses: f64,
    pub net: f64,
}

pub fn pnl(
    conn: &Connection,
    year: Option<i32>,
    month: Option<u32>,
    from_date: Option<&str>,
    to_date: Option<&str>,
) -> Result<PnlReport> {
    let (clause, params) = date_filter(year, month, from_date, to_date)?;

    let income = category_totals(conn, &clause, &params, "income", "total DESC")?;
    let expenses = category_totals(conn, &clause, &params, "expense", "total ASC")?;

    let total_income: f64 = income.iter().map(|i| i.total).sum();
    let total_expenses: f64 = expenses.iter().map(|i| i.total).sum();

    Ok(PnlReport {
        income,
        expenses,
        total_income,
        total_expenses,
        net: total_income + total_expenses,
    })
}

fn category_totals(
    conn: &Connection,
    clause: &str,
    params: &[String],
    category_type: &str,
    order: &str,
) -> Result<Vec<CategoryTotal>> {
    let sql = format!(
        "SELECT c.name, SUM(t.amount) AS total \
         FROM transactions t JOIN categories c ON t.category_id = c.id \
         WHERE {clause} AND c.category_type = '{category_type}' \
         GROUP BY c.name ORDER BY {order}"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(to_sql_params(params).as_slice(), |row| {
        Ok(CategoryTotal {
            name: row.get(0)?,
            total: row.get(1)?,
        })
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

// ---------------------------------------------------------------------------
// Expense breakdown
// ---------------------------------------------------------------------------

pub struct ExpenseItem {
    pub name: String,
    pub total: f64,
    pub count: i64,
    pub pct: f64,
}

pub struct ExpenseBreakdown {
    pub categories: Vec<ExpenseItem>,
    pub total: f64,
}

pub fn expense_breakdown(
    conn: &Connection,
    year: Option<i32>,
    month: Option<u32>,
) -> Result<ExpenseBreakdown> {
    let (clause, params) = date_filter(year, month, None, None)?;
    let sql = format!(
        "SELECT c.name, SUM(t.amount) AS total, COUNT(*) \
         FROM transactions t JOIN categories c ON t.category_id = c.id \
         WHERE {clause} AND c.category_type = 'expense' \
         GROUP BY c.name ORDER BY total ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let raw: Vec<(String, f64, i64)> = stmt
        .query_map(to_sql_params(&params).as_slice(), |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let total: f64 = raw.iter().map(|(_, t, _)| t).sum();
    let categories = raw
        .into_iter()
        .map(|(name, t, count)| ExpenseItem {
            name,
            total: t,
            count,
            pct: if total != 0.0 { t / total * 100.0 } else { 0.0 },
        })
        .collect();

    Ok(ExpenseBreakdown { categories, total })
}

// ---------------------------------------------------------------------------
// Tax summary (grouped by tax line)
// ---------------------------------------------------------------------------

pub struct TaxItem {
    pub name: String,
    pub tax_line: Option<String>,
    pub category_type: String,
    pub total: f64,
}

pub fn tax_summary(conn: &Connection, year: Option<i32>) -> Result<Vec<TaxItem>> {
    let (clause, params) = date_filter(year, None, None, None)?;
    let sql = format!(
        "SELECT c.name, c.tax_line, c.category_type, SUM(t.amount) AS total \
         FROM transactions t JOIN categories c ON t.category_id = c.id \
         WHERE {clause} \
         GROUP BY c.name, c.tax_line, c.category_type \
         ORDER BY c.category_type DESC, c.tax_line"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(to_sql_params(&params).as_slice(), |row| {
        Ok(TaxItem {
            name: row.get(0)?,
            tax_line: row.get(1)?,
            category_type: row.get(2)?,
            total: row.get(3)?,
        })
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

// ---------------------------------------------------------------------------
// Cash flow
// ---------------------------------------------------------------------------

pub struct CashflowMonth {
    pub month: String,
    pub inflows: f64,
    pub outflows: f64,
    pub net: f64,
    pub running_balance: f64,
}

pub fn cashflow(
    conn: &Connection,
    year: Option<i32>,
    month: Option<u32>,
) -> Result<Vec<CashflowMonth>> {
    let (clause, params) = date_filter(year, month, None, None)?;
    let sql = format!(
        "SELECT substr(t.date, 1, 7) AS month, \
         SUM(CASE WHEN t.amount > 0 THEN t.amount ELSE 0 END), \
         SUM(CASE WHEN t.amount < 0 THEN t.amount ELSE 0 END) \
         FROM transactions t WHERE {clause} \
         GROUP BY substr(t.date, 1, 7) ORDER BY month"
    );
    let mut stmt = conn.prepare(&sql)?;
    let raw: Vec<(String, f64, f64)> = stmt
        .query_map(to_sql_params(&params).as_slice(), |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut months = Vec::new();
    let mut running = 0.0f64;
    for (m, inflows, outflows) in raw {
        running += inflows + outflows;
        months.push(CashflowMonth {
            month: m,
            inflows,
            outflows,
            net: inflows + outflows,
            running_balance: running,
        });
    }
    Ok(months)
}

// ---------------------------------------------------------------------------
// Cash position
// ---------------------------------------------------------------------------

pub struct AccountBalance {
    pub name: String,
    pub account_type: String,
    pub balance: f64,
}

pub struct BalanceReport {
    pub accounts: Vec<AccountBalance>,
    pub total: f64,
}

pub fn balances(conn: &Connection) -> Result<BalanceReport> {
    let mut stmt = conn.prepare(
        "SELECT a.name, a.account_type, COALESCE(SUM(t.amount), 0) AS balance \
         FROM accounts a LEFT JOIN transactions t ON a.id = t.account_id \
         GROUP BY a.id ORDER BY a.name",
    )?;
    let accounts: Vec<AccountBalance> = stmt
        .query_map([], |row| {
            Ok(AccountBalance {
                name: row.get(0)?,
                account_type: row.get(1)?,
                balance: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let total: f64 = accounts.iter().map(|a| a.balance).sum();
    Ok(BalanceReport { accounts, total })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_ledger, open};
    use crate::hooks::PluginHooks;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let mut conn = open(&dir.path().join("test.db")).unwrap();
        init_ledger(&mut conn, &PluginHooks::new()).unwrap();
        conn.execute(
            "INSERT INTO accounts (name, account_type) VALUES ('Biz', 'checking')",
            [],
        )
        .unwrap();
        (dir, conn)
    }

    fn insert_txn(conn: &Connection, date: &str, category: &str, amount: f64) {
        let category_id: i64 = conn
            .query_row("SELECT id FROM categories WHERE name = ?1", [category], |r| r.get(0))
            .unwrap();
        conn.execute(
            "INSERT INTO transactions (account_id, date, description, amount, category_id) \
             VALUES (1, ?1, 'txn', ?2, ?3)",
            rusqlite::params![date, amount, category_id],
        )
        .unwrap();
    }

    #[test]
    fn test_pnl_totals_by_type() {
        let (_dir, conn) = test_db();
        insert_txn(&conn, "2025-01-10", "Client Services", 5000.0);
        insert_txn(&conn, "2025-01-12", "Meals", -120.0);
        insert_txn(&conn, "2025-02-01", "Travel", -380.0);
        let report = pnl(&conn, Some(2025), None, None, None).unwrap();
        assert_eq!(report.total_income, 5000.0);
        assert_eq!(report.total_expenses, -500.0);
        assert_eq!(report.net, 4500.0);
        assert_eq!(report.income.len(), 1);
        assert_eq!(report.expenses.len(), 2);
    }

    #[test]
    fn test_pnl_month_filter() {
        let (_dir, conn) = test_db();
        insert_txn(&conn, "2025-01-10", "Client Services", 5000.0);
        insert_txn(&conn, "2025-02-10", "Client Services", 7000.0);
        let report = pnl(&conn, Some(2025), Some(2), None, None).unwrap();
        assert_eq!(report.total_income, 7000.0);
    }

    #[test]
    fn test_pnl_date_range_requires_both_bounds() {
        let (_dir, conn) = test_db();
        assert!(pnl(&conn, None, None, Some("2025-01-01"), None).is_err());
        assert!(pnl(&conn, None, None, None, Some("2025-12-31")).is_err());
    }

    #[test]
    fn test_expense_breakdown_percentages() {
        let (_dir, conn) = test_db();
        insert_txn(&conn, "2025-01-12", "Meals", -25.0);
        insert_txn(&conn, "2025-01-13", "Travel", -75.0);
        let breakdown = expense_breakdown(&conn, Some(2025), None).unwrap();
        assert_eq!(breakdown.total, -100.0);
        let meals = breakdown.categories.iter().find(|c| c.name == "Meals").unwrap();
        assert!((meals.pct - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_cashflow_running_balance() {
        let (_dir, conn) = test_db();
        insert_txn(&conn, "2025-01-10", "Client Services", 1000.0);
        insert_txn(&conn, "2025-01-20", "Meals", -100.0);
        insert_txn(&conn, "2025-02-05", "Travel", -200.0);
        let months = cashflow(&conn, Some(2025), None).unwrap();
        assert_eq!(months.len(), 2);
        assert_eq!(months[0].net, 900.0);
        assert_eq!(months[1].running_balance, 700.0);
    }

    #[test]
    fn test_tax_summary_carries_tax_lines() {
        let (_dir, conn) = test_db();
        insert_txn(&conn, "2025-01-12", "Meals", -120.0);
        let items = tax_summary(&conn, Some(2025)).unwrap();
        let meals = items.iter().find(|i| i.name == "Meals").unwrap();
        assert_eq!(meals.tax_line.as_deref(), Some("Line 24b"));
        assert_eq!(meals.category_type, "expense");
    }

    #[test]
    fn test_balances_per_account() {
        let (_dir, conn) = test_db();
        insert_txn(&conn, "2025-01-10", "Client Services", 1000.0);
        insert_txn(&conn, "2025-01-20", "Meals", -100.0);
        let report = balances(&conn).unwrap();
        assert_eq!(report.accounts.len(), 1);
        assert_eq!(report.total, 900.0);
    }
}
