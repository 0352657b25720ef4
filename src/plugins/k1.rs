//! K-1 preparation plugin. Contributes its own tables (entity config and
//! shareholders), three separately-stated categories, and a `report k1`
//! command that maps the categorized ledger onto Form 1120-S / Schedule K
//! line items and allocates them per shareholder.

use chrono::Datelike;
use comfy_table::Table;
use rusqlite::Connection;

use crate::error::Result;
use crate::fmt::money;
use crate::hooks::{CategorySeed, Plugin, PluginCommand, PluginHooks};

pub struct K1Plugin;

impl Plugin for K1Plugin {
    fn name(&self) -> &'static str {
        "k1"
    }

    fn register(&self, hooks: &mut PluginHooks) {
        hooks.add_migration(create_k1_tables);
        hooks.add_categories(k1_categories());
        hooks.add_command(PluginCommand {
            group: "report",
            name: "k1",
            about: "K-1 preparation worksheet (Form 1120-S)",
            run: run_k1_report,
        });
    }
}

fn create_k1_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS entity_config (
            id INTEGER PRIMARY KEY,
            key TEXT NOT NULL UNIQUE,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS shareholders (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            ownership_pct REAL NOT NULL,
            is_officer INTEGER DEFAULT 0,
            annual_compensation REAL DEFAULT 0
        );",
    )?;
    Ok(())
}

fn k1_categories() -> Vec<CategorySeed> {
    let seed = |name: &str, tax_line: &str, form_line: &str, description: &str| CategorySeed {
        name: name.into(),
        category_type: "expense".into(),
        tax_line: Some(tax_line.into()),
        form_line: Some(form_line.into()),
        description: Some(description.into()),
    };
    vec![
        seed(
            "Charitable Contributions",
            "K Line 12a",
            "K-12a",
            "Separately stated charitable contributions",
        ),
        seed(
            "Section 179 Equipment",
            "K Line 11",
            "K-11",
            "Equipment electing immediate deduction",
        ),
        seed(
            "Officer Compensation",
            "1120-S Line 7",
            "1120S-7",
            "Officer W-2 wages",
        ),
    ]
}

// ---------------------------------------------------------------------------
// Worksheet queries
// ---------------------------------------------------------------------------

fn sum_for_year(conn: &Connection, year: i32, where_clause: &str) -> Result<f64> {
    let sql = format!(
        "SELECT COALESCE(SUM(t.amount), 0) FROM transactions t \
         JOIN categories c ON t.category_id = c.id \
         WHERE t.date LIKE ?1 AND {where_clause}"
    );
    Ok(conn.query_row(&sql, [format!("{year}%")], |r| r.get(0))?)
}

fn form_line_total(conn: &Connection, year: i32, form_line: &str) -> Result<f64> {
    let total = conn.query_row(
        "SELECT COALESCE(SUM(t.amount), 0) FROM transactions t \
         JOIN categories c ON t.category_id = c.id \
         WHERE t.date LIKE ?1 AND c.form_line = ?2",
        rusqlite::params![format!("{year}%"), form_line],
        |r| r.get(0),
    )?;
    Ok(total)
}

pub struct Line19Item {
    pub name: String,
    pub full_amount: f64,
    pub deductible_amount: f64,
}

/// Line 19 "other deductions" broken out by category, meals at 50%.
pub fn line_19_detail(conn: &Connection, year: i32) -> Result<Vec<Line19Item>> {
    let mut stmt = conn.prepare(
        "SELECT c.name, COALESCE(SUM(t.amount), 0) AS total FROM transactions t \
         JOIN categories c ON t.category_id = c.id \
         WHERE t.date LIKE ?1 AND c.form_line = '1120S-19' \
         GROUP BY c.name ORDER BY total ASC",
    )?;
    let rows = stmt
        .query_map([format!("{year}%")], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows
        .into_iter()
        .map(|(name, total)| {
            let full = total.abs();
            let deductible = if name == "Meals" { full * 0.50 } else { full };
            Line19Item { name, full_amount: full, deductible_amount: deductible }
        })
        .collect())
}

pub struct ScheduleK {
    pub gross_receipts: f64,
    pub total_deductions: f64,
    pub ordinary_business_income: f64, // line 1
    pub interest_income: f64,          // line 4
    pub section_179: f64,              // line 11
    pub charitable: f64,               // line 12a
    pub distributions: f64,            // line 16d
}

pub fn schedule_k(conn: &Connection, year: i32) -> Result<ScheduleK> {
    let gross = sum_for_year(conn, year, "c.category_type = 'income'")?;

    // 1120-S page 1 deduction lines; Schedule K items are excluded here
    // and stated separately below.
    let mut deductions = 0.0;
    for line in ["1120S-7", "1120S-8", "1120S-11", "1120S-12", "1120S-16", "1120S-18"] {
        deductions += form_line_total(conn, year, line)?.abs();
    }
    deductions += line_19_detail(conn, year)?
        .iter()
        .map(|d| d.deductible_amount)
        .sum::<f64>();

    Ok(ScheduleK {
        gross_receipts: gross,
        total_deductions: deductions,
        ordinary_business_income: gross - deductions,
        interest_income: form_line_total(conn, year, "K-4")?,
        section_179: form_line_total(conn, year, "K-11")?.abs(),
        charitable: form_line_total(conn, year, "K-12a")?.abs(),
        distributions: form_line_total(conn, year, "K-16d")?.abs(),
    })
}

pub struct ShareholderWorksheet {
    pub name: String,
    pub ownership_pct: f64,
    pub line_1: f64,
    pub line_4: f64,
    pub line_11: f64,
    pub line_12a: f64,
    pub line_16d: f64,
}

pub fn shareholder_worksheets(conn: &Connection, year: i32) -> Result<Vec<ShareholderWorksheet>> {
    let k = schedule_k(conn, year)?;
    let mut stmt =
        conn.prepare("SELECT name, ownership_pct FROM shareholders ORDER BY name")?;
    let shareholders = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(shareholders
        .into_iter()
        .map(|(name, pct)| ShareholderWorksheet {
            name,
            ownership_pct: pct,
            line_1: k.ordinary_business_income * pct,
            line_4: k.interest_income * pct,
            line_11: k.section_179 * pct,
            line_12a: k.charitable * pct,
            line_16d: k.distributions * pct,
        })
        .collect())
}

// ---------------------------------------------------------------------------
// CLI command (registered under the `report` group)
// ---------------------------------------------------------------------------

fn parse_year_arg(args: &[String]) -> i32 {
    args.iter()
        .position(|a| a == "--year")
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
        .unwrap_or_else(|| chrono::Local::now().year())
}

fn run_k1_report(conn: &mut Connection, args: &[String]) -> Result<()> {
    let year = parse_year_arg(args);
    let k = schedule_k(conn, year)?;

    let mut table = Table::new();
    table.set_header(vec!["Line", "Item", "Amount"]);
    table.add_row(vec!["1a".into(), "Gross receipts".into(), money(k.gross_receipts)]);
    table.add_row(vec!["20".into(), "Total deductions".into(), money(-k.total_deductions)]);
    table.add_row(vec![
        "21".into(),
        "Ordinary business income".into(),
        money(k.ordinary_business_income),
    ]);
    table.add_row(vec!["K-4".into(), "Interest income".into(), money(k.interest_income)]);
    table.add_row(vec!["K-11".into(), "Section 179 deduction".into(), money(-k.section_179)]);
    table.add_row(vec!["K-12a".into(), "Charitable contributions".into(), money(-k.charitable)]);
    table.add_row(vec!["K-16d".into(), "Distributions".into(), money(k.distributions)]);
    println!("1120-S worksheet \u{2014} tax year {year}\n{table}");

    let detail = line_19_detail(conn, year)?;
    if !detail.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Category", "Full", "Deductible"]);
        for item in &detail {
            let label = if item.name == "Meals" {
                format!("{} (50%)", item.name)
            } else {
                item.name.clone()
            };
            table.add_row(vec![label, money(item.full_amount), money(item.deductible_amount)]);
        }
        println!("\nOther deductions (Line 19)\n{table}");
    }

    for ws in shareholder_worksheets(conn, year)? {
        let mut table = Table::new();
        table.set_header(vec!["Line", "Amount"]);
        table.add_row(vec!["1: Ordinary business income".into(), money(ws.line_1)]);
        table.add_row(vec!["4: Interest income".into(), money(ws.line_4)]);
        table.add_row(vec!["11: Section 179".into(), money(-ws.line_11)]);
        table.add_row(vec!["12a: Charitable".into(), money(-ws.line_12a)]);
        table.add_row(vec!["16d: Distributions".into(), money(ws.line_16d)]);
        println!(
            "\nK-1 worksheet \u{2014} {} ({:.0}%)\n{table}",
            ws.name,
            ws.ownership_pct * 100.0
        );
    }

    let flagged: i64 = conn.query_row(
        "SELECT count(*) FROM transactions WHERE date LIKE ?1 AND is_flagged = 1",
        [format!("{year}%")],
        |r| r.get(0),
    )?;
    if flagged > 0 {
        println!("\nWARNING: {flagged} uncategorized transactions in {year}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_ledger, open};
    use crate::plugins;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let mut conn = open(&dir.path().join("test.db")).unwrap();
        init_ledger(&mut conn, &plugins::collect_hooks()).unwrap();
        (dir, conn)
    }

    fn insert_txn(conn: &Connection, date: &str, category: &str, amount: f64) {
        conn.execute(
            "INSERT INTO accounts (name, account_type) VALUES ('A', 'checking') \
             ON CONFLICT(name) DO NOTHING",
            [],
        )
        .unwrap();
        let account_id: i64 =
            conn.query_row("SELECT id FROM accounts WHERE name = 'A'", [], |r| r.get(0)).unwrap();
        let category_id: i64 = conn
            .query_row("SELECT id FROM categories WHERE name = ?1", [category], |r| r.get(0))
            .unwrap();
        conn.execute(
            "INSERT INTO transactions (account_id, date, description, amount, category_id) \
             VALUES (?1, ?2, 'txn', ?3, ?4)",
            rusqlite::params![account_id, date, amount, category_id],
        )
        .unwrap();
    }

    #[test]
    fn test_migration_creates_plugin_tables() {
        let (_dir, conn) = test_db();
        for table in ["entity_config", "shareholders"] {
            let exists: bool = conn
                .prepare("SELECT 1 FROM sqlite_master WHERE type='table' AND name = ?1")
                .unwrap()
                .exists([table])
                .unwrap();
            assert!(exists, "missing plugin table: {table}");
        }
    }

    #[test]
    fn test_plugin_categories_are_seeded() {
        let (_dir, conn) = test_db();
        let form_line: Option<String> = conn
            .query_row(
                "SELECT form_line FROM categories WHERE name = 'Officer Compensation'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(form_line.as_deref(), Some("1120S-7"));
    }

    #[test]
    fn test_schedule_k_meals_at_half() {
        let (_dir, conn) = test_db();
        insert_txn(&conn, "2025-02-01", "Client Services", 10000.0);
        insert_txn(&conn, "2025-02-10", "Meals", -200.0);
        insert_txn(&conn, "2025-02-11", "Travel", -300.0);
        let k = schedule_k(&conn, 2025).unwrap();
        assert_eq!(k.gross_receipts, 10000.0);
        // Meals deductible at 50%: 100 + travel 300
        assert!((k.total_deductions - 400.0).abs() < 1e-9);
        assert!((k.ordinary_business_income - 9600.0).abs() < 1e-9);
    }

    #[test]
    fn test_schedule_k_ignores_other_years() {
        let (_dir, conn) = test_db();
        insert_txn(&conn, "2024-12-31", "Client Services", 5000.0);
        insert_txn(&conn, "2025-01-01", "Client Services", 1000.0);
        let k = schedule_k(&conn, 2025).unwrap();
        assert_eq!(k.gross_receipts, 1000.0);
    }

    #[test]
    fn test_shareholder_allocation_is_pro_rata() {
        let (_dir, conn) = test_db();
        insert_txn(&conn, "2025-02-01", "Client Services", 10000.0);
        conn.execute(
            "INSERT INTO shareholders (name, ownership_pct) VALUES ('Ann', 0.6), ('Bob', 0.4)",
            [],
        )
        .unwrap();
        let worksheets = shareholder_worksheets(&conn, 2025).unwrap();
        assert_eq!(worksheets.len(), 2);
        assert_eq!(worksheets[0].name, "Ann");
        assert!((worksheets[0].line_1 - 6000.0).abs() < 1e-9);
        assert!((worksheets[1].line_1 - 4000.0).abs() < 1e-9);
    }

    #[test]
    fn test_year_arg_parsing() {
        let args: Vec<String> = vec!["--year".into(), "2024".into()];
        assert_eq!(parse_year_arg(&args), 2024);
        let current = chrono::Local::now().year();
        assert_eq!(parse_year_arg(&[]), current);
    }
}
