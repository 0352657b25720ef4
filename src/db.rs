use std::path::Path;

use rusqlite::Connection;

use crate::error::Result;
use crate::hooks::{CategorySeed, PluginHooks};

/// Idempotent core schema. Plugins extend it through registered migrations.
pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS accounts (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    account_type TEXT NOT NULL,
    institution TEXT,
    last_four TEXT,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    parent_id INTEGER,
    category_type TEXT NOT NULL,
    tax_line TEXT,
    form_line TEXT,
    description TEXT,
    is_active INTEGER DEFAULT 1,
    FOREIGN KEY (parent_id) REFERENCES categories(id)
);

CREATE TABLE IF NOT EXISTS imports (
    id INTEGER PRIMARY KEY,
    filename TEXT NOT NULL,
    account_id INTEGER NOT NULL,
    import_date TEXT DEFAULT (datetime('now')),
    record_count INTEGER,
    date_range_start TEXT,
    date_range_end TEXT,
    checksum TEXT,
    FOREIGN KEY (account_id) REFERENCES accounts(id)
);

CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY,
    account_id INTEGER NOT NULL,
    date TEXT NOT NULL,
    description TEXT NOT NULL,
    amount REAL NOT NULL,
    category_id INTEGER,
    vendor TEXT,
    notes TEXT,
    is_flagged INTEGER DEFAULT 0,
    flag_reason TEXT,
    import_id INTEGER,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (account_id) REFERENCES accounts(id),
    FOREIGN KEY (category_id) REFERENCES categories(id),
    FOREIGN KEY (import_id) REFERENCES imports(id)
);

CREATE TABLE IF NOT EXISTS rules (
    id INTEGER PRIMARY KEY,
    pattern TEXT NOT NULL,
    match_type TEXT DEFAULT 'contains',
    vendor TEXT,
    category_id INTEGER NOT NULL,
    priority INTEGER DEFAULT 0,
    hit_count INTEGER DEFAULT 0,
    is_active INTEGER DEFAULT 1,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (category_id) REFERENCES categories(id)
);

CREATE TABLE IF NOT EXISTS reconciliations (
    id INTEGER PRIMARY KEY,
    account_id INTEGER NOT NULL,
    month TEXT NOT NULL,
    statement_balance REAL,
    calculated_balance REAL,
    is_reconciled INTEGER DEFAULT 0,
    reconciled_at TEXT,
    notes TEXT,
    FOREIGN KEY (account_id) REFERENCES accounts(id)
);
";

// (name, category_type, tax_line, form_line, description)
const DEFAULT_CATEGORIES: &[(&str, &str, Option<&str>, Option<&str>, &str)] = &[
    // Income
    ("Client Services", "income", Some("Gross receipts"), None, "Project fees, retainers"),
    ("Recurring Services", "income", Some("Gross receipts"), None, "Hosting, maintenance, support plans"),
    ("Reimbursements", "income", Some("Gross receipts"), None, "Client-reimbursed expenses"),
    ("Interest Income", "income", Some("Other income"), Some("K-4"), "Bank interest"),
    ("Other Income", "income", Some("Other income"), None, "Anything else"),
    // Expenses
    ("Advertising & Marketing", "expense", Some("Line 8"), Some("1120S-16"), "Ads, sponsorships"),
    ("Contract Labor", "expense", Some("Line 11"), Some("1120S-19"), "Freelancers, 1099 work"),
    ("Commissions & Fees", "expense", Some("Line 10"), Some("1120S-19"), "Platform and referral fees"),
    ("Insurance", "expense", Some("Line 15"), Some("1120S-19"), "Business insurance, E&O"),
    ("Legal & Professional", "expense", Some("Line 17"), Some("1120S-19"), "Accountant, lawyer"),
    ("Office Expense", "expense", Some("Line 18"), Some("1120S-19"), "Supplies, minor equipment"),
    ("Rent / Lease", "expense", Some("Line 20b"), Some("1120S-11"), "Office rent, coworking"),
    ("Software & Subscriptions", "expense", Some("Line 18/27a"), Some("1120S-19"), "SaaS tools, domains"),
    ("Hosting & Infrastructure", "expense", Some("Line 18/27a"), Some("1120S-19"), "Cloud servers, CDN"),
    ("Taxes & Licenses", "expense", Some("Line 23"), Some("1120S-12"), "Business licenses, state fees"),
    ("Travel", "expense", Some("Line 24a"), Some("1120S-19"), "Flights, hotels, conferences"),
    ("Meals", "expense", Some("Line 24b"), Some("1120S-19"), "Business meals (50% deductible)"),
    ("Utilities", "expense", Some("Line 25"), Some("1120S-19"), "Internet, phone (business portion)"),
    ("Payroll \u{2014} Wages", "expense", Some("Line 26"), Some("1120S-8"), "Employee salaries"),
    ("Payroll \u{2014} Taxes", "expense", Some("Line 23"), Some("1120S-12"), "Employer payroll taxes"),
    ("Payroll \u{2014} Benefits", "expense", Some("Line 14"), Some("1120S-18"), "Health insurance, retirement"),
    ("Bank & Merchant Fees", "expense", Some("Line 27a"), Some("1120S-19"), "Processor fees, wire fees"),
    ("Education & Training", "expense", Some("Line 27a"), Some("1120S-19"), "Courses, books, conferences"),
    ("Equipment", "expense", Some("Line 13"), Some("1120S-19"), "Hardware, major purchases"),
    ("Owner Draw / Distribution", "expense", Some("Not deductible"), Some("K-16d"), "Owner distributions"),
    ("Transfer", "expense", Some("Not deductible"), None, "Transfers between own accounts"),
    ("Uncategorized", "expense", Some("\u{2014}"), None, "Needs review"),
];

pub fn open(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

/// Create the schema, seed the default taxonomy, then apply plugin
/// migrations and category seeds in registration order. The whole
/// initialization is one transaction; safe to run against an
/// already-initialized ledger.
pub fn init_ledger(conn: &mut Connection, hooks: &PluginHooks) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(SCHEMA)?;

    let count: i64 = tx.query_row("SELECT count(*) FROM categories", [], |row| row.get(0))?;
    if count == 0 {
        for (name, category_type, tax_line, form_line, description) in DEFAULT_CATEGORIES {
            tx.execute(
                "INSERT INTO categories (name, category_type, tax_line, form_line, description) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![name, category_type, tax_line, form_line, description],
            )?;
        }
    }

    for migration in hooks.migrations() {
        migration(&tx)?;
    }
    seed_categories(&tx, hooks.categories())?;

    tx.commit()?;
    Ok(())
}

/// Insert seed categories whose name is not already present. Idempotent by
/// name, not by full row equality, so plugins can re-register on every run.
pub fn seed_categories(conn: &Connection, seeds: &[CategorySeed]) -> Result<()> {
    let mut exists_stmt = conn.prepare_cached("SELECT 1 FROM categories WHERE name = ?1")?;
    for seed in seeds {
        if exists_stmt.exists([&seed.name])? {
            continue;
        }
        conn.execute(
            "INSERT INTO categories (name, category_type, tax_line, form_line, description) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                seed.name,
                seed.category_type,
                seed.tax_line,
                seed.form_line,
                seed.description
            ],
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let mut conn = open(&dir.path().join("test.db")).unwrap();
        init_ledger(&mut conn, &PluginHooks::new()).unwrap();
        (dir, conn)
    }

    #[test]
    fn test_init_creates_core_tables() {
        let (_dir, conn) = test_db();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        for expected in &["accounts", "categories", "transactions", "rules", "imports", "reconciliations"] {
            assert!(tables.contains(&expected.to_string()), "missing table: {expected}");
        }
    }

    #[test]
    fn test_init_is_idempotent() {
        let (_dir, mut conn) = test_db();
        init_ledger(&mut conn, &PluginHooks::new()).unwrap();
        let count: i64 = conn.query_row("SELECT count(*) FROM categories", [], |r| r.get(0)).unwrap();
        assert_eq!(count as usize, super::DEFAULT_CATEGORIES.len());
    }

    #[test]
    fn test_default_taxonomy_has_both_types() {
        let (_dir, conn) = test_db();
        let income: i64 = conn
            .query_row("SELECT count(*) FROM categories WHERE category_type = 'income'", [], |r| r.get(0))
            .unwrap();
        let expense: i64 = conn
            .query_row("SELECT count(*) FROM categories WHERE category_type = 'expense'", [], |r| r.get(0))
            .unwrap();
        assert!(income >= 5, "expected >= 5 income categories, got {income}");
        assert!(expense >= 15, "expected >= 15 expense categories, got {expense}");
    }

    #[test]
    fn test_seed_categories_is_idempotent_by_name() {
        let (_dir, conn) = test_db();
        let seeds = vec![
            CategorySeed {
                name: "Charitable Contributions".into(),
                category_type: "expense".into(),
                tax_line: Some("K Line 12a".into()),
                form_line: Some("K-12a".into()),
                description: None,
            },
            // Already in the default taxonomy; must not be duplicated.
            CategorySeed {
                name: "Meals".into(),
                category_type: "expense".into(),
                tax_line: None,
                form_line: None,
                description: None,
            },
        ];
        seed_categories(&conn, &seeds).unwrap();
        seed_categories(&conn, &seeds).unwrap();
        let charitable: i64 = conn
            .query_row(
                "SELECT count(*) FROM categories WHERE name = 'Charitable Contributions'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        let meals: i64 = conn
            .query_row("SELECT count(*) FROM categories WHERE name = 'Meals'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(charitable, 1);
        assert_eq!(meals, 1);
    }

    #[test]
    fn test_plugin_migration_runs_at_init() {
        let dir = tempfile::tempdir().unwrap();
        let mut conn = open(&dir.path().join("test.db")).unwrap();
        let mut hooks = PluginHooks::new();
        hooks.add_migration(|conn| {
            conn.execute_batch("CREATE TABLE IF NOT EXISTS widgets (id INTEGER PRIMARY KEY)")?;
            Ok(())
        });
        init_ledger(&mut conn, &hooks).unwrap();
        // Idempotent DDL: a second init must not fail.
        init_ledger(&mut conn, &hooks).unwrap();
        let exists: bool = conn
            .prepare("SELECT 1 FROM sqlite_master WHERE type='table' AND name='widgets'")
            .unwrap()
            .exists([])
            .unwrap();
        assert!(exists);
    }
}
