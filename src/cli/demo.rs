use crate::categorizer::categorize_transactions;
use crate::db;
use crate::error::Result;
use crate::settings::db_path;

const DEMO_TXNS: &[(&str, &str, f64)] = &[
    ("2025-01-06", "STRIPE TRANSFER ACME LLC", 4800.0),
    ("2025-01-08", "GITHUB, INC.", -21.00),
    ("2025-01-10", "DIGITALOCEAN.COM", -48.00),
    ("2025-01-14", "UNITED AIRLINES 0162347712", -412.60),
    ("2025-01-15", "SQ *CORNER CAFE", -18.35),
    ("2025-01-21", "STRIPE FEE", -139.20),
    ("2025-02-03", "STRIPE TRANSFER ACME LLC", 5200.0),
    ("2025-02-07", "ADOBE CREATIVE CLOUD", -59.99),
    ("2025-02-11", "DELTA AIR LINES ATLANTA", -289.40),
    ("2025-02-18", "UNKNOWN VENDOR 8841", -75.00),
];

const DEMO_RULES: &[(&str, &str, &str, i64)] = &[
    ("STRIPE TRANSFER", "contains", "Client Services", 10),
    ("STRIPE.*FEE", "regex", "Bank & Merchant Fees", 20),
    ("GITHUB", "contains", "Software & Subscriptions", 0),
    ("ADOBE", "contains", "Software & Subscriptions", 0),
    ("DIGITALOCEAN", "contains", "Hosting & Infrastructure", 0),
    ("UNITED AIR", "starts_with", "Travel", 0),
    ("DELTA AIR", "starts_with", "Travel", 0),
    ("SQ *", "starts_with", "Meals", 0),
];

pub fn run() -> Result<()> {
    let mut conn = db::open(&db_path())?;

    conn.execute(
        "INSERT OR IGNORE INTO accounts (name, account_type, institution) \
         VALUES ('Demo Checking', 'checking', 'Demo Bank')",
        [],
    )?;
    let account_id: i64 = conn.query_row(
        "SELECT id FROM accounts WHERE name = 'Demo Checking'",
        [],
        |r| r.get(0),
    )?;

    let tx = conn.transaction()?;
    for (date, description, amount) in DEMO_TXNS {
        tx.execute(
            "INSERT INTO transactions (account_id, date, description, amount, is_flagged, flag_reason) \
             VALUES (?1, ?2, ?3, ?4, 1, 'No matching rule')",
            rusqlite::params![account_id, date, description, amount],
        )?;
    }
    for (pattern, match_type, category, priority) in DEMO_RULES {
        let category_id: i64 = tx.query_row(
            "SELECT id FROM categories WHERE name = ?1",
            [category],
            |r| r.get(0),
        )?;
        tx.execute(
            "INSERT INTO rules (pattern, match_type, category_id, priority) \
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![pattern, match_type, category_id, priority],
        )?;
    }
    tx.commit()?;

    let pass = categorize_transactions(&mut conn)?;
    println!(
        "Demo data loaded: {} transactions, {} rules.",
        DEMO_TXNS.len(),
        DEMO_RULES.len()
    );
    println!("{} categorized, {} still flagged.", pass.categorized, pass.still_flagged);
    println!("Try `tally report pnl --year 2025` or `tally review`.");
    Ok(())
}
