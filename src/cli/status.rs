use crate::db;
use crate::error::Result;
use crate::settings::db_path;

pub fn run() -> Result<()> {
    let path = db_path();
    if !path.exists() {
        println!("No ledger found at {}. Run `tally init` first.", path.display());
        return Ok(());
    }
    let conn = db::open(&path)?;

    let count = |sql: &str| -> Result<i64> { Ok(conn.query_row(sql, [], |r| r.get(0))?) };
    let accounts = count("SELECT count(*) FROM accounts")?;
    let transactions = count("SELECT count(*) FROM transactions")?;
    let flagged = count("SELECT count(*) FROM transactions WHERE is_flagged = 1")?;
    let rules = count("SELECT count(*) FROM rules WHERE is_active = 1")?;
    let imports = count("SELECT count(*) FROM imports")?;

    println!("Ledger: {}", path.display());
    println!("  accounts:     {accounts}");
    println!("  transactions: {transactions}");
    println!("  flagged:      {flagged}");
    println!("  active rules: {rules}");
    println!("  imports:      {imports}");
    Ok(())
}
