use comfy_table::Table;

use crate::db;
use crate::error::Result;
use crate::settings::db_path;

pub fn add(
    name: &str,
    account_type: &str,
    institution: Option<&str>,
    last_four: Option<&str>,
) -> Result<()> {
    let conn = db::open(&db_path())?;
    conn.execute(
        "INSERT INTO accounts (name, account_type, institution, last_four) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![name, account_type, institution, last_four],
    )?;
    println!("Added account '{name}' ({account_type})");
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = db::open(&db_path())?;
    let mut stmt = conn.prepare(
        "SELECT id, name, account_type, institution, last_four FROM accounts ORDER BY name",
    )?;
    let rows: Vec<(i64, String, String, Option<String>, Option<String>)> = stmt
        .query_map([], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Type", "Institution", "Last 4"]);
    for (id, name, account_type, institution, last_four) in rows {
        table.add_row(vec![
            id.to_string(),
            name,
            account_type,
            institution.unwrap_or_default(),
            last_four.unwrap_or_default(),
        ]);
    }
    println!("Accounts\n{table}");
    Ok(())
}
