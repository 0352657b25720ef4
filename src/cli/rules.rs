use comfy_table::Table;

use crate::db;
use crate::error::{Result, TallyError};
use crate::models::MatchType;
use crate::settings::db_path;

fn category_id(conn: &rusqlite::Connection, name: &str) -> Result<i64> {
    conn.query_row("SELECT id FROM categories WHERE name = ?1", [name], |row| row.get(0))
        .map_err(|_| TallyError::UnknownCategory(name.to_string()))
}

pub fn add(
    pattern: &str,
    category: &str,
    vendor: Option<&str>,
    match_type: &str,
    priority: i64,
) -> Result<()> {
    let match_type: MatchType = match_type.parse().map_err(TallyError::Other)?;
    let conn = db::open(&db_path())?;
    let cat_id = category_id(&conn, category)?;
    conn.execute(
        "INSERT INTO rules (pattern, match_type, vendor, category_id, priority) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![pattern, match_type.as_str(), vendor, cat_id, priority],
    )?;
    println!("Added rule: '{pattern}' \u{2192} {category}");
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = db::open(&db_path())?;
    let mut stmt = conn.prepare(
        "SELECT r.id, r.pattern, r.match_type, r.vendor, c.name, r.priority, r.hit_count \
         FROM rules r JOIN categories c ON r.category_id = c.id \
         WHERE r.is_active = 1 ORDER BY r.priority DESC, r.id",
    )?;
    let rows: Vec<(i64, String, String, Option<String>, String, i64, i64)> = stmt
        .query_map([], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Pattern", "Type", "Vendor", "Category", "Priority", "Hits"]);
    for (id, pattern, match_type, vendor, category, priority, hits) in rows {
        table.add_row(vec![
            id.to_string(),
            pattern,
            match_type,
            vendor.unwrap_or_default(),
            category,
            priority.to_string(),
            hits.to_string(),
        ]);
    }
    println!("Rules\n{table}");
    Ok(())
}

pub fn update(
    id: i64,
    pattern: Option<&str>,
    category: Option<&str>,
    vendor: Option<&str>,
    match_type: Option<&str>,
    priority: Option<i64>,
) -> Result<()> {
    let conn = db::open(&db_path())?;

    let exists: bool = conn.prepare("SELECT 1 FROM rules WHERE id = ?1")?.exists([id])?;
    if !exists {
        return Err(TallyError::Other(format!("No rule with ID {id}")));
    }

    if let Some(pattern) = pattern {
        conn.execute("UPDATE rules SET pattern = ?1 WHERE id = ?2", rusqlite::params![pattern, id])?;
    }
    if let Some(category) = category {
        let cat_id = category_id(&conn, category)?;
        conn.execute("UPDATE rules SET category_id = ?1 WHERE id = ?2", rusqlite::params![cat_id, id])?;
    }
    if let Some(vendor) = vendor {
        conn.execute("UPDATE rules SET vendor = ?1 WHERE id = ?2", rusqlite::params![vendor, id])?;
    }
    if let Some(match_type) = match_type {
        let match_type: MatchType = match_type.parse().map_err(TallyError::Other)?;
        conn.execute(
            "UPDATE rules SET match_type = ?1 WHERE id = ?2",
            rusqlite::params![match_type.as_str(), id],
        )?;
    }
    if let Some(priority) = priority {
        conn.execute("UPDATE rules SET priority = ?1 WHERE id = ?2", rusqlite::params![priority, id])?;
    }
    println!("Updated rule {id}");
    Ok(())
}

pub fn delete(id: i64) -> Result<()> {
    let conn = db::open(&db_path())?;
    let row: std::result::Result<(String, i64), _> = conn.query_row(
        "SELECT pattern, is_active FROM rules WHERE id = ?1",
        [id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    );
    match row {
        Err(_) => Err(TallyError::Other(format!("No rule with ID {id}"))),
        Ok((_, 0)) => Err(TallyError::Other(format!("Rule {id} is already inactive"))),
        Ok((pattern, _)) => {
            conn.execute("UPDATE rules SET is_active = 0 WHERE id = ?1", [id])?;
            println!("Deactivated rule {id}: '{pattern}'");
            Ok(())
        }
    }
}
