use regex::RegexBuilder;
use rusqlite::Connection;

use crate::error::Result;
use crate::models::MatchType;

struct ActiveRule {
    id: i64,
    pattern: String,
    match_type: MatchType,
    vendor: Option<String>,
    category_id: i64,
}

fn rule_matches(description: &str, rule: &ActiveRule) -> bool {
    match rule.match_type {
        MatchType::Contains => description
            .to_uppercase()
            .contains(&rule.pattern.to_uppercase()),
        MatchType::StartsWith => description
            .to_uppercase()
            .starts_with(&rule.pattern.to_uppercase()),
        // User-supplied pattern; an invalid regex never matches rather
        // than aborting the whole pass.
        MatchType::Regex => RegexBuilder::new(&rule.pattern)
            .case_insensitive(true)
            .build()
            .map(|re| re.is_match(description))
            .unwrap_or(false),
    }
}

pub struct CategorizeOutcome {
    pub categorized: usize,
    pub still_flagged: usize,
}

/// Apply active rules, highest priority first, to every uncategorized
/// transaction. First match wins: the transaction gets the rule's category
/// and vendor, its flag is cleared, and the rule's hit_count increments.
/// Only null-category rows are ever touched, so re-running is idempotent
/// and never overwrites manual corrections. One transaction per pass.
pub fn categorize_transactions(conn: &mut Connection) -> Result<CategorizeOutcome> {
    let tx = conn.transaction()?;

    let rules: Vec<ActiveRule> = {
        let mut stmt = tx.prepare(
            "SELECT id, pattern, match_type, vendor, category_id FROM rules \
             WHERE is_active = 1 ORDER BY priority DESC, id",
        )?;
        let mapped = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })?;
        mapped
            .collect::<std::result::Result<Vec<_>, _>>()?
            .into_iter()
            .filter_map(|(id, pattern, match_type, vendor, category_id)| {
                // Rows with an unrecognized match_type are skipped, not fatal.
                let match_type = match_type.parse().ok()?;
                Some(ActiveRule { id, pattern, match_type, vendor, category_id })
            })
            .collect()
    };

    let uncategorized: Vec<(i64, String)> = {
        let mut stmt =
            tx.prepare("SELECT id, description FROM transactions WHERE category_id IS NULL")?;
        let mapped = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        mapped.collect::<std::result::Result<Vec<_>, _>>()?
    };

    let mut categorized = 0usize;
    let mut still_flagged = 0usize;

    {
        let mut assign_stmt = tx.prepare_cached(
            "UPDATE transactions SET category_id = ?1, vendor = ?2, is_flagged = 0, flag_reason = NULL \
             WHERE id = ?3",
        )?;
        let mut hit_stmt =
            tx.prepare_cached("UPDATE rules SET hit_count = hit_count + 1 WHERE id = ?1")?;

        for (txn_id, description) in &uncategorized {
            match rules.iter().find(|rule| rule_matches(description, rule)) {
                Some(rule) => {
                    assign_stmt.execute(rusqlite::params![rule.category_id, rule.vendor, txn_id])?;
                    hit_stmt.execute([rule.id])?;
                    categorized += 1;
                }
                // Unmatched stays flagged; flag_reason was set at import.
                None => still_flagged += 1,
            }
        }
    }

    tx.commit()?;

    Ok(CategorizeOutcome {
        categorized,
        still_flagged,
    })
}
