use std::path::Path;

use rusqlite::Connection;
use sha2::{Digest, Sha256};

use crate::error::{Result, TallyError};
use crate::models::NormalizedRow;
use crate::registry::ImporterRegistry;

/// Outcome of one import invocation. `duplicate_file == true` implies the
/// counts are zero and nothing was written.
#[derive(Debug)]
pub struct ImportOutcome {
    pub imported: usize,
    pub skipped: usize,
    pub duplicate_file: bool,
}

fn compute_checksum(file_path: &Path) -> Result<String> {
    let data = std::fs::read(file_path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

/// Natural-key duplicate predicate: (account, date, amount, description).
/// Known limitation: two genuinely distinct transactions sharing all four
/// fields (e.g. two identical same-day purchases) are indistinguishable
/// from a re-import, and the second is dropped.
fn is_duplicate_row(conn: &Connection, account_id: i64, row: &NormalizedRow) -> Result<bool> {
    let mut stmt = conn.prepare_cached(
        "SELECT 1 FROM transactions \
         WHERE account_id = ?1 AND date = ?2 AND amount = ?3 AND description = ?4",
    )?;
    Ok(stmt.exists(rusqlite::params![account_id, row.date, row.amount, row.description])?)
}

/// Import one source file into the named account: whole-file checksum
/// dedup, row-level natural-key dedup, batch provenance record, and the
/// importer's post-import hook, all committed as one transaction.
pub fn import_file(
    conn: &mut Connection,
    registry: &ImporterRegistry,
    file_path: &Path,
    account_name: &str,
    format_key: Option<&str>,
) -> Result<ImportOutcome> {
    let (account_id, account_type) = {
        let mut stmt = conn.prepare("SELECT id, account_type FROM accounts WHERE name = ?1")?;
        stmt.query_row([account_name], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })
        .map_err(|_| TallyError::UnknownAccount(account_name.to_string()))?
    };

    let checksum = compute_checksum(file_path)?;
    {
        let mut stmt =
            conn.prepare("SELECT 1 FROM imports WHERE checksum = ?1 AND account_id = ?2")?;
        if stmt.exists(rusqlite::params![checksum, account_id])? {
            return Ok(ImportOutcome {
                imported: 0,
                skipped: 0,
                duplicate_file: true,
            });
        }
    }

    let importer = if let Some(key) = format_key {
        registry
            .get_by_key(key)
            .ok_or_else(|| TallyError::UnknownFormat(key.to_string()))?
    } else {
        registry
            .get_for_file(&account_type, file_path)
            .ok_or_else(|| TallyError::NoImporter(account_type.clone()))?
    };

    let rows = importer.parse(file_path)?;

    let tx = conn.transaction()?;
    let mut imported = 0usize;
    let mut skipped = 0usize;
    let mut inserted_ids: Vec<i64> = Vec::new();

    for row in &rows {
        if is_duplicate_row(&tx, account_id, row)? {
            skipped += 1;
            continue;
        }
        tx.execute(
            "INSERT INTO transactions (account_id, date, description, amount, is_flagged, flag_reason) \
             VALUES (?1, ?2, ?3, ?4, 1, 'No matching rule')",
            rusqlite::params![account_id, row.date, row.description, row.amount],
        )?;
        inserted_ids.push(tx.last_insert_rowid());
        imported += 1;
    }

    // Batch date range covers every parsed row, including skipped ones,
    // so overlapping exports are visible in the provenance record.
    let min_date = rows.iter().map(|r| r.date.as_str()).min();
    let max_date = rows.iter().map(|r| r.date.as_str()).max();
    tx.execute(
        "INSERT INTO imports (filename, account_id, record_count, date_range_start, date_range_end, checksum) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            file_path.file_name().and_then(|n| n.to_str()).unwrap_or(""),
            account_id,
            imported as i64,
            min_date,
            max_date,
            checksum,
        ],
    )?;
    let import_id = tx.last_insert_rowid();

    {
        let mut stmt = tx.prepare_cached("UPDATE transactions SET import_id = ?1 WHERE id = ?2")?;
        for txn_id in &inserted_ids {
            stmt.execute(rusqlite::params![import_id, txn_id])?;
        }
    }

    // Lets a format-specific collaborator (e.g. payroll) categorize its
    // own rows before the generic rule pass runs.
    importer.post_import(&tx, account_id, &rows)?;

    tx.commit()?;

    Ok(ImportOutcome {
        imported,
        skipped,
        duplicate_file: false,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::db::{init_ledger, open};
    use crate::plugins;
    use crate::registry::Importer;

    fn test_env() -> (tempfile::TempDir, Connection, ImporterRegistry) {
        let dir = tempfile::tempdir().unwrap();
        let mut conn = open(&dir.path().join("test.db")).unwrap();
        let hooks = plugins::collect_hooks();
        init_ledger(&mut conn, &hooks).unwrap();
        (dir, conn, hooks.build_registry())
    }

    fn add_checking_account(conn: &Connection) {
        conn.execute(
            "INSERT INTO accounts (name, account_type) VALUES ('Biz Checking', 'checking')",
            [],
        )
        .unwrap();
    }

    fn write_checking_csv(dir: &Path, name: &str, rows: &[(&str, &str, &str)]) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut content = String::from("Date,Description,Amount,Running Bal.\n");
        for (date, desc, amt) in rows {
            content.push_str(&format!("{date},{desc},{amt},0.00\n"));
        }
        std::fs::write(&path, &content).unwrap();
        path
    }

    #[test]
    fn test_import_inserts_flagged_transactions() {
        let (dir, mut conn, registry) = test_env();
        add_checking_account(&conn);
        let csv = write_checking_csv(dir.path(), "stmt.csv", &[
            ("01/15/2025", "ADOBE INC SUBSCRIPTION", "-54.99"),
            ("01/16/2025", "STRIPE PAYOUT", "2500.00"),
        ]);
        let outcome =
            import_file(&mut conn, &registry, &csv, "Biz Checking", Some("bofa_checking")).unwrap();
        assert_eq!(outcome.imported, 2);
        assert_eq!(outcome.skipped, 0);
        assert!(!outcome.duplicate_file);
        let flagged: i64 = conn
            .query_row(
                "SELECT count(*) FROM transactions WHERE is_flagged = 1 AND flag_reason = 'No matching rule'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(flagged, 2);
    }

    #[test]
    fn test_reimporting_identical_file_is_a_noop() {
        let (dir, mut conn, registry) = test_env();
        add_checking_account(&conn);
        let csv = write_checking_csv(dir.path(), "stmt.csv", &[
            ("01/15/2025", "PAYMENT ONE", "-100.00"),
        ]);
        import_file(&mut conn, &registry, &csv, "Biz Checking", Some("bofa_checking")).unwrap();
        let second =
            import_file(&mut conn, &registry, &csv, "Biz Checking", Some("bofa_checking")).unwrap();
        assert!(second.duplicate_file);
        assert_eq!(second.imported, 0);
        assert_eq!(second.skipped, 0);
        let txns: i64 = conn.query_row("SELECT count(*) FROM transactions", [], |r| r.get(0)).unwrap();
        let batches: i64 = conn.query_row("SELECT count(*) FROM imports", [], |r| r.get(0)).unwrap();
        assert_eq!(txns, 1);
        assert_eq!(batches, 1);
    }

    #[test]
    fn test_overlapping_file_skips_by_natural_key() {
        let (dir, mut conn, registry) = test_env();
        add_checking_account(&conn);
        let first = write_checking_csv(dir.path(), "jan.csv", &[
            ("01/15/2025", "PAYMENT ONE", "-100.00"),
            ("01/16/2025", "PAYMENT TWO", "-200.00"),
        ]);
        import_file(&mut conn, &registry, &first, "Biz Checking", Some("bofa_checking")).unwrap();
        let second = write_checking_csv(dir.path(), "jan-feb.csv", &[
            ("01/16/2025", "PAYMENT TWO", "-200.00"),
            ("02/01/2025", "PAYMENT THREE", "-300.00"),
        ]);
        let outcome =
            import_file(&mut conn, &registry, &second, "Biz Checking", Some("bofa_checking")).unwrap();
        assert_eq!(outcome.imported, 1);
        assert_eq!(outcome.skipped, 1);
        let total: i64 = conn.query_row("SELECT count(*) FROM transactions", [], |r| r.get(0)).unwrap();
        assert_eq!(total, 3);
    }

    #[test]
    fn test_batch_records_inserted_count_and_full_date_range() {
        let (dir, mut conn, registry) = test_env();
        add_checking_account(&conn);
        let first = write_checking_csv(dir.path(), "a.csv", &[
            ("01/10/2025", "PAYMENT ONE", "-100.00"),
        ]);
        import_file(&mut conn, &registry, &first, "Biz Checking", Some("bofa_checking")).unwrap();
        // Overlaps row one; only the Feb row is new, but the range spans both.
        let second = write_checking_csv(dir.path(), "b.csv", &[
            ("01/10/2025", "PAYMENT ONE", "-100.00"),
            ("02/20/2025", "PAYMENT TWO", "-50.00"),
        ]);
        import_file(&mut conn, &registry, &second, "Biz Checking", Some("bofa_checking")).unwrap();
        let (count, start, end): (i64, String, String) = conn
            .query_row(
                "SELECT record_count, date_range_start, date_range_end FROM imports ORDER BY id DESC LIMIT 1",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(start, "2025-01-10");
        assert_eq!(end, "2025-02-20");
    }

    #[test]
    fn test_inserted_rows_reference_their_batch() {
        let (dir, mut conn, registry) = test_env();
        add_checking_account(&conn);
        let csv = write_checking_csv(dir.path(), "stmt.csv", &[
            ("01/15/2025", "PAYMENT ONE", "-100.00"),
        ]);
        import_file(&mut conn, &registry, &csv, "Biz Checking", Some("bofa_checking")).unwrap();
        let linked: i64 = conn
            .query_row(
                "SELECT count(*) FROM transactions t JOIN imports i ON t.import_id = i.id",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(linked, 1);
    }

    #[test]
    fn test_unknown_account_is_an_error() {
        let (dir, mut conn, registry) = test_env();
        let csv = write_checking_csv(dir.path(), "stmt.csv", &[
            ("01/15/2025", "PAYMENT ONE", "-100.00"),
        ]);
        let err = import_file(&mut conn, &registry, &csv, "Nope", None).unwrap_err();
        assert!(matches!(err, TallyError::UnknownAccount(_)));
    }

    #[test]
    fn test_unknown_format_key_is_an_error() {
        let (dir, mut conn, registry) = test_env();
        add_checking_account(&conn);
        let csv = write_checking_csv(dir.path(), "stmt.csv", &[
            ("01/15/2025", "PAYMENT ONE", "-100.00"),
        ]);
        let err = import_file(&mut conn, &registry, &csv, "Biz Checking", Some("quicken")).unwrap_err();
        assert!(matches!(err, TallyError::UnknownFormat(_)));
    }

    #[test]
    fn test_no_importer_for_account_type_is_an_error() {
        let (dir, mut conn, registry) = test_env();
        conn.execute(
            "INSERT INTO accounts (name, account_type) VALUES ('Brokerage', 'brokerage')",
            [],
        )
        .unwrap();
        let csv = write_checking_csv(dir.path(), "stmt.csv", &[
            ("01/15/2025", "PAYMENT ONE", "-100.00"),
        ]);
        let err = import_file(&mut conn, &registry, &csv, "Brokerage", None).unwrap_err();
        assert!(matches!(err, TallyError::NoImporter(_)));
    }

    struct BrokenImporter {
        fail_in_parse: bool,
    }

    impl Importer for BrokenImporter {
        fn key(&self) -> &'static str {
            "broken"
        }
        fn name(&self) -> &'static str {
            "Broken"
        }
        fn account_types(&self) -> &'static [&'static str] {
            &["checking"]
        }
        fn file_extensions(&self) -> &'static [&'static str] {
            &[".csv"]
        }
        fn parse(&self, _file_path: &Path) -> Result<Vec<NormalizedRow>> {
            if self.fail_in_parse {
                return Err(TallyError::Other("unreadable file".to_string()));
            }
            Ok(vec![NormalizedRow {
                date: "2025-01-15".to_string(),
                description: "PAYMENT ONE".to_string(),
                amount: -100.0,
            }])
        }
        fn post_import(&self, _conn: &Connection, _account_id: i64, _rows: &[NormalizedRow]) -> Result<()> {
            Err(TallyError::Other("hook failure".to_string()))
        }
    }

    fn assert_ledger_untouched(conn: &Connection) {
        let txns: i64 = conn.query_row("SELECT count(*) FROM transactions", [], |r| r.get(0)).unwrap();
        let batches: i64 = conn.query_row("SELECT count(*) FROM imports", [], |r| r.get(0)).unwrap();
        assert_eq!(txns, 0);
        assert_eq!(batches, 0);
    }

    #[test]
    fn test_post_import_failure_rolls_back_rows_and_batch() {
        let (dir, mut conn, _) = test_env();
        add_checking_account(&conn);
        let mut registry = ImporterRegistry::new();
        registry.register(Arc::new(BrokenImporter { fail_in_parse: false }));
        let csv = write_checking_csv(dir.path(), "stmt.csv", &[
            ("01/15/2025", "PAYMENT ONE", "-100.00"),
        ]);
        // Rows and the batch record go in before the hook runs; its failure
        // must roll back all of them.
        let err = import_file(&mut conn, &registry, &csv, "Biz Checking", Some("broken")).unwrap_err();
        assert!(matches!(err, TallyError::Other(_)));
        assert_ledger_untouched(&conn);
    }

    #[test]
    fn test_parse_failure_leaves_no_batch_row() {
        let (dir, mut conn, _) = test_env();
        add_checking_account(&conn);
        let mut registry = ImporterRegistry::new();
        registry.register(Arc::new(BrokenImporter { fail_in_parse: true }));
        let csv = write_checking_csv(dir.path(), "stmt.csv", &[
            ("01/15/2025", "PAYMENT ONE", "-100.00"),
        ]);
        assert!(import_file(&mut conn, &registry, &csv, "Biz Checking", Some("broken")).is_err());
        assert_ledger_untouched(&conn);
    }

    #[cfg(feature = "gusto")]
    #[test]
    fn test_corrupt_xlsx_import_leaves_no_batch_row() {
        let (dir, mut conn, registry) = test_env();
        conn.execute(
            "INSERT INTO accounts (name, account_type) VALUES ('Gusto', 'payroll')",
            [],
        )
        .unwrap();
        let path = dir.path().join("payroll.xlsx");
        std::fs::write(&path, b"not a workbook").unwrap();
        assert!(import_file(&mut conn, &registry, &path, "Gusto", Some("gusto_payroll")).is_err());
        assert_ledger_untouched(&conn);
    }

    #[test]
    fn test_detection_resolves_checking_layout_without_format_key() {
        let (dir, mut conn, registry) = test_env();
        add_checking_account(&conn);
        let csv = write_checking_csv(dir.path(), "stmt.csv", &[
            ("01/15/2025", "PAYMENT ONE", "-100.00"),
        ]);
        let outcome = import_file(&mut conn, &registry, &csv, "Biz Checking", None).unwrap();
        assert_eq!(outcome.imported, 1);
    }
}
