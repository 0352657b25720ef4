use std::path::PathBuf;

use crate::categorizer::categorize_transactions;
use crate::db;
use crate::error::Result;
use crate::importer::import_file;
use crate::registry::ImporterRegistry;
use crate::settings::db_path;

pub fn run(file: &str, account: &str, format: Option<&str>, registry: &ImporterRegistry) -> Result<()> {
    let file_path = PathBuf::from(file);
    let mut conn = db::open(&db_path())?;

    let outcome = import_file(&mut conn, registry, &file_path, account, format)?;
    if outcome.duplicate_file {
        println!("This file has already been imported (duplicate checksum).");
        return Ok(());
    }
    println!("{} imported, {} skipped (duplicates)", outcome.imported, outcome.skipped);

    let pass = categorize_transactions(&mut conn)?;
    println!("{} categorized, {} still flagged", pass.categorized, pass.still_flagged);
    Ok(())
}
