use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use rusqlite::Connection;

use crate::error::Result;
use crate::models::NormalizedRow;

/// A file-format importer. Implementations own all format complexity
/// (column layouts, preamble skipping, sign conventions, date encodings)
/// and emit rows already normalized per the sign convention.
///
/// `detect` and `post_import` have no-op defaults so "no detector" and
/// "no post-import step" are visible states rather than null checks.
pub trait Importer {
    /// Unique format key, e.g. "bofa_checking".
    fn key(&self) -> &'static str;

    /// Human-readable name for listings.
    fn name(&self) -> &'static str;

    /// Account types this importer can handle.
    fn account_types(&self) -> &'static [&'static str];

    /// File extensions this importer expects, e.g. [".csv"].
    fn file_extensions(&self) -> &'static [&'static str];

    fn parse(&self, file_path: &Path) -> Result<Vec<NormalizedRow>>;

    /// Best-effort format sniffing (scan a few header cells). Returning
    /// false never rules an importer out; resolution falls back to
    /// registration order.
    fn detect(&self, _file_path: &Path) -> bool {
        false
    }

    /// Runs inside the import transaction, after rows are inserted,
    /// with the full parsed-row list (not just the inserted subset).
    fn post_import(
        &self,
        _conn: &Connection,
        _account_id: i64,
        _rows: &[NormalizedRow],
    ) -> Result<()> {
        Ok(())
    }
}

/// Resolves "given an account type and optionally a file, which parser
/// applies." Populated from plugin hooks at startup and passed explicitly
/// to the import pipeline; holds no global state.
#[derive(Default)]
pub struct ImporterRegistry {
    // Registration order is significant: it drives detector scan order
    // and the silent fallback for ambiguous files.
    importers: Vec<Arc<dyn Importer>>,
    by_key: HashMap<&'static str, Arc<dyn Importer>>,
}

impl ImporterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, importer: Arc<dyn Importer>) {
        self.by_key.insert(importer.key(), Arc::clone(&importer));
        self.importers.push(importer);
    }

    pub fn get_by_key(&self, key: &str) -> Option<Arc<dyn Importer>> {
        self.by_key.get(key).cloned()
    }

    /// First-registered importer declaring support for the account type.
    pub fn get_for_account_type(&self, account_type: &str) -> Option<Arc<dyn Importer>> {
        self.importers
            .iter()
            .find(|i| i.account_types().contains(&account_type))
            .cloned()
    }

    /// Scan the importers registered for this account type, in
    /// registration order, and return the first whose detector accepts
    /// the file. Detection is best-effort sniffing: when nothing matches,
    /// fall back silently to the first-registered candidate.
    pub fn get_for_file(&self, account_type: &str, file_path: &Path) -> Option<Arc<dyn Importer>> {
        let candidates: Vec<&Arc<dyn Importer>> = self
            .importers
            .iter()
            .filter(|i| i.account_types().contains(&account_type))
            .collect();
        for importer in &candidates {
            if importer.detect(file_path) {
                return Some(Arc::clone(importer));
            }
        }
        candidates.first().map(|i| Arc::clone(i))
    }

    pub fn list_all(&self) -> &[Arc<dyn Importer>] {
        &self.importers
    }
}
