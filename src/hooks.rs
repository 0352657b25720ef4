use std::sync::Arc;

use rusqlite::Connection;

use crate::error::Result;
use crate::registry::{Importer, ImporterRegistry};

/// Schema mutation registered by a plugin. Applied once at ledger
/// initialization, in registration order, inside one commit. The DDL
/// must be idempotent.
pub type MigrationFn = fn(&Connection) -> Result<()>;

/// Entry point run for a plugin-contributed CLI subcommand. Receives the
/// open connection and the raw arguments after the command name.
pub type CommandFn = fn(&mut Connection, &[String]) -> Result<()>;

#[derive(Debug, Clone)]
pub struct CategorySeed {
    pub name: String,
    pub category_type: String,
    pub tax_line: Option<String>,
    pub form_line: Option<String>,
    pub description: Option<String>,
}

pub struct PluginCommand {
    /// CLI subgroup the command is exposed under, e.g. "report".
    pub group: &'static str,
    pub name: &'static str,
    pub about: &'static str,
    pub run: CommandFn,
}

/// Collector handed to each plugin's `register`. One collector is built
/// per process in `main` and the populated result is passed explicitly
/// into the registry and pipeline; there is no ambient global state.
#[derive(Default)]
pub struct PluginHooks {
    importers: Vec<Arc<dyn Importer>>,
    migrations: Vec<MigrationFn>,
    categories: Vec<CategorySeed>,
    commands: Vec<PluginCommand>,
}

impl PluginHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_importer(&mut self, importer: Arc<dyn Importer>) {
        self.importers.push(importer);
    }

    pub fn add_migration(&mut self, migration: MigrationFn) {
        self.migrations.push(migration);
    }

    pub fn add_categories(&mut self, seeds: Vec<CategorySeed>) {
        self.categories.extend(seeds);
    }

    pub fn add_command(&mut self, command: PluginCommand) {
        self.commands.push(command);
    }

    pub fn migrations(&self) -> &[MigrationFn] {
        &self.migrations
    }

    pub fn categories(&self) -> &[CategorySeed] {
        &self.categories
    }

    pub fn commands(&self) -> &[PluginCommand] {
        &self.commands
    }

    pub fn find_command(&self, group: &str, name: &str) -> Option<&PluginCommand> {
        self.commands
            .iter()
            .find(|c| c.group == group && c.name == name)
    }

    /// Build the importer registry from every importer collected so far,
    /// preserving registration order.
    pub fn build_registry(&self) -> ImporterRegistry {
        let mut registry = ImporterRegistry::new();
        for importer in &self.importers {
            registry.register(Arc::clone(importer));
        }
        registry
    }
}

/// An extension module. Discovery is static today (see
/// `plugins::builtin_plugins`); the contract is only that `register` may
/// call the `add_*` hooks any number of times before normal operation.
pub trait Plugin {
    fn name(&self) -> &'static str;

    fn register(&self, hooks: &mut PluginHooks);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NormalizedRow;
    use std::path::Path;

    struct NoopImporter;

    impl Importer for NoopImporter {
        fn key(&self) -> &'static str {
            "noop"
        }
        fn name(&self) -> &'static str {
            "Noop"
        }
        fn account_types(&self) -> &'static [&'static str] {
            &["checking"]
        }
        fn file_extensions(&self) -> &'static [&'static str] {
            &[".csv"]
        }
        fn parse(&self, _file_path: &Path) -> crate::error::Result<Vec<NormalizedRow>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_collected_importers_populate_registry() {
        let mut hooks = PluginHooks::new();
        hooks.add_importer(Arc::new(NoopImporter));
        let registry = hooks.build_registry();
        assert!(registry.get_by_key("noop").is_some());
        assert_eq!(registry.list_all().len(), 1);
    }

    #[test]
    fn test_find_command_matches_group_and_name() {
        fn run(_conn: &mut Connection, _args: &[String]) -> crate::error::Result<()> {
            Ok(())
        }
        let mut hooks = PluginHooks::new();
        hooks.add_command(PluginCommand {
            group: "report",
            name: "k1",
            about: "K-1 worksheet",
            run,
        });
        assert!(hooks.find_command("report", "k1").is_some());
        assert!(hooks.find_command("report", "pnl").is_none());
        assert!(hooks.find_command("export", "k1").is_none());
    }
}
