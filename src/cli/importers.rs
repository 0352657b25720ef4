use comfy_table::Table;

use crate::error::Result;
use crate::registry::ImporterRegistry;

pub fn run(registry: &ImporterRegistry) -> Result<()> {
    let mut table = Table::new();
    table.set_header(vec!["Key", "Name", "Account Types", "Extensions"]);
    for importer in registry.list_all() {
        table.add_row(vec![
            importer.key().to_string(),
            importer.name().to_string(),
            importer.account_types().join(", "),
            importer.file_extensions().join(", "),
        ]);
    }
    println!("Importers\n{table}");
    Ok(())
}
