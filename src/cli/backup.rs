use std::path::PathBuf;

use rusqlite::backup::Backup;

use crate::db;
use crate::error::Result;
use crate::settings::{db_path, get_data_dir};

pub fn run(output: Option<&str>) -> Result<()> {
    let source = db::open(&db_path())?;

    let dest_path = match output {
        Some(path) => PathBuf::from(path),
        None => {
            let dir = get_data_dir().join("backups");
            std::fs::create_dir_all(&dir)?;
            let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
            dir.join(format!("tally-{stamp}.db"))
        }
    };

    let mut dest = rusqlite::Connection::open(&dest_path)?;
    {
        let backup = Backup::new(&source, &mut dest)?;
        backup.run_to_completion(64, std::time::Duration::from_millis(50), None)?;
    }
    println!("Backed up to {}", dest_path.display());
    Ok(())
}
