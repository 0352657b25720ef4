use std::path::PathBuf;

use crate::db;
use crate::error::Result;
use crate::hooks::PluginHooks;
use crate::settings::{expand_tilde, save_settings, Settings};

pub fn run(data_dir: Option<String>, hooks: &PluginHooks) -> Result<()> {
    let dir = match data_dir {
        Some(d) => PathBuf::from(expand_tilde(&d)),
        None => PathBuf::from(Settings::default().data_dir),
    };
    std::fs::create_dir_all(&dir)?;

    let settings = Settings {
        data_dir: dir.to_string_lossy().to_string(),
        ..Settings::default()
    };
    save_settings(&settings)?;

    let mut conn = db::open(&dir.join("tally.db"))?;
    db::init_ledger(&mut conn, hooks)?;

    println!("Initialized ledger in {}", dir.display());
    Ok(())
}
