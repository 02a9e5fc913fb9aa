use std::path::Path;

use anyhow::Result;

use prompter_core::{AppConfig, ProgressStore};

pub fn run(config: &AppConfig, file: &Path) -> Result<()> {
    let mut store = ProgressStore::load(config.progress_path());
    let key = ProgressStore::key_for(file);

    if store.remove(&key) {
        store.save()?;
        println!("Forgot reading position for {}", file.display());
    } else {
        println!("No saved reading position for {}", file.display());
    }

    Ok(())
}
