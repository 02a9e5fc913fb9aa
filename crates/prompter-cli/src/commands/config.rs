use anyhow::{Context, Result};

use prompter_core::AppConfig;

pub fn run(config: &AppConfig) -> Result<()> {
    let path = AppConfig::config_path();
    if path.exists() {
        println!("Config file: {}", path.display());
    } else {
        println!("Config file: {} (not found, using defaults)", path.display());
    }
    println!("Data directory: {}", config.data_dir().display());
    println!("Log file: {}", config.log_path().display());
    println!();

    let effective = toml::to_string_pretty(config).context("Failed to render configuration")?;
    println!("{}", effective);

    Ok(())
}
