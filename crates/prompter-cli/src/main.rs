use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use prompter_core::AppConfig;

mod commands;

#[derive(Parser)]
#[command(name = "prompter")]
#[command(author, version, about = "A terminal teleprompter with smooth auto-scrolling")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Script to open (shorthand for `run <FILE>`)
    file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a script in the teleprompter
    Run {
        /// Plain text script
        file: PathBuf,
        /// Initial speed setting (0.0 - 5.0)
        #[arg(short, long)]
        speed: Option<f64>,
        /// Initial font size in pixels
        #[arg(short, long)]
        font_size: Option<f64>,
    },
    /// Show the configuration file path and effective values
    Config,
    /// Forget the saved reading position of a script
    Reset {
        file: PathBuf,
    },
}

/// Log to a file in the data directory; the TUI owns the terminal
fn init_logging(config: &AppConfig) -> Result<()> {
    let log_path = config.log_path();
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.general.log_level.clone()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration; validate once logging is up so corrections are recorded
    let mut config = AppConfig::load_unvalidated()?;
    init_logging(&config)?;
    config.validate();
    let config = Arc::new(config);

    match (cli.command, cli.file) {
        (Some(Commands::Run { file, speed, font_size }), _) => {
            commands::run::run(config, &file, speed, font_size).await
        }
        (None, Some(file)) => commands::run::run(config, &file, None, None).await,
        (Some(Commands::Config), _) => commands::config::run(&config),
        (Some(Commands::Reset { file }), _) => commands::reset::run(&config, &file),
        (None, None) => {
            println!("Usage: prompter <FILE>");
            println!("\nRun `prompter --help` for all commands.");
            Ok(())
        }
    }
}
