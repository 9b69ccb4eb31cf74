//! Binary entry point: load configuration, open the backing store, and drive
//! the Ratatui event loop until the user quits.
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use directories::BaseDirs;
use log::info;

use materiautheque::{open_store, run_app, App, Backend, Config, Ledger};

/// Track the shared tools of the Matériauthèque
#[derive(Parser, Debug)]
#[command(name = "materiautheque")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Optional config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Use the local SQLite store instead of Google Sheets
    #[arg(long)]
    local: bool,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

/// The TUI owns the terminal, so log lines go to a file.
fn setup_logging(config: &Config, verbose: bool) -> Result<PathBuf> {
    let log_dir = BaseDirs::new()
        .map(|dirs| dirs.data_local_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
        .join(env!("CARGO_PKG_NAME"))
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join(format!("{}.log", env!("CARGO_PKG_NAME")));
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    let level = if verbose {
        "debug"
    } else {
        config.log_level.as_deref().unwrap_or("info")
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .target(env_logger::Target::Pipe(target))
        .init();

    Ok(log_file)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_ref())?;
    if cli.local {
        config.backend = Backend::Local;
    }

    let log_file = setup_logging(&config, cli.verbose)?;
    info!("Logging initialized, writing to: {}", log_file.display());
    info!("Using {:?} backend", config.backend);

    let store = open_store(&config)?;
    let ledger = Ledger::new(
        store,
        config.columns.clone(),
        config.labels.clone(),
        config.cache_ttl(),
    );

    let mut app = App::new(ledger);
    run_app(&mut app)
}
