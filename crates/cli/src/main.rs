use clap::Parser;
use eyre::WrapErr;
use std::path::PathBuf;
use std::sync::Arc;
use zpress_config::ConfigLoader;

mod commands;
mod context;

use commands::Commands;
use context::Context;

#[derive(Parser)]
#[command(name = "zpress")]
#[command(about = "Adaptive file compression backed by a worker pool", long_about = None)]
#[command(version)]
struct Cli {
    /// Number of worker threads (defaults to one per CPU)
    #[arg(long, global = true)]
    threads: Option<usize>,

    /// Task store location
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    if let Err(e) = zpress_utils::tracing::init() {
        eprintln!("Failed to initialize logging: {e}");
    }

    let cli = Cli::parse();

    let loaded = ConfigLoader::load().wrap_err("failed to load configuration")?;
    tracing::debug!(source = ?loaded.source, "configuration loaded");

    let mut config = loaded.config;
    if let Some(threads) = cli.threads {
        config.pool.threads = threads;
    }
    if let Some(store) = cli.store {
        config.store.path = Some(store);
    }

    cli.command.execute(Arc::new(Context::new(config))).await
}
