//! nbsync - reconcile NetBox against external infrastructure sources.
//!
//! One run: hydrate the inventory from NetBox, sync every configured
//! source in parallel, then delete (or mark) whatever nbsync manages
//! that no source reported anymore.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use nbsync::{config, logging, run};

/// Sync external infrastructure inventories into NetBox.
#[derive(Parser)]
#[command(name = "nbsync", version, about, long_about = None)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match config::parse_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("nbsync: {e}");
            return ExitCode::FAILURE;
        }
    };

    logging::init(config.logger.level, &config.logger.dest);

    match run::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "run failed");
            ExitCode::FAILURE
        }
    }
}
