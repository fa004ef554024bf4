//! Tracing setup driven by the logger config.

use std::fs::OpenOptions;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

/// Map the config's 0-3 level to a filter directive.
fn directive(level: i64) -> &'static str {
    match level {
        0 => "debug",
        1 => "info",
        2 => "warn",
        _ => "error",
    }
}

/// Initialize the global subscriber. `dest` empty logs to stderr,
/// anything else appends to that file.
pub fn init(level: i64, dest: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directive(level)));

    if dest.is_empty() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .init();
        return;
    }

    match OpenOptions::new().create(true).append(true).open(dest) {
        Ok(file) => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Arc::new(file))
                .with_ansi(false)
                .with_target(true)
                .init();
        }
        Err(e) => {
            eprintln!("nbsync: cannot open log file {dest}: {e}; logging to stderr");
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}
