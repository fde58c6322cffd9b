//! Tracing subscriber setup for the miner binary.

use std::{fs::OpenOptions, io, path::Path, sync::Arc};

use anyhow::Context;
use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    fmt,
    prelude::*,
};

/// Initialize logging to stdout and optionally to a file.
///
/// Filtering follows `RUST_LOG`, defaulting to INFO. The log file is opened
/// in append mode and written without ANSI colors.
pub fn init_logging(log_file: Option<&Path>) -> anyhow::Result<()> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .with_env_var("RUST_LOG")
        .from_env_lossy();

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Arc::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(io::stdout))
        .with(file_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(())
}
