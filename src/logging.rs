//! Tracing setup.
//!
//! Logs to stderr and to a daily-rolling file under
//! `<config_dir>/Signify/logs/`. The `RUST_LOG` environment variable
//! overrides the default `info` filter.

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::AppResult;

/// Initialize tracing; keep the returned guard alive for the process
/// lifetime or buffered log lines are lost on exit
pub fn init() -> AppResult<WorkerGuard> {
    let log_dir = dirs::config_dir()
        .context("platform config directory not available")?
        .join("Signify")
        .join("logs");
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;

    let appender = tracing_appender::rolling::daily(&log_dir, "signify-pipeline.log");
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(file_writer).with_ansi(false))
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {}", e))?;

    Ok(guard)
}
