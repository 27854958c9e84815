//! File logging, enabled by `GAC_LOG`.
//!
//! stdout carries rendered replies and stderr carries errors, so diagnostics
//! go to `${GAC_HOME}/gac.log` instead.

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::paths;

pub const LOG_ENV: &str = "GAC_LOG";

/// Installs the global subscriber when `GAC_LOG` holds a filter directive
/// (e.g. `debug` or `gac_core=trace`).
///
/// Keep the returned guard alive until exit so buffered lines are flushed.
///
/// # Errors
/// Returns an error if the filter is invalid or the log directory cannot be
/// created.
pub fn init() -> Result<Option<WorkerGuard>> {
    let Ok(directives) = std::env::var(LOG_ENV) else {
        return Ok(None);
    };
    if directives.trim().is_empty() {
        return Ok(None);
    }

    let filter = EnvFilter::try_new(directives.trim())
        .with_context(|| format!("Invalid {LOG_ENV} filter: {directives}"))?;

    let dir = paths::gac_home();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(
        &dir,
        "gac.log",
    ));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .try_init()
        .context("Failed to install log subscriber")?;

    tracing::info!(log = %paths::log_path().display(), "logging started");
    Ok(Some(guard))
}
