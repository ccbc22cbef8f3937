//! File logging. The terminal belongs to the UI, so nothing is written to stdout.

use std::path::PathBuf;

use anyhow::Context;
use bishop_config::{LogLevel, LoggingConfig};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_PREFIX: &str = "bishop";

/// Filter directives: `RUST_LOG` wins over the configured level when set.
pub fn filter_directives(level: LogLevel, env_override: Option<&str>) -> String {
    match env_override.map(str::trim) {
        Some(directives) if !directives.is_empty() => directives.to_string(),
        _ => level.to_string(),
    }
}

pub fn log_dir(config: &LoggingConfig) -> Option<PathBuf> {
    config
        .dir
        .as_deref()
        .and_then(bishop_config::expand_tilde)
        .or_else(bishop_config::default_log_dir)
}

/// Install the global subscriber. Keep the guard alive until exit so buffered lines get flushed.
pub fn init(config: &LoggingConfig) -> anyhow::Result<WorkerGuard> {
    let dir = log_dir(config).context("Could not determine log directory")?;
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create log directory {:?}", dir))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .max_log_files(config.max_files.max(1))
        .build(&dir)
        .context("Failed to create log file appender")?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let env_override = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let directives = filter_directives(config.level, env_override.as_deref());
    let filter = EnvFilter::try_new(&directives)
        .with_context(|| format!("Invalid log filter: {}", directives))?;

    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::info!(target: "bishop_tui", "Logging to {:?} at level {}", dir, directives);
    Ok(guard)
}
