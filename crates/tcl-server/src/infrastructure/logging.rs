//! `tracing` subscriber setup.
//!
//! Two sinks share one filter: a console layer on stderr and, when a log
//! directory is configured, a daily-rotated file `<prefix>.<date>.log` in that
//! directory with at most `max_files` files kept.  `RUST_LOG` overrides the
//! configured level.

use std::str::FromStr;

use anyhow::{Context, Result};
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer,
};

use crate::domain::LogConfig;

/// Keeps the file writer thread alive; dropping it flushes the log file.
pub struct LogGuard {
    _guard: WorkerGuard,
}

/// Parses a level name such as `"info"` or `"debug"`.
pub fn parse_level(level: &str) -> Result<LevelFilter> {
    LevelFilter::from_str(level).with_context(|| format!("invalid log level {level:?}"))
}

fn env_filter(level: LevelFilter) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
}

/// Installs the global subscriber.
///
/// Returns a guard when a log file is in use; keep it until exit.
pub fn init(config: &LogConfig) -> Result<Option<LogGuard>> {
    let level = parse_level(&config.level)?;

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(env_filter(level));

    let (file_layer, guard) = match &config.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create log directory {}", dir.display()))?;
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(config.file_prefix.as_str())
                .filename_suffix("log")
                .max_log_files(config.max_files.max(1))
                .build(dir)
                .with_context(|| format!("failed to open log file in {}", dir.display()))?;
            let (writer, worker_guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(env_filter(level));
            (Some(layer), Some(LogGuard { _guard: worker_guard }))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    match &config.directory {
        Some(dir) => tracing::info!("logging to {}", dir.display()),
        None => tracing::info!("logging to console only"),
    }
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level_accepts_standard_names() {
        assert_eq!(parse_level("info").unwrap(), LevelFilter::INFO);
        assert_eq!(parse_level("DEBUG").unwrap(), LevelFilter::DEBUG);
        assert_eq!(parse_level("off").unwrap(), LevelFilter::OFF);
    }

    #[test]
    fn test_parse_level_rejects_unknown_name() {
        assert!(parse_level("loud").is_err());
    }
}
