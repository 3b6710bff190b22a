//! Tracing subscriber setup

use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::RunMode;

/// Name of the log file written under `LOG_DIR`
pub const LOG_FILE_NAME: &str = "api.log";

/// Build the level filter: `RUST_LOG` wins, otherwise the run mode default
pub fn env_filter(mode: RunMode) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(mode.default_log_filter()))
}

/// Install the global subscriber.
///
/// Logs always go to stdout. When `log_dir` is set, a second non-blocking
/// layer also writes to `api.log` in that directory; the returned guard must
/// be held until shutdown so buffered lines are flushed.
pub fn init(mode: RunMode, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

            let appender = tracing_appender::rolling::never(dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter(mode))
        .with(fmt::layer().with_target(true))
        .with(file_layer)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_filter_defaults_follow_run_mode() {
        unsafe { std::env::remove_var("RUST_LOG") };

        assert_eq!(env_filter(RunMode::Development).to_string(), "info");
        assert_eq!(env_filter(RunMode::Production).to_string(), "error");
    }

    #[test]
    #[serial]
    fn test_rust_log_overrides_defaults() {
        unsafe { std::env::set_var("RUST_LOG", "debug") };
        assert_eq!(env_filter(RunMode::Production).to_string(), "debug");
        unsafe { std::env::remove_var("RUST_LOG") };
    }
}
