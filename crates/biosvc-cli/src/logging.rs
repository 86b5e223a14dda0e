//! Tracing initialisation for the service process.
//!
//! The wrapper's own filter is read from `BIOSVC_LOG`, never `RUST_LOG`:
//! `RUST_LOG` belongs to the child's environment contract.

use std::path::Path;

use tracing::error;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Filter directives for the wrapper's own logs.
pub const LOG_ENV_VAR: &str = "BIOSVC_LOG";

/// Directory for the optional log file.
pub const LOG_DIR_ENV_VAR: &str = "BIOSVC_LOG_DIR";

/// Filter used when `BIOSVC_LOG` is unset or invalid.
pub const DEFAULT_LOG_FILTER: &str = "info";

const LOG_FILE_PREFIX: &str = "biosvc";

/// Install the global subscriber: compact stdout output, plus a non-ANSI
/// daily-rolling file when `log_dir` is given.
///
/// The returned guard flushes the file writer when dropped; hold it for the
/// life of the process.
pub fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let env_filter =
        EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let (file_layer, guard) = match log_dir.and_then(file_writer) {
        Some((writer, guard)) => (
            Some(
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false) // No ANSI colors in files
                    .compact(),
            ),
            Some(guard),
        ),
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stdout).compact())
        .with(file_layer)
        .try_init()
        .ok(); // Ignore error if already initialized

    guard
}

fn file_writer(log_dir: &Path) -> Option<(NonBlocking, WorkerGuard)> {
    if let Err(e) = std::fs::create_dir_all(log_dir) {
        eprintln!(
            "Failed to create log directory {}: {e}",
            log_dir.display()
        );
        return None;
    }

    let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    Some(tracing_appender::non_blocking(appender))
}

/// Log an error that ends the process.
pub fn log_fatal(err: &anyhow::Error) {
    error!(fatal = true, "{err:#}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_writer_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("nested").join("logs");

        let writer = file_writer(&log_dir);
        assert!(writer.is_some());
        assert!(log_dir.is_dir());
    }
}
