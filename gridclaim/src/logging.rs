//! Logging setup.
//!
//! Logs go to a file through a non-blocking `tracing-appender` writer with
//! local-time timestamps. `RUST_LOG` overrides the default filter.

use std::path::{Path, PathBuf};

use thiserror::Error;
pub use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Default log file name.
pub const DEFAULT_LOG_FILE: &str = "gridclaim.log";

/// Timestamp layout for log lines.
const LOG_TIME_FORMAT: &str = "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]";

/// Logging setup failures.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to create log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to install subscriber: {0}")]
    Init(String),
}

/// Filter used when `RUST_LOG` is not set.
pub fn default_filter(debug: bool) -> &'static str {
    if debug {
        "info,gridclaim=debug,gridclaim_cli=debug"
    } else {
        "info"
    }
}

/// Install the global subscriber writing to `dir/file_name`.
///
/// Keep the returned guard alive for as long as logs should be flushed.
pub fn init_logging(dir: &Path, file_name: &str, debug: bool) -> Result<WorkerGuard, LoggingError> {
    std::fs::create_dir_all(dir).map_err(|source| LoggingError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let time_format = time::format_description::parse_borrowed::<2>(LOG_TIME_FORMAT)
        .map_err(|e| LoggingError::Init(format!("bad time format: {}", e)))?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(debug)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_timer(LocalTime::new(time_format)),
        )
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))?;

    Ok(guard)
}
