//! Tracing initialisation for the binaries.
//!
//! Logs go to stderr so stdout stays a clean JSON channel. When
//! `logging.directory` is set, a daily rolling file receives the same events
//! through a non-blocking writer.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LoggingConfig;
use crate::error::{AppError, Result};

/// File name prefix of the rolling log file.
pub const LOG_FILE_PREFIX: &str = "osfed-query.log";

/// Parse `EnvFilter` directives.
///
/// # Errors
///
/// Returns [`AppError::Logging`] if the directives do not parse.
pub fn build_filter(directives: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directives).map_err(|e| AppError::Logging(format!("invalid filter {directives:?}: {e}")))
}

/// Install the global subscriber.
///
/// `RUST_LOG` overrides `config.filter`. The returned guard flushes the
/// log file on drop and must be held for the life of the process.
///
/// # Errors
///
/// Returns an error if the filter is invalid, the log directory cannot be
/// created, or a global subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => build_filter(&config.filter)?,
    };

    let (file_layer, guard) = match &config.directory {
        Some(directory) => {
            std::fs::create_dir_all(directory)?;
            let appender = tracing_appender::rolling::daily(directory, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .map_err(|e| AppError::Logging(e.to_string()))?;

    Ok(guard)
}
