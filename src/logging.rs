//! Tracing subscriber bootstrap for the `pageboy` binary.

use thiserror::Error;
use tracing_subscriber::{filter::ParseError, fmt, EnvFilter};

/// Default filter when neither the command line nor the config sets one.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Failure to install the global subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The filter directive could not be parsed.
    #[error("invalid log level: {0}")]
    InvalidFilter(#[from] ParseError),
    /// A global subscriber is already installed.
    #[error("logging already initialized")]
    AlreadyInitialized,
}

/// Installs a formatting subscriber writing to stderr, filtered by `level`
/// (any `EnvFilter` directive, e.g. `debug` or `pageboy::storage=trace`).
pub fn init_logging(level: &str) -> Result<(), LoggingError> {
    fmt()
        .with_env_filter(EnvFilter::try_new(level)?)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|_| LoggingError::AlreadyInitialized)
}
