//! Metrics errors.

use thiserror::Error;

/// Result type for sink construction.
pub type MetricsResult<T> = Result<T, MetricsError>;

/// Errors raised while building a metrics sink.
///
/// Emitting a sample never fails; only construction does.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// The `host:port` string could not be parsed.
    #[error("Invalid metrics address '{0}': {1}")]
    InvalidAddress(String, String),

    /// The host did not resolve to any socket address.
    #[error("Could not resolve metrics host '{0}'")]
    Unresolved(String),

    /// Socket setup failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
