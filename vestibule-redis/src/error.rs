//! Redis error types.

use thiserror::Error;

/// Result type for Redis operations.
pub type Result<T> = std::result::Result<T, RedisError>;

/// Redis errors.
#[derive(Debug, Error)]
pub enum RedisError {
    /// The server could not be reached or the connection was lost.
    #[error("Connection error: {0}")]
    Connection(String),

    /// No pooled connection could be handed out.
    #[error("Pool error: {0}")]
    Pool(String),

    /// A command or a pool checkout exceeded its deadline.
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// The server rejected a command (wrong type, script error, ...).
    #[error("Command error: {0}")]
    Command(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RedisError {
    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout(_) | Self::Pool(_))
    }

    /// Check if this error indicates connection loss.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Pool(_))
    }

    /// Check if this error is a deadline expiry.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

impl From<redis::RedisError> for RedisError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
            Self::Connection(err.to_string())
        } else {
            Self::Command(err.to_string())
        }
    }
}

impl From<bb8::RunError<redis::RedisError>> for RedisError {
    fn from(err: bb8::RunError<redis::RedisError>) -> Self {
        match err {
            bb8::RunError::TimedOut => Self::Timeout("connection checkout timed out".to_string()),
            bb8::RunError::User(e) => match Self::from(e) {
                Self::Command(msg) => Self::Pool(msg),
                other => other,
            },
        }
    }
}

impl From<tokio::time::error::Elapsed> for RedisError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Self::Timeout("command deadline elapsed".to_string())
    }
}
