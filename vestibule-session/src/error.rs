//! Error types for session operations.

use crate::id::SessionId;
use thiserror::Error;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Result type for raw backend calls.
pub type BackendResult<T> = Result<T, BackendError>;

/// Failures reported by a [`SessionBackend`](crate::backend::SessionBackend).
///
/// `Unavailable` and `Timeout` together form the "backend unavailable" class
/// that the session store contains with fallback values. `Rejected` is never
/// contained.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// The backend could not be reached.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// The backend did not answer within its deadline.
    #[error("Backend timeout: {0}")]
    Timeout(String),

    /// The backend answered with an error.
    #[error("Backend rejected command: {0}")]
    Rejected(String),
}

impl BackendError {
    /// True for every failure the store may replace with a fallback value.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout(_))
    }

    /// True only for deadline expiry.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

impl From<vestibule_redis::RedisError> for BackendError {
    fn from(err: vestibule_redis::RedisError) -> Self {
        use vestibule_redis::RedisError;

        match err {
            RedisError::Timeout(msg) => Self::Timeout(msg),
            RedisError::Connection(msg) | RedisError::Pool(msg) => Self::Unavailable(msg),
            other => Self::Rejected(other.to_string()),
        }
    }
}

/// Session-specific errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A backend failure that was not contained.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// A freshly generated identifier lost its set-if-absent race.
    #[error("Session collision on '{id}'")]
    Collision { id: SessionId },

    /// A stored session claims a different identifier than it was loaded under.
    #[error("Session identity mismatch: requested '{requested}', stored session claims '{embedded}'")]
    IdentityMismatch {
        requested: SessionId,
        embedded: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Metrics sink could not be built.
    #[error("Metrics error: {0}")]
    Metrics(#[from] vestibule_metrics::MetricsError),
}

impl SessionError {
    /// True for the security-relevant identity mismatch.
    pub fn is_identity_mismatch(&self) -> bool {
        matches!(self, Self::IdentityMismatch { .. })
    }

    /// True for an identifier-creation race loss.
    pub fn is_collision(&self) -> bool {
        matches!(self, Self::Collision { .. })
    }

    /// True when the error is a backend deadline expiry.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Backend(e) if e.is_timeout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vestibule_redis::RedisError;

    #[test]
    fn test_unavailable_class() {
        assert!(BackendError::Unavailable("down".into()).is_unavailable());
        assert!(BackendError::Timeout("slow".into()).is_unavailable());
        assert!(!BackendError::Rejected("WRONGTYPE".into()).is_unavailable());
        assert!(BackendError::Timeout("slow".into()).is_timeout());
        assert!(!BackendError::Unavailable("down".into()).is_timeout());
    }

    #[test]
    fn test_redis_error_mapping() {
        assert_eq!(
            BackendError::from(RedisError::Timeout("t".into())),
            BackendError::Timeout("t".into())
        );
        assert_eq!(
            BackendError::from(RedisError::Pool("p".into())),
            BackendError::Unavailable("p".into())
        );
        assert!(matches!(
            BackendError::from(RedisError::Command("WRONGTYPE".into())),
            BackendError::Rejected(_)
        ));
    }

    #[test]
    fn test_session_error_predicates() {
        let err = SessionError::from(BackendError::Timeout("slow".into()));
        assert!(err.is_timeout());

        let err = SessionError::IdentityMismatch {
            requested: SessionId::from("a".repeat(32)),
            embedded: "b".repeat(32),
        };
        assert!(err.is_identity_mismatch());
        assert!(!err.is_collision());
    }
}
