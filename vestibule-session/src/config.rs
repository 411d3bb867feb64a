//! Session configuration.

use crate::error::{SessionError, SessionResult};
use vestibule_redis::RedisConfig;

/// Default session expiration in seconds (one hour).
pub const DEFAULT_EXPIRATION_SECS: i64 = 60 * 60;

/// Default random bytes per generated identifier.
pub const DEFAULT_ID_BYTES: usize = 16;

/// Default minimum accepted identifier length, in characters.
pub const DEFAULT_MIN_ID_LENGTH: usize = 32;

/// Per-user index of written session keys.
#[derive(Debug, Clone, PartialEq)]
pub struct UserIndexConfig {
    /// Session field holding the user identifier.
    pub field: String,
    /// Prefix of the per-user set keys.
    pub key_prefix: String,
}

impl UserIndexConfig {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            key_prefix: "user_sessions:".to_string(),
        }
    }

    /// Set the prefix of the per-user set keys.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Set key for a given user.
    pub fn set_key(&self, user: &str) -> String {
        format!("{}{}", self.key_prefix, user)
    }
}

/// Session configuration.
///
/// # Examples
///
/// ```
/// use vestibule_session::SessionConfig;
///
/// let config = SessionConfig::default()
///     .with_key_prefix("myapp:session:")
///     .with_default_expiration(7200);
///
/// assert_eq!(config.key_prefix, "myapp:session:");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Prefix applied once to every backend key.
    pub key_prefix: String,
    /// Expiry applied on write, in seconds. Zero or negative writes without expiry.
    pub default_expiration: i64,
    /// Shorter candidate identifiers are never trusted.
    pub min_id_length: usize,
    /// Random bytes drawn per generated identifier.
    pub id_bytes: usize,
    /// Backend connection settings.
    pub redis: RedisConfig,
    /// StatsD collector as `host:port`; no metrics are sent when unset.
    pub metrics_host: Option<String>,
    /// Optional per-user index of written sessions.
    pub user_index: Option<UserIndexConfig>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            key_prefix: String::new(),
            default_expiration: DEFAULT_EXPIRATION_SECS,
            min_id_length: DEFAULT_MIN_ID_LENGTH,
            id_bytes: DEFAULT_ID_BYTES,
            redis: RedisConfig::default(),
            metrics_host: None,
            user_index: None,
        }
    }
}

impl SessionConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables keep their defaults.
    pub fn from_env() -> Self {
        let mut config = Self {
            redis: RedisConfig::from_env().build(),
            ..Default::default()
        };

        if let Ok(prefix) = std::env::var("SESSION_KEY_PREFIX") {
            config.key_prefix = prefix;
        }

        if let Ok(secs) = std::env::var("SESSION_EXPIRE_AFTER")
            && let Ok(secs) = secs.parse()
        {
            config.default_expiration = secs;
        }

        if let Ok(len) = std::env::var("SESSION_MIN_ID_LENGTH")
            && let Ok(len) = len.parse()
        {
            config.min_id_length = len;
        }

        if let Ok(bytes) = std::env::var("SESSION_ID_BYTES")
            && let Ok(bytes) = bytes.parse()
        {
            config.id_bytes = bytes;
        }

        if let Ok(host) = std::env::var("SESSION_METRICS_HOST") {
            config.metrics_host = Some(host);
        }

        if let Ok(field) = std::env::var("SESSION_USER_INDEX_FIELD") {
            config.user_index = Some(UserIndexConfig::new(field));
        }

        config
    }

    /// Set the key prefix.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Set the default expiration in seconds.
    pub fn with_default_expiration(mut self, secs: i64) -> Self {
        self.default_expiration = secs;
        self
    }

    /// Set the minimum accepted identifier length.
    pub fn with_min_id_length(mut self, len: usize) -> Self {
        self.min_id_length = len;
        self
    }

    /// Set the number of random bytes per generated identifier.
    pub fn with_id_bytes(mut self, bytes: usize) -> Self {
        self.id_bytes = bytes;
        self
    }

    /// Set the Redis configuration.
    pub fn with_redis(mut self, redis: RedisConfig) -> Self {
        self.redis = redis;
        self
    }

    /// Send metrics to a StatsD collector at `host:port`.
    pub fn with_metrics_host(mut self, host: impl Into<String>) -> Self {
        self.metrics_host = Some(host.into());
        self
    }

    /// Index written sessions by user.
    pub fn with_user_index(mut self, index: UserIndexConfig) -> Self {
        self.user_index = Some(index);
        self
    }

    /// Length of identifiers this configuration generates.
    pub fn generated_id_length(&self) -> usize {
        self.id_bytes * 2
    }

    /// Reject settings under which the service cannot work.
    pub fn validate(&self) -> SessionResult<()> {
        if self.id_bytes == 0 {
            return Err(SessionError::Config("id_bytes must be positive".to_string()));
        }

        if self.generated_id_length() < self.min_id_length {
            return Err(SessionError::Config(format!(
                "generated identifiers ({} chars) are shorter than min_id_length ({})",
                self.generated_id_length(),
                self.min_id_length
            )));
        }

        if let Some(index) = &self.user_index
            && index.field.is_empty()
        {
            return Err(SessionError::Config(
                "user_index.field must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.key_prefix, "");
        assert_eq!(config.default_expiration, 3600);
        assert_eq!(config.generated_id_length(), 32);
        assert!(config.metrics_host.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_short_generated_ids() {
        let config = SessionConfig::default().with_id_bytes(8);
        assert!(matches!(config.validate(), Err(SessionError::Config(_))));

        let config = SessionConfig::default().with_id_bytes(0).with_min_id_length(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_user_field() {
        let config = SessionConfig::default().with_user_index(UserIndexConfig::new(""));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_positive_expiration_is_valid() {
        assert!(SessionConfig::default().with_default_expiration(0).validate().is_ok());
        assert!(SessionConfig::default().with_default_expiration(-1).validate().is_ok());
    }

    #[test]
    fn test_user_index_set_key() {
        let index = UserIndexConfig::new("user_id").with_key_prefix("app:user_sessions:");
        assert_eq!(index.set_key("42"), "app:user_sessions:42");
    }
}
