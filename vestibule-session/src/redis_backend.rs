//! Redis session backend.

use crate::backend::SessionBackend;
use crate::error::BackendResult;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use vestibule_redis::{RedisConfig, RedisService};

/// [`SessionBackend`] backed by a pooled [`RedisService`].
///
/// `take` follows the strategy the service resolved from the server version
/// at startup (`GETDEL` where available).
///
/// # Examples
///
/// ```no_run
/// use vestibule_session::RedisBackend;
/// use vestibule_redis::RedisConfig;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = RedisBackend::connect(RedisConfig::new("redis://localhost:6379")).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RedisBackend {
    redis: Arc<RedisService>,
}

impl RedisBackend {
    /// Wrap an existing, shared Redis service.
    pub fn new(redis: Arc<RedisService>) -> Self {
        Self { redis }
    }

    /// Build a pool from `config` and wrap it.
    pub async fn connect(config: RedisConfig) -> BackendResult<Self> {
        let redis = RedisService::new(config).await?;
        Ok(Self::new(Arc::new(redis)))
    }

    /// The underlying Redis service.
    pub fn service(&self) -> &Arc<RedisService> {
        &self.redis
    }
}

#[async_trait]
impl SessionBackend for RedisBackend {
    async fn exists(&self, key: &str) -> BackendResult<bool> {
        Ok(self.redis.exists(key).await?)
    }

    async fn get(&self, key: &str) -> BackendResult<Option<Vec<u8>>> {
        Ok(self.redis.get_bytes(key).await?)
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> BackendResult<()> {
        Ok(self.redis.set(key, value).await?)
    }

    async fn set_with_expiry(&self, key: &str, value: Vec<u8>, ttl: Duration) -> BackendResult<()> {
        // SETEX rejects a zero expiry
        let secs = ttl.as_secs().max(1);
        Ok(self.redis.set_ex(key, value, secs).await?)
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> BackendResult<bool> {
        let secs = ttl.map(|ttl| ttl.as_secs().max(1));
        Ok(self.redis.set_nx(key, value, secs).await?)
    }

    async fn delete(&self, key: &str) -> BackendResult<u64> {
        Ok(self.redis.delete(key).await?)
    }

    async fn take(&self, key: &str) -> BackendResult<Option<Vec<u8>>> {
        Ok(self.redis.take(key).await?)
    }

    async fn add_to_set(&self, key: &str, member: &str) -> BackendResult<()> {
        self.redis.sadd(key, member).await?;
        Ok(())
    }

    async fn remove_from_set(&self, key: &str, member: &str) -> BackendResult<()> {
        self.redis.srem(key, member).await?;
        Ok(())
    }

    async fn set_members(&self, key: &str) -> BackendResult<Vec<String>> {
        Ok(self.redis.smembers(key).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_to_unreachable_server_is_unavailable() {
        let config = RedisConfig::builder()
            .url("redis://127.0.0.1:1")
            .connection_timeout(Duration::from_millis(200))
            .build();

        let err = RedisBackend::connect(config).await.err().unwrap();
        assert!(err.is_unavailable(), "unexpected error: {err:?}");
    }

    #[tokio::test]
    async fn test_connect_with_bad_url_is_rejected() {
        let err = RedisBackend::connect(RedisConfig::new("http://localhost"))
            .await
            .err()
            .unwrap();
        assert!(!err.is_unavailable());
    }

    #[tokio::test]
    #[ignore = "requires Redis"]
    async fn test_round_trip_against_live_server() {
        let backend = RedisBackend::connect(RedisConfig::default()).await.unwrap();
        let key = "vestibule:test:redis_backend";

        backend
            .set_with_expiry(key, b"v".to_vec(), Duration::from_secs(30))
            .await
            .unwrap();
        assert!(backend.exists(key).await.unwrap());
        assert!(!backend.set_if_absent(key, b"w".to_vec(), None).await.unwrap());
        assert_eq!(backend.take(key).await.unwrap(), Some(b"v".to_vec()));
        assert!(!backend.exists(key).await.unwrap());
    }
}
