//! Redis service shared by every session store of a process.

use redis::AsyncCommands;
use std::future::Future;
use tracing::{debug, info, warn};

use crate::{
    RedisConfig, RedisError, Result,
    pool::{RedisConnection, RedisPool, RedisPoolBuilder},
    version::{ServerVersion, TakeStrategy},
};

/// Redis service providing the connection pool and the commands the session
/// layer needs.
///
/// Every command runs under the configured command timeout; an elapsed
/// deadline is reported as [`RedisError::Timeout`](crate::RedisError::Timeout).
pub struct RedisService {
    config: RedisConfig,
    pool: RedisPool,
    version: Option<ServerVersion>,
    take_strategy: TakeStrategy,
}

impl RedisService {
    /// Create a new Redis service.
    ///
    /// Reads the server version once and resolves the fetch-then-delete
    /// strategy from it unless the configuration forces one.
    pub async fn new(config: RedisConfig) -> Result<Self> {
        let pool = RedisPoolBuilder::new(config.clone()).build().await?;
        let mut service = Self::from_pool(config, pool);

        if service.config.take_strategy.is_none() {
            let outcome = service.server_version().await;
            (service.version, service.take_strategy) = resolve_capabilities(outcome)?;
        }

        info!(
            version = ?service.version,
            take_strategy = ?service.take_strategy,
            "Redis capabilities resolved"
        );

        Ok(service)
    }

    /// Create from an existing pool without probing the server.
    pub fn from_pool(config: RedisConfig, pool: RedisPool) -> Self {
        let take_strategy = config.take_strategy.unwrap_or(TakeStrategy::GetThenDel);
        Self {
            config,
            pool,
            version: None,
            take_strategy,
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &RedisConfig {
        &self.config
    }

    /// Get the connection pool.
    pub fn pool(&self) -> &RedisPool {
        &self.pool
    }

    /// Server version detected at startup, if any.
    pub fn version(&self) -> Option<ServerVersion> {
        self.version
    }

    /// Fetch-then-delete strategy resolved at startup.
    pub fn take_strategy(&self) -> TakeStrategy {
        self.take_strategy
    }

    /// Get a connection from the pool.
    pub async fn get(&self) -> Result<RedisConnection<'_>> {
        Ok(self.pool.get().await?)
    }

    /// Check if the connection is healthy.
    pub async fn health_check(&self) -> Result<()> {
        self.timed(async {
            let mut conn = self.get().await?;
            let _: String = redis::cmd("PING").query_async(&mut *conn).await?;
            Ok(())
        })
        .await
    }

    /// Get pool statistics.
    pub fn pool_stats(&self) -> PoolStats {
        let state = self.pool.state();
        PoolStats {
            connections: state.connections,
            idle_connections: state.idle_connections,
        }
    }

    async fn server_version(&self) -> Result<Option<ServerVersion>> {
        let info: String = self
            .timed(async {
                let mut conn = self.get().await?;
                let info: String = redis::cmd("INFO").arg("server").query_async(&mut *conn).await?;
                Ok(info)
            })
            .await?;
        Ok(ServerVersion::from_info(&info))
    }

    async fn timed<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::time::timeout(self.config.command_timeout, fut).await?
    }

    /// Check if a key exists.
    pub async fn exists(&self, key: &str) -> Result<bool> {
        self.timed(async {
            let mut conn = self.get().await?;
            let exists: bool = conn.exists(key).await?;
            Ok(exists)
        })
        .await
    }

    /// Get a raw value.
    pub async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.timed(async {
            let mut conn = self.get().await?;
            let value: Option<Vec<u8>> = conn.get(key).await?;
            Ok(value)
        })
        .await
    }

    /// Set a value without expiration.
    pub async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.timed(async {
            let mut conn = self.get().await?;
            let _: () = conn.set(key, value).await?;
            Ok(())
        })
        .await
    }

    /// Set a value with an expiration in seconds.
    pub async fn set_ex(&self, key: &str, value: Vec<u8>, ttl_secs: u64) -> Result<()> {
        self.timed(async {
            let mut conn = self.get().await?;
            let _: () = conn.set_ex(key, value, ttl_secs).await?;
            Ok(())
        })
        .await
    }

    /// Set a value only if the key is absent, expiring after `ttl_secs` when
    /// given (`SET key value NX [EX ttl]`). Returns whether the write happened.
    pub async fn set_nx(&self, key: &str, value: Vec<u8>, ttl_secs: Option<u64>) -> Result<bool> {
        self.timed(async {
            let mut conn = self.get().await?;
            let mut cmd = redis::cmd("SET");
            cmd.arg(key).arg(value).arg("NX");
            if let Some(secs) = ttl_secs {
                cmd.arg("EX").arg(secs);
            }
            let reply: Option<String> = cmd.query_async(&mut *conn).await?;
            Ok(reply.is_some())
        })
        .await
    }

    /// Delete a key. Returns the number of removed keys.
    pub async fn delete(&self, key: &str) -> Result<u64> {
        self.timed(async {
            let mut conn = self.get().await?;
            let deleted: u64 = conn.del(key).await?;
            Ok(deleted)
        })
        .await
    }

    /// Fetch a value and delete its key using the resolved [`TakeStrategy`].
    pub async fn take(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self.take_strategy {
            TakeStrategy::GetDel => {
                self.timed(async {
                    let mut conn = self.get().await?;
                    let value: Option<Vec<u8>> = conn.get_del(key).await?;
                    Ok(value)
                })
                .await
            }
            TakeStrategy::GetThenDel => {
                let value = self.get_bytes(key).await?;
                if value.is_some() {
                    let deleted = self.delete(key).await?;
                    debug!(key, deleted, "Deleted key after fetch");
                }
                Ok(value)
            }
        }
    }

    /// Set add.
    pub async fn sadd(&self, key: &str, member: &str) -> Result<u64> {
        self.timed(async {
            let mut conn = self.get().await?;
            let added: u64 = conn.sadd(key, member).await?;
            Ok(added)
        })
        .await
    }

    /// Set remove.
    pub async fn srem(&self, key: &str, member: &str) -> Result<u64> {
        self.timed(async {
            let mut conn = self.get().await?;
            let removed: u64 = conn.srem(key, member).await?;
            Ok(removed)
        })
        .await
    }

    /// Set members.
    pub async fn smembers(&self, key: &str) -> Result<Vec<String>> {
        self.timed(async {
            let mut conn = self.get().await?;
            let members: Vec<String> = conn.smembers(key).await?;
            Ok(members)
        })
        .await
    }
}

/// Turn the outcome of the `INFO server` read into the detected version and
/// the fetch-then-delete strategy.
///
/// A refused command (missing ACL permission, renamed `INFO`) falls back to
/// [`TakeStrategy::GetThenDel`]. Connection failures and timeouts propagate.
fn resolve_capabilities(
    outcome: Result<Option<ServerVersion>>,
) -> Result<(Option<ServerVersion>, TakeStrategy)> {
    match outcome {
        Ok(version) => Ok((version, TakeStrategy::for_version(version))),
        Err(RedisError::Command(e)) => {
            warn!(error = %e, "Could not read the Redis server version, using GET then DEL");
            Ok((None, TakeStrategy::GetThenDel))
        }
        Err(e) => Err(e),
    }
}

/// Connection pool statistics.
#[derive(Debug, Clone)]
pub struct PoolStats {
    /// Total connections.
    pub connections: u32,
    /// Idle connections.
    pub idle_connections: u32,
}
