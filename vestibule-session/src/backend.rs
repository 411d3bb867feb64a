//! Key-value backend contract.

use crate::error::BackendResult;
use async_trait::async_trait;
use std::time::Duration;

/// A key-value store with expiry that sessions are persisted in.
///
/// Implementations are shared across requests behind an `Arc` and must be
/// safe for concurrent use. Failures use [`BackendError`](crate::BackendError):
/// `Unavailable`/`Timeout` for transport problems, `Rejected` for anything
/// the server refused.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Check whether `key` holds a value.
    async fn exists(&self, key: &str) -> BackendResult<bool>;

    /// Fetch the value at `key`.
    async fn get(&self, key: &str) -> BackendResult<Option<Vec<u8>>>;

    /// Write `value` at `key` with no expiry.
    async fn set(&self, key: &str, value: Vec<u8>) -> BackendResult<()>;

    /// Write `value` at `key`, expiring after `ttl`.
    async fn set_with_expiry(&self, key: &str, value: Vec<u8>, ttl: Duration) -> BackendResult<()>;

    /// Atomically write `value` only if `key` is absent, expiring after `ttl`
    /// when one is given. Returns whether the write happened.
    async fn set_if_absent(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> BackendResult<bool>;

    /// Remove `key`. Returns the number of removed keys.
    async fn delete(&self, key: &str) -> BackendResult<u64>;

    /// Fetch the value at `key` and remove it.
    ///
    /// The default is a `get` followed by a `delete` and is not atomic
    /// against concurrent writers.
    async fn take(&self, key: &str) -> BackendResult<Option<Vec<u8>>> {
        let value = self.get(key).await?;
        if value.is_some() {
            self.delete(key).await?;
        }
        Ok(value)
    }

    /// Add `member` to the set at `key`.
    async fn add_to_set(&self, key: &str, member: &str) -> BackendResult<()>;

    /// Remove `member` from the set at `key`.
    async fn remove_from_set(&self, key: &str, member: &str) -> BackendResult<()>;

    /// List the members of the set at `key`.
    async fn set_members(&self, key: &str) -> BackendResult<Vec<String>>;
}
