//! Session store: key prefixing, serialization, TTL policy and failure
//! containment on top of a [`SessionBackend`].

use crate::backend::SessionBackend;
use crate::config::{SessionConfig, UserIndexConfig};
use crate::error::{BackendResult, SessionResult};
use crate::notifier::{FaultNotifier, LogNotifier};
use crate::session::{Session, SessionValue};
use crate::stats::StatsCollector;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Outcome of [`SessionStore::load`].
#[derive(Debug, Clone, PartialEq)]
pub enum Loaded {
    /// A stored session was found and decoded.
    Found(Session),
    /// Nothing is stored under the key.
    Missing,
    /// The backend was unavailable; whether a session exists is unknown.
    Degraded,
}

impl Loaded {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded)
    }

    /// The stored session, if one was found.
    pub fn found(self) -> Option<Session> {
        match self {
            Self::Found(session) => Some(session),
            _ => None,
        }
    }

    /// The stored session, or an empty one when none could be loaded.
    pub fn into_session(self) -> Session {
        self.found().unwrap_or_default()
    }
}

/// Translates session operations into backend calls.
///
/// Every backend failure in the unavailable class (including timeouts) is
/// replaced with the operation's documented fallback, reported to the
/// [`FaultNotifier`] and to the [`StatsCollector`]. Rejected commands and
/// (de)serialization errors propagate.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use vestibule_session::{MemoryBackend, Session, SessionConfig, SessionStore};
///
/// # tokio_test_block(async {
/// let config = SessionConfig::default().with_key_prefix("sess:");
/// let store = SessionStore::new(Arc::new(MemoryBackend::new()), &config);
///
/// let session = Session::from([("user", "x")]);
/// store.store("abc123", &session, None).await?;
/// assert_eq!(store.load("abc123").await?.found(), Some(session));
/// # Ok::<_, vestibule_session::SessionError>(())
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Runtime::new().unwrap().block_on(f)
/// # }
/// ```
pub struct SessionStore {
    backend: Arc<dyn SessionBackend>,
    key_prefix: String,
    default_expiration: i64,
    user_index: Option<UserIndexConfig>,
    stats: StatsCollector,
    notifier: Arc<dyn FaultNotifier>,
}

impl SessionStore {
    /// Create a store over `backend` using the prefix, expiration and user
    /// index settings of `config`.
    pub fn new(backend: Arc<dyn SessionBackend>, config: &SessionConfig) -> Self {
        Self {
            backend,
            key_prefix: config.key_prefix.clone(),
            default_expiration: config.default_expiration,
            user_index: config.user_index.clone(),
            stats: StatsCollector::disabled(),
            notifier: Arc::new(LogNotifier),
        }
    }

    /// Report contained timeouts to `stats`.
    pub fn with_collector(mut self, stats: StatsCollector) -> Self {
        self.stats = stats;
        self
    }

    /// Report contained failures to `notifier`.
    pub fn with_notifier(mut self, notifier: Arc<dyn FaultNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    /// Backend key for `key`. Already-prefixed keys are returned unchanged.
    pub fn prefixed(&self, key: &str) -> String {
        if key.starts_with(&self.key_prefix) {
            key.to_string()
        } else {
            format!("{}{}", self.key_prefix, key)
        }
    }

    /// Check whether a session is stored under `key`.
    ///
    /// Falls back to `false` when the backend is unavailable.
    pub async fn exists(&self, key: &str) -> SessionResult<bool> {
        let key = self.prefixed(key);
        let result = self.backend.exists(&key).await;
        self.contain("exists", &key, result, false)
    }

    /// Fetch and decode the session stored under `key`.
    ///
    /// Falls back to [`Loaded::Degraded`] when the backend is unavailable.
    pub async fn load(&self, key: &str) -> SessionResult<Loaded> {
        let key = self.prefixed(key);
        let result = self.backend.get(&key).await.map(Some);
        match self.contain("load", &key, result, None)? {
            Some(Some(bytes)) => Ok(Loaded::Found(Session::from_bytes(&bytes)?)),
            Some(None) => Ok(Loaded::Missing),
            None => Ok(Loaded::Degraded),
        }
    }

    /// Encode and write `session` under `key`.
    ///
    /// `ttl` overrides the default expiration (seconds); a value of zero or
    /// below writes without expiry. Returns the written bytes, or `None` when
    /// the backend is unavailable.
    pub async fn store(
        &self,
        key: &str,
        session: &Session,
        ttl: Option<i64>,
    ) -> SessionResult<Option<Vec<u8>>> {
        let key = self.prefixed(key);
        let bytes = session.to_bytes()?;

        let result = match expiry(ttl.unwrap_or(self.default_expiration)) {
            Some(ttl) => self.backend.set_with_expiry(&key, bytes.clone(), ttl).await,
            None => self.backend.set(&key, bytes.clone()).await,
        };

        if self.contain("store", &key, result.map(Some), None)?.is_none() {
            return Ok(None);
        }

        self.index_user_session(&key, session).await;
        Ok(Some(bytes))
    }

    /// Atomically write `session` under `key` only if nothing is stored there,
    /// with the default expiration.
    ///
    /// Returns `Some(true)` if this call created the record, `Some(false)` if
    /// the key was taken, and `None` when the backend is unavailable.
    pub async fn create_if_absent(&self, key: &str, session: &Session) -> SessionResult<Option<bool>> {
        let key = self.prefixed(key);
        let bytes = session.to_bytes()?;
        let ttl = expiry(self.default_expiration);
        let result = self.backend.set_if_absent(&key, bytes, ttl).await.map(Some);
        self.contain("create", &key, result, None)
    }

    /// Remove the session stored under `key`, returning it.
    ///
    /// Returns `None` when nothing was stored or the backend is unavailable.
    pub async fn invalidate(&self, key: &str) -> SessionResult<Option<Session>> {
        let key = self.prefixed(key);
        let result = self.backend.take(&key).await;
        let Some(bytes) = self.contain("invalidate", &key, result, None)? else {
            return Ok(None);
        };

        let session = Session::from_bytes(&bytes)?;
        self.unindex_user_session(&key, &session).await;
        Ok(Some(session))
    }

    /// Backend keys of the sessions written for `user`.
    ///
    /// Empty when no user index is configured or the backend is unavailable.
    /// Invalidated sessions are removed from the index; sessions that merely
    /// expired stay listed until they are invalidated.
    pub async fn user_sessions(&self, user: &str) -> SessionResult<Vec<String>> {
        let Some(index) = &self.user_index else {
            return Ok(Vec::new());
        };
        let set_key = index.set_key(user);
        let result = self.backend.set_members(&set_key).await;
        self.contain("user_sessions", &set_key, result, Vec::new())
    }

    fn indexed_user(&self, session: &Session) -> Option<String> {
        let index = self.user_index.as_ref()?;
        match session.get(&index.field)? {
            SessionValue::Text(user) => Some(index.set_key(user)),
            SessionValue::Int(user) => Some(index.set_key(&user.to_string())),
            _ => None,
        }
    }

    // The session record is already written; index failures never fail the call.
    async fn index_user_session(&self, key: &str, session: &Session) {
        if let Some(set_key) = self.indexed_user(session) {
            let result = self.backend.add_to_set(&set_key, key).await;
            self.best_effort("index", &set_key, result);
        }
    }

    async fn unindex_user_session(&self, key: &str, session: &Session) {
        if let Some(set_key) = self.indexed_user(session) {
            let result = self.backend.remove_from_set(&set_key, key).await;
            self.best_effort("unindex", &set_key, result);
        }
    }

    fn best_effort(&self, operation: &'static str, key: &str, result: BackendResult<()>) {
        if let Err(e) = result {
            warn!(operation, key, error = %e, "User session index update failed");
            self.stats.observe(&e);
            self.notifier.notify(operation, &e);
        }
    }

    fn contain<T>(
        &self,
        operation: &'static str,
        key: &str,
        result: BackendResult<T>,
        fallback: T,
    ) -> SessionResult<T> {
        match result {
            Ok(value) => Ok(value),
            Err(e) if e.is_unavailable() => {
                warn!(operation, key, error = %e, "Session backend unavailable, using fallback");
                self.stats.observe(&e);
                self.notifier.notify(operation, &e);
                Ok(fallback)
            }
            Err(e) => Err(e.into()),
        }
    }
}

// Zero or negative expirations write without expiry.
fn expiry(secs: i64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs.unsigned_abs()))
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("key_prefix", &self.key_prefix)
            .field("default_expiration", &self.default_expiration)
            .field("user_index", &self.user_index)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;

    fn store(prefix: &str) -> SessionStore {
        let config = SessionConfig::default().with_key_prefix(prefix);
        SessionStore::new(Arc::new(MemoryBackend::new()), &config)
    }

    #[test]
    fn test_prefix_applied_once() {
        let store = store("hello:prefix:");
        let once = store.prefixed("abc");
        assert_eq!(once, "hello:prefix:abc");
        assert_eq!(store.prefixed(&once), once);
        assert_eq!(store.prefixed(&store.prefixed(&once)), once);
    }

    #[test]
    fn test_empty_prefix_is_identity() {
        let store = store("");
        assert_eq!(store.prefixed("abc"), "abc");
    }

    #[tokio::test]
    async fn test_load_missing() {
        let store = store("p:");
        assert_eq!(store.load("nope").await.unwrap(), Loaded::Missing);
    }

    #[test]
    fn test_expiry() {
        assert_eq!(expiry(3600), Some(Duration::from_secs(3600)));
        assert_eq!(expiry(0), None);
        assert_eq!(expiry(-5), None);
    }

    #[test]
    fn test_loaded_into_session() {
        assert!(Loaded::Degraded.into_session().is_empty());
        assert!(Loaded::Missing.into_session().is_empty());
        let session = Session::from([("a", 1)]);
        assert_eq!(Loaded::Found(session.clone()).into_session(), session);
    }
}
