//! Session service: identifier lifecycle and the request-facing API.

use crate::backend::SessionBackend;
use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};
use crate::id::SessionId;
use crate::notifier::{FaultNotifier, LogNotifier};
use crate::redis_backend::RedisBackend;
use crate::session::Session;
use crate::stats::StatsCollector;
use crate::store::{Loaded, SessionStore};
use std::sync::Arc;
use tracing::{debug, info, warn};
use vestibule_metrics::{MetricsSink, NoopSink, StatsdSink};

/// Outcome of resolving a candidate identifier.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The candidate named a stored session whose identity checked out.
    Found { id: SessionId, session: Session },
    /// A fresh identifier was issued with an empty session.
    Created { id: SessionId, session: Session },
    /// The fresh identifier lost its set-if-absent race.
    Collision { id: SessionId },
    /// The stored session claims a different identifier than requested.
    Mismatch { requested: SessionId, embedded: String },
}

impl Resolution {
    /// Identifier the request should continue with, if any.
    pub fn id(&self) -> Option<&SessionId> {
        match self {
            Self::Found { id, .. } | Self::Created { id, .. } => Some(id),
            Self::Collision { .. } | Self::Mismatch { .. } => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created { .. })
    }

    /// Convert `Collision` and `Mismatch` into their [`SessionError`]s.
    pub fn into_result(self) -> SessionResult<(SessionId, Session)> {
        match self {
            Self::Found { id, session } | Self::Created { id, session } => Ok((id, session)),
            Self::Collision { id } => Err(SessionError::Collision { id }),
            Self::Mismatch { requested, embedded } => {
                Err(SessionError::IdentityMismatch { requested, embedded })
            }
        }
    }
}

/// Options for [`SessionService::persist_session`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistOptions {
    /// Expiry override in seconds; zero or below writes without expiry.
    pub expire_after: Option<i64>,
}

impl PersistOptions {
    pub fn expire_after(secs: i64) -> Self {
        Self {
            expire_after: Some(secs),
        }
    }
}

/// Options for [`SessionService::delete_session`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteOptions {
    /// Do not issue a replacement identifier.
    pub drop: bool,
}

impl DeleteOptions {
    pub fn drop() -> Self {
        Self { drop: true }
    }
}

/// Request-facing session management.
///
/// Every request-facing operation is timed once through the service's
/// [`StatsCollector`], no matter how many backend calls it makes.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use vestibule_session::{MemoryBackend, PersistOptions, SessionConfig, SessionService};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let service = SessionService::builder(SessionConfig::default().with_key_prefix("sess:"))
///     .backend(Arc::new(MemoryBackend::new()))
///     .build()?;
///
/// let (id, mut session) = service.find_session(None).await?;
/// session.insert("user", "x");
/// service.persist_session(&id, &mut session, PersistOptions::default()).await?;
///
/// let (again, loaded) = service.find_session(Some(id.as_str())).await?;
/// assert_eq!(again, id);
/// assert_eq!(loaded.get("user").and_then(|v| v.as_str()), Some("x"));
/// # Ok::<_, vestibule_session::SessionError>(())
/// # });
/// ```
pub struct SessionService {
    store: SessionStore,
    stats: StatsCollector,
    min_id_length: usize,
    id_bytes: usize,
}

impl SessionService {
    /// Start building a service from `config`.
    pub fn builder(config: SessionConfig) -> SessionServiceBuilder {
        SessionServiceBuilder::new(config)
    }

    /// Build a service backed by Redis, connecting with `config.redis`.
    pub async fn connect(config: SessionConfig) -> SessionResult<Self> {
        Self::builder(config).connect().await
    }

    /// The underlying session store.
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// The collector wrapping every request-facing operation.
    pub fn stats(&self) -> &StatsCollector {
        &self.stats
    }

    /// Draw random identifiers until one is not in use.
    ///
    /// While the backend is unavailable every candidate counts as unused.
    pub async fn generate_id(&self) -> SessionResult<SessionId> {
        loop {
            let id = SessionId::generate(self.id_bytes);
            if !self.store.exists(id.as_str()).await? {
                return Ok(id);
            }
            debug!("Generated session id already in use, drawing again");
        }
    }

    /// Resolve a candidate identifier into a session.
    ///
    /// Missing, short and unknown candidates get a freshly issued identifier
    /// and an empty session.
    pub async fn resolve(&self, candidate: Option<&str>) -> SessionResult<Resolution> {
        self.stats.with_stats(self.resolve_candidate(candidate)).await
    }

    /// Like [`resolve`](Self::resolve), raising collisions and identity
    /// mismatches as errors.
    pub async fn find_session(&self, candidate: Option<&str>) -> SessionResult<(SessionId, Session)> {
        self.resolve(candidate).await?.into_result()
    }

    /// Write `session` under `id`, embedding `id` into non-empty sessions.
    ///
    /// Returns `id` unchanged.
    pub async fn persist_session(
        &self,
        id: &SessionId,
        session: &mut Session,
        options: PersistOptions,
    ) -> SessionResult<SessionId> {
        self.stats
            .with_stats(async {
                if !session.is_empty() {
                    session.embed_id(id);
                }
                self.store
                    .store(id.as_str(), session, options.expire_after)
                    .await?;
                Ok(id.clone())
            })
            .await
    }

    /// Invalidate the session stored under `id`.
    ///
    /// Returns a fresh identifier for the next request unless `options.drop`
    /// is set.
    pub async fn delete_session(
        &self,
        id: &SessionId,
        options: DeleteOptions,
    ) -> SessionResult<Option<SessionId>> {
        self.stats
            .with_stats(async {
                self.store.invalidate(id.as_str()).await?;
                if options.drop {
                    return Ok(None);
                }
                self.generate_id().await.map(Some)
            })
            .await
    }

    /// Backend keys of the sessions written for `user`.
    pub async fn sessions_for_user(&self, user: &str) -> SessionResult<Vec<String>> {
        self.store.user_sessions(user).await
    }

    async fn resolve_candidate(&self, candidate: Option<&str>) -> SessionResult<Resolution> {
        match candidate {
            Some(candidate) if candidate.len() >= self.min_id_length => {
                match self.store.load(candidate).await? {
                    Loaded::Found(session) => {
                        return Ok(self.verify(SessionId::from(candidate), &session));
                    }
                    Loaded::Missing => debug!("Unknown session id, issuing a new one"),
                    Loaded::Degraded => debug!("Session backend degraded, issuing a new id"),
                }
            }
            Some(_) => debug!("Session id below minimum length, issuing a new one"),
            None => {}
        }

        self.issue().await
    }

    fn verify(&self, requested: SessionId, session: &Session) -> Resolution {
        let session = session.normalized();

        if !session.is_empty()
            && let Some(embedded) = session.embedded_id()
            && embedded.as_str() != Some(requested.as_str())
        {
            let embedded = embedded.to_string();
            warn!(requested = %requested, embedded = %embedded, "Session identity mismatch");
            return Resolution::Mismatch { requested, embedded };
        }

        Resolution::Found {
            id: requested,
            session,
        }
    }

    async fn issue(&self) -> SessionResult<Resolution> {
        let id = self.generate_id().await?;
        let session = Session::new();

        match self.store.create_if_absent(id.as_str(), &session).await? {
            Some(true) => {}
            Some(false) => {
                debug!(id = %id, "Lost the race creating a new session");
                return Ok(Resolution::Collision { id });
            }
            None => debug!(id = %id, "Session backend degraded, continuing with an unsaved session"),
        }

        Ok(Resolution::Created { id, session })
    }
}

impl std::fmt::Debug for SessionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionService")
            .field("store", &self.store)
            .field("min_id_length", &self.min_id_length)
            .field("id_bytes", &self.id_bytes)
            .finish_non_exhaustive()
    }
}

/// Builder for [`SessionService`].
///
/// Without an explicit metrics sink, the builder sends StatsD datagrams to
/// `config.metrics_host` when set and records nothing otherwise.
pub struct SessionServiceBuilder {
    config: SessionConfig,
    backend: Option<Arc<dyn SessionBackend>>,
    sink: Option<Arc<dyn MetricsSink>>,
    notifier: Option<Arc<dyn FaultNotifier>>,
}

impl SessionServiceBuilder {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            backend: None,
            sink: None,
            notifier: None,
        }
    }

    /// Use `backend` for storage.
    pub fn backend(mut self, backend: Arc<dyn SessionBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Send timing and timeout samples to `sink`.
    pub fn metrics_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Report contained backend failures to `notifier`.
    pub fn notifier(mut self, notifier: Arc<dyn FaultNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Build the service. A backend must have been supplied.
    pub fn build(self) -> SessionResult<SessionService> {
        self.config.validate()?;

        let backend = self
            .backend
            .clone()
            .ok_or_else(|| SessionError::Config("no session backend configured".to_string()))?;

        self.assemble(backend)
    }

    /// Build the service, connecting to Redis unless a backend was supplied.
    pub async fn connect(mut self) -> SessionResult<SessionService> {
        self.config.validate()?;

        let backend: Arc<dyn SessionBackend> = match self.backend.take() {
            Some(backend) => backend,
            None => Arc::new(RedisBackend::connect(self.config.redis.clone()).await?),
        };

        self.assemble(backend)
    }

    fn assemble(self, backend: Arc<dyn SessionBackend>) -> SessionResult<SessionService> {
        let sink: Arc<dyn MetricsSink> = match (self.sink, &self.config.metrics_host) {
            (Some(sink), _) => sink,
            (None, Some(host)) => Arc::new(StatsdSink::connect(host)?),
            (None, None) => Arc::new(NoopSink),
        };
        let stats = StatsCollector::new(sink);
        let notifier = self.notifier.unwrap_or_else(|| Arc::new(LogNotifier));

        let store = SessionStore::new(backend, &self.config)
            .with_collector(stats.clone())
            .with_notifier(notifier);

        info!(
            key_prefix = %self.config.key_prefix,
            default_expiration = self.config.default_expiration,
            min_id_length = self.config.min_id_length,
            metrics_host = ?self.config.metrics_host,
            "Session service ready"
        );

        Ok(SessionService {
            store,
            stats,
            min_id_length: self.config.min_id_length,
            id_bytes: self.config.id_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;

    fn service() -> SessionService {
        SessionService::builder(SessionConfig::default())
            .backend(Arc::new(MemoryBackend::new()))
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_requires_backend() {
        let err = SessionService::builder(SessionConfig::default()).build().unwrap_err();
        assert!(matches!(err, SessionError::Config(_)));
    }

    #[test]
    fn test_build_validates_config() {
        let err = SessionService::builder(SessionConfig::default().with_id_bytes(4))
            .backend(Arc::new(MemoryBackend::new()))
            .build()
            .unwrap_err();
        assert!(matches!(err, SessionError::Config(_)));
    }

    #[test]
    fn test_build_rejects_bad_metrics_host() {
        let err = SessionService::builder(SessionConfig::default().with_metrics_host("nohost"))
            .backend(Arc::new(MemoryBackend::new()))
            .build()
            .unwrap_err();
        assert!(matches!(err, SessionError::Metrics(_)));
    }

    #[test]
    fn test_resolution_into_result() {
        let id = SessionId::from("a".repeat(32));
        assert!(
            Resolution::Collision { id: id.clone() }
                .into_result()
                .unwrap_err()
                .is_collision()
        );
        assert!(
            Resolution::Mismatch {
                requested: id.clone(),
                embedded: "b".repeat(32),
            }
            .into_result()
            .unwrap_err()
            .is_identity_mismatch()
        );
        let (got, session) = Resolution::Created {
            id: id.clone(),
            session: Session::new(),
        }
        .into_result()
        .unwrap();
        assert_eq!(got, id);
        assert!(session.is_empty());
    }

    #[tokio::test]
    async fn test_generated_ids_have_configured_length() {
        let service = service();
        let id = service.generate_id().await.unwrap();
        assert_eq!(id.len(), 32);
    }

    #[tokio::test]
    async fn test_no_candidate_creates_session() {
        let service = service();
        let resolution = service.resolve(None).await.unwrap();
        assert!(resolution.is_created());
        let id = resolution.id().unwrap();
        assert!(service.store().exists(id.as_str()).await.unwrap());
    }
}
