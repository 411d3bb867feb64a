//! Resilient session management for Vestibule.
//!
//! Sessions are stored in a TTL key-value backend (Redis in production) and
//! addressed by high-entropy random identifiers. The layer favours
//! availability: when the backend is unreachable, requests continue with
//! fresh empty sessions instead of failing.
//!
//! # Components
//!
//! - [`SessionStore`] - key prefixing, serialization, TTL policy and failure
//!   containment over a [`SessionBackend`]
//! - [`StatsCollector`] - one duration sample per operation plus a timeout
//!   counter
//! - [`SessionService`] - identifier generation, candidate validation,
//!   identity checks, persistence and logout
//!
//! # Failure handling
//!
//! Backend failures in the unavailable class ([`BackendError::Unavailable`]
//! and [`BackendError::Timeout`]) are replaced by fallback values at the
//! store and reported to a [`FaultNotifier`]. Everything else propagates:
//! rejected commands, corrupt payloads, identifier collisions
//! ([`SessionError::Collision`]) and identity mismatches
//! ([`SessionError::IdentityMismatch`]).
//!
//! # Examples
//!
//! ```no_run
//! use vestibule_session::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), SessionError> {
//!     let config = SessionConfig::default()
//!         .with_key_prefix("myapp:session:")
//!         .with_default_expiration(3600)
//!         .with_metrics_host("statsd.internal:8125");
//!
//!     let service = SessionService::connect(config).await?;
//!
//!     // Resolve the identifier from the request cookie
//!     let (id, mut session) = service.find_session(None).await?;
//!
//!     session.insert("user_id", 123);
//!     service
//!         .persist_session(&id, &mut session, PersistOptions::default())
//!         .await?;
//!
//!     // Logout, re-arming the cookie with a fresh identifier
//!     let next = service.delete_session(&id, DeleteOptions::default()).await?;
//!     assert!(next.is_some());
//!
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod id;
pub mod memory;
pub mod notifier;
pub mod redis_backend;
pub mod service;
pub mod session;
pub mod stats;
pub mod store;

pub use backend::SessionBackend;
pub use config::{
    DEFAULT_EXPIRATION_SECS, DEFAULT_ID_BYTES, DEFAULT_MIN_ID_LENGTH, SessionConfig,
    UserIndexConfig,
};
pub use error::{BackendError, BackendResult, SessionError, SessionResult};
pub use id::SessionId;
pub use memory::MemoryBackend;
pub use notifier::{FaultNotifier, LogNotifier};
pub use redis_backend::RedisBackend;
pub use service::{DeleteOptions, PersistOptions, Resolution, SessionService, SessionServiceBuilder};
pub use session::{EMBEDDED_ID_KEY, Session, SessionValue};
pub use stats::{REQUEST_DURATION, StatsCollector, TIMEOUT_COUNTER};
pub use store::{Loaded, SessionStore};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::backend::SessionBackend;
    pub use crate::config::{SessionConfig, UserIndexConfig};
    pub use crate::error::{BackendError, SessionError, SessionResult};
    pub use crate::id::SessionId;
    pub use crate::memory::MemoryBackend;
    pub use crate::redis_backend::RedisBackend;
    pub use crate::service::{DeleteOptions, PersistOptions, Resolution, SessionService};
    pub use crate::session::{Session, SessionValue};
    pub use crate::store::{Loaded, SessionStore};
}
