//! # Vestibule Redis
//!
//! Pooled Redis access for the Vestibule session layer.
//!
//! ## Features
//!
//! - **Connection Pooling**: Connection management with bb8
//! - **Command Deadlines**: Every command is bounded by the configured
//!   command timeout and fails with [`RedisError::Timeout`] when it elapses
//! - **Error Classification**: Connection loss, pool exhaustion and timeouts
//!   are distinguishable from command rejections
//! - **Capability Detection**: The server version is read once at startup and
//!   resolved into a [`TakeStrategy`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use vestibule_redis::{RedisConfig, RedisService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RedisConfig::builder()
//!         .url("redis://localhost:6379")
//!         .pool_size(10)
//!         .build();
//!
//!     let redis = RedisService::new(config).await?;
//!
//!     redis.set_ex("greeting", b"hello".to_vec(), 60).await?;
//!     let value = redis.get_bytes("greeting").await?;
//!     assert_eq!(value.as_deref(), Some(&b"hello"[..]));
//!
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod pool;
mod service;
mod version;

pub use config::{RedisConfig, RedisConfigBuilder};
pub use error::{RedisError, Result};
pub use pool::{RedisConnection, RedisPool, RedisPoolBuilder};
pub use service::{PoolStats, RedisService};
pub use version::{ServerVersion, TakeStrategy};

// Re-export redis crate for convenience
pub use redis;

/// Prelude for common imports.
///
/// ```
/// use vestibule_redis::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{RedisConfig, RedisConfigBuilder};
    pub use crate::error::{RedisError, Result};
    pub use crate::service::RedisService;
    pub use crate::version::{ServerVersion, TakeStrategy};
}
