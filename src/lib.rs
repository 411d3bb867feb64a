// Vestibule - resilient session management on top of Redis
//
// This library bundles the session service with its Redis client and
// metrics sinks behind one dependency.

// Re-export session functionality
pub use vestibule_session::*;

// Re-export collaborator crates
pub use vestibule_metrics;
pub use vestibule_redis;

pub use vestibule_metrics::{MetricsSink, NoopSink, PrometheusSink, StatsdSink};
pub use vestibule_redis::{RedisConfig, RedisError, RedisService, TakeStrategy};

// Prelude for common imports
pub mod prelude {
    pub use vestibule_session::prelude::*;

    pub use vestibule_metrics::{MetricsSink, NoopSink, PrometheusSink, StatsdSink};
    pub use vestibule_redis::{RedisConfig, RedisService, TakeStrategy};
}
