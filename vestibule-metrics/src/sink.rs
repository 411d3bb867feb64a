//! The sink contract.

use std::time::Duration;

/// Destination for counter increments and timing samples.
///
/// Implementations must be cheap to call from request paths and must never
/// fail the caller; delivery is best-effort.
pub trait MetricsSink: Send + Sync {
    /// Add one to the counter `name`.
    fn increment(&self, name: &str);

    /// Record an elapsed duration under `name`.
    fn timing(&self, name: &str, duration: Duration);
}

/// A sink that drops every sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl MetricsSink for NoopSink {
    fn increment(&self, _name: &str) {}

    fn timing(&self, _name: &str, _duration: Duration) {}
}
