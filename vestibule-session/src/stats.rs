//! Latency and timeout instrumentation for session operations.

use crate::error::{BackendError, SessionResult};
use std::cell::Cell;
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;
use vestibule_metrics::{MetricsSink, NoopSink};

/// Timing metric emitted once per wrapped operation.
pub const REQUEST_DURATION: &str = "sessions.request_duration";

/// Counter incremented when a wrapped operation hit a backend timeout.
pub const TIMEOUT_COUNTER: &str = "sessions.timeout";

tokio::task_local! {
    static TIMEOUT_SEEN: Cell<bool>;
}

/// Wraps session operations with a duration sample and timeout counting.
///
/// Timeouts are seen two ways: as an error returned through
/// [`with_stats`](Self::with_stats), or flagged by the store through
/// [`observe`](Self::observe) when it replaced a timed-out call with a
/// fallback. Either way the counter moves at most once per wrapped operation
/// and the operation's outcome is returned unchanged.
#[derive(Clone)]
pub struct StatsCollector {
    sink: Arc<dyn MetricsSink>,
}

impl StatsCollector {
    pub fn new(sink: Arc<dyn MetricsSink>) -> Self {
        Self { sink }
    }

    /// A collector that records nothing.
    pub fn disabled() -> Self {
        Self::new(Arc::new(NoopSink))
    }

    /// The sink samples go to.
    pub fn sink(&self) -> &Arc<dyn MetricsSink> {
        &self.sink
    }

    /// Run `operation`, timing it and counting a timeout if one occurred.
    pub async fn with_stats<T, F>(&self, operation: F) -> SessionResult<T>
    where
        F: Future<Output = SessionResult<T>>,
    {
        let started = Instant::now();
        let (result, contained_timeout) = TIMEOUT_SEEN
            .scope(Cell::new(false), async {
                let result = operation.await;
                (result, TIMEOUT_SEEN.with(Cell::get))
            })
            .await;

        self.sink.timing(REQUEST_DURATION, started.elapsed());

        let escaped_timeout = matches!(&result, Err(e) if e.is_timeout());
        if contained_timeout || escaped_timeout {
            self.sink.increment(TIMEOUT_COUNTER);
        }

        result
    }

    /// Note a backend failure the caller is about to replace with a fallback.
    ///
    /// Inside a [`with_stats`](Self::with_stats) scope a timeout is folded into
    /// that operation's single count; outside any scope it is counted at once.
    pub fn observe(&self, error: &BackendError) {
        if !error.is_timeout() {
            return;
        }
        if TIMEOUT_SEEN.try_with(|seen| seen.set(true)).is_err() {
            self.sink.increment(TIMEOUT_COUNTER);
        }
    }
}

impl Default for StatsCollector {
    fn default() -> Self {
        Self::disabled()
    }
}

impl std::fmt::Debug for StatsCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatsCollector").finish_non_exhaustive()
    }
}
