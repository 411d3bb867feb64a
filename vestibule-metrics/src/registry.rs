//! Prometheus-backed sink.

use crate::MetricsSink;
use parking_lot::Mutex;
use prometheus::{Counter, Encoder, Histogram, HistogramOpts, Registry, TextEncoder};
use std::collections::HashMap;
use std::time::Duration;

/// Default buckets for timing samples, in milliseconds.
pub const DEFAULT_TIMING_BUCKETS_MS: &[f64] = &[
    0.5, 1.0, 2.5, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1_000.0, 2_500.0, 5_000.0,
];

/// Records samples into a Prometheus registry owned by the sink.
///
/// Metrics are registered lazily on first use. Names are sanitised for
/// Prometheus, so `sessions.timeout` becomes `sessions_timeout` and
/// `sessions.request_duration` becomes the histogram
/// `sessions_request_duration_ms`.
///
/// # Examples
///
/// ```
/// use vestibule_metrics::*;
///
/// let sink = PrometheusSink::new();
/// sink.increment("sessions.timeout");
/// assert!(sink.export().contains("sessions_timeout 1"));
/// ```
pub struct PrometheusSink {
    registry: Registry,
    buckets: Vec<f64>,
    counters: Mutex<HashMap<String, Counter>>,
    histograms: Mutex<HashMap<String, Histogram>>,
}

impl PrometheusSink {
    /// Create a sink with a fresh registry.
    pub fn new() -> Self {
        Self::with_registry(Registry::new())
    }

    /// Create a sink that registers into an existing registry.
    pub fn with_registry(registry: Registry) -> Self {
        Self {
            registry,
            buckets: DEFAULT_TIMING_BUCKETS_MS.to_vec(),
            counters: Mutex::new(HashMap::new()),
            histograms: Mutex::new(HashMap::new()),
        }
    }

    /// Use custom histogram buckets (milliseconds).
    pub fn with_buckets(mut self, buckets: Vec<f64>) -> Self {
        self.buckets = buckets;
        self
    }

    /// The registry samples are recorded in.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Export the registry in the text exposition format.
    pub fn export(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::error!("Failed to encode metrics: {}", e);
            return String::from("# Error encoding metrics\n");
        }

        String::from_utf8(buffer)
            .unwrap_or_else(|_| String::from("# Error converting metrics to UTF-8\n"))
    }

    fn counter(&self, name: &str) -> Option<Counter> {
        let mut counters = self.counters.lock();
        if let Some(counter) = counters.get(name) {
            return Some(counter.clone());
        }

        let metric_name = sanitize(name);
        let counter = Counter::new(metric_name.as_str(), format!("Count of {}", name))
            .and_then(|c| self.registry.register(Box::new(c.clone())).map(|_| c));

        match counter {
            Ok(counter) => {
                counters.insert(name.to_string(), counter.clone());
                Some(counter)
            }
            Err(e) => {
                tracing::warn!(metric = %metric_name, "Failed to register counter: {}", e);
                None
            }
        }
    }

    fn histogram(&self, name: &str) -> Option<Histogram> {
        let mut histograms = self.histograms.lock();
        if let Some(histogram) = histograms.get(name) {
            return Some(histogram.clone());
        }

        let metric_name = format!("{}_ms", sanitize(name));
        let opts = HistogramOpts::new(metric_name.as_str(), format!("Duration of {} in milliseconds", name))
            .buckets(self.buckets.clone());
        let histogram = Histogram::with_opts(opts)
            .and_then(|h| self.registry.register(Box::new(h.clone())).map(|_| h));

        match histogram {
            Ok(histogram) => {
                histograms.insert(name.to_string(), histogram.clone());
                Some(histogram)
            }
            Err(e) => {
                tracing::warn!(metric = %metric_name, "Failed to register histogram: {}", e);
                None
            }
        }
    }
}

impl Default for PrometheusSink {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsSink for PrometheusSink {
    fn increment(&self, name: &str) {
        if let Some(counter) = self.counter(name) {
            counter.inc();
        }
    }

    fn timing(&self, name: &str, duration: Duration) {
        if let Some(histogram) = self.histogram(name) {
            histogram.observe(duration.as_secs_f64() * 1_000.0);
        }
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == ':' { c } else { '_' })
        .collect()
}
