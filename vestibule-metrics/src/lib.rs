//! Metrics sinks for the Vestibule session layer
//!
//! The session service reports two things: how long each session operation
//! took and how often the backend timed out. This crate provides the sinks
//! those samples are written to.
//!
//! # Sinks
//!
//! - [`StatsdSink`] - fire-and-forget StatsD datagrams to a `host:port`
//! - [`PrometheusSink`] - counters and histograms in a Prometheus registry
//! - [`NoopSink`] - discards everything
//!
//! # Quick Start
//!
//! ```no_run
//! use vestibule_metrics::*;
//! use std::time::Duration;
//!
//! let sink = StatsdSink::connect("statsd.internal:8125").unwrap();
//! sink.increment("sessions.timeout");
//! sink.timing("sessions.request_duration", Duration::from_millis(3));
//! ```

pub mod address;
pub mod error;
pub mod registry;
pub mod sink;
pub mod statsd;

pub use address::MetricsAddress;
pub use error::{MetricsError, MetricsResult};
pub use prometheus;
pub use registry::{DEFAULT_TIMING_BUCKETS_MS, PrometheusSink};
pub use sink::{MetricsSink, NoopSink};
pub use statsd::StatsdSink;
