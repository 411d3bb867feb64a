//! Test doubles shared by the integration suites.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use vestibule_metrics::MetricsSink;
use vestibule_session::*;

/// How [`FlakyBackend`] answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Healthy,
    Unavailable,
    Timeout,
    Rejected,
}

/// A backend call as seen by [`FlakyBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Exists(String),
    Get(String),
    Set(String, Vec<u8>),
    SetWithExpiry(String, Vec<u8>, Duration),
    SetIfAbsent(String, Option<Duration>),
    Delete(String),
    Take(String),
    AddToSet(String, String),
    RemoveFromSet(String, String),
    SetMembers(String),
}

/// In-memory backend that records every call and can be switched into
/// failure modes.
#[derive(Debug)]
pub struct FlakyBackend {
    pub memory: MemoryBackend,
    mode: Mutex<Mode>,
    index_mode: Mutex<Mode>,
    calls: Mutex<Vec<Call>>,
    races_to_lose: Mutex<usize>,
}

impl FlakyBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            memory: MemoryBackend::new(),
            mode: Mutex::new(Mode::Healthy),
            index_mode: Mutex::new(Mode::Healthy),
            calls: Mutex::new(Vec::new()),
            races_to_lose: Mutex::new(0),
        })
    }

    pub fn set_mode(&self, mode: Mode) {
        *self.mode.lock() = mode;
    }

    /// Fail only the user index set commands; session records stay healthy.
    pub fn set_index_mode(&self, mode: Mode) {
        *self.index_mode.lock() = mode;
    }

    /// Make the next `n` set-if-absent calls report the key as taken, as if
    /// a concurrent request created it between `exists` and the write.
    pub fn lose_races(&self, n: usize) {
        *self.races_to_lose.lock() = n;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    fn enter(&self, call: Call) -> BackendResult<()> {
        self.calls.lock().push(call);
        answer(*self.mode.lock())
    }

    fn enter_index(&self, call: Call) -> BackendResult<()> {
        self.enter(call)?;
        answer(*self.index_mode.lock())
    }
}

fn answer(mode: Mode) -> BackendResult<()> {
    match mode {
        Mode::Healthy => Ok(()),
        Mode::Unavailable => Err(BackendError::Unavailable("connection refused".into())),
        Mode::Timeout => Err(BackendError::Timeout("command timed out".into())),
        Mode::Rejected => Err(BackendError::Rejected("WRONGTYPE".into())),
    }
}

#[async_trait]
impl SessionBackend for FlakyBackend {
    async fn exists(&self, key: &str) -> BackendResult<bool> {
        self.enter(Call::Exists(key.to_string()))?;
        self.memory.exists(key).await
    }

    async fn get(&self, key: &str) -> BackendResult<Option<Vec<u8>>> {
        self.enter(Call::Get(key.to_string()))?;
        self.memory.get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> BackendResult<()> {
        self.enter(Call::Set(key.to_string(), value.clone()))?;
        self.memory.set(key, value).await
    }

    async fn set_with_expiry(&self, key: &str, value: Vec<u8>, ttl: Duration) -> BackendResult<()> {
        self.enter(Call::SetWithExpiry(key.to_string(), value.clone(), ttl))?;
        self.memory.set_with_expiry(key, value, ttl).await
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> BackendResult<bool> {
        self.enter(Call::SetIfAbsent(key.to_string(), ttl))?;
        {
            let mut races = self.races_to_lose.lock();
            if *races > 0 {
                *races -= 1;
                return Ok(false);
            }
        }
        self.memory.set_if_absent(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> BackendResult<u64> {
        self.enter(Call::Delete(key.to_string()))?;
        self.memory.delete(key).await
    }

    async fn take(&self, key: &str) -> BackendResult<Option<Vec<u8>>> {
        self.enter(Call::Take(key.to_string()))?;
        self.memory.take(key).await
    }

    async fn add_to_set(&self, key: &str, member: &str) -> BackendResult<()> {
        self.enter_index(Call::AddToSet(key.to_string(), member.to_string()))?;
        self.memory.add_to_set(key, member).await
    }

    async fn remove_from_set(&self, key: &str, member: &str) -> BackendResult<()> {
        self.enter_index(Call::RemoveFromSet(key.to_string(), member.to_string()))?;
        self.memory.remove_from_set(key, member).await
    }

    async fn set_members(&self, key: &str) -> BackendResult<Vec<String>> {
        self.enter(Call::SetMembers(key.to_string()))?;
        self.memory.set_members(key).await
    }
}

/// A metrics sample as seen by [`RecordingSink`].
#[derive(Debug, Clone, PartialEq)]
pub enum Sample {
    Increment(String),
    Timing(String, Duration),
}

#[derive(Debug, Default)]
pub struct RecordingSink {
    samples: Mutex<Vec<Sample>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn samples(&self) -> Vec<Sample> {
        self.samples.lock().clone()
    }

    pub fn increments(&self, name: &str) -> usize {
        self.samples
            .lock()
            .iter()
            .filter(|s| matches!(s, Sample::Increment(n) if n == name))
            .count()
    }

    pub fn timings(&self, name: &str) -> usize {
        self.samples
            .lock()
            .iter()
            .filter(|s| matches!(s, Sample::Timing(n, _) if n == name))
            .count()
    }
}

impl MetricsSink for RecordingSink {
    fn increment(&self, name: &str) {
        self.samples.lock().push(Sample::Increment(name.to_string()));
    }

    fn timing(&self, name: &str, duration: Duration) {
        self.samples
            .lock()
            .push(Sample::Timing(name.to_string(), duration));
    }
}

/// Records every notification it receives.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    faults: Mutex<Vec<(&'static str, BackendError)>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn faults(&self) -> Vec<(&'static str, BackendError)> {
        self.faults.lock().clone()
    }
}

impl FaultNotifier for RecordingNotifier {
    fn notify(&self, operation: &'static str, error: &BackendError) {
        self.faults.lock().push((operation, error.clone()));
    }
}

/// A service over `backend` with a recording sink and notifier.
pub fn service_with(
    config: SessionConfig,
    backend: Arc<FlakyBackend>,
) -> (SessionService, Arc<RecordingSink>, Arc<RecordingNotifier>) {
    let sink = RecordingSink::new();
    let notifier = RecordingNotifier::new();
    let service = SessionService::builder(config)
        .backend(backend)
        .metrics_sink(sink.clone())
        .notifier(notifier.clone())
        .build()
        .unwrap();
    (service, sink, notifier)
}
