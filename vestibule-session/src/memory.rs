//! In-process backend.

use crate::backend::SessionBackend;
use crate::error::BackendResult;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn new(value: Vec<u8>, ttl: Option<Duration>, now: Instant) -> Self {
        Self {
            value,
            expires_at: ttl.map(|ttl| now + ttl),
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// A [`SessionBackend`] kept in process memory.
///
/// Expiry is evaluated against Tokio's clock, so paused-time tests can
/// advance past a TTL. Expired entries are dropped on access and swept on
/// every write. Suitable for tests and single-process
/// development; nothing is shared between processes.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, Entry>>,
    sets: Mutex<HashMap<String, BTreeSet<String>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.lock().values().filter(|e| e.is_live(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remaining time to live of `key`; `None` if absent or without expiry.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        self.entries
            .lock()
            .get(key)
            .filter(|e| e.is_live(now))
            .and_then(|e| e.expires_at)
            .map(|at| at.saturating_duration_since(now))
    }

    fn live_value(&self, key: &str) -> Option<Vec<u8>> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn write(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        sweep(&mut entries, now);
        entries.insert(key.to_string(), Entry::new(value, ttl, now));
    }
}

// Drops every expired entry, so keys that are never read again do not pile up.
fn sweep(entries: &mut HashMap<String, Entry>, now: Instant) {
    entries.retain(|_, e| e.is_live(now));
}

#[async_trait]
impl SessionBackend for MemoryBackend {
    async fn exists(&self, key: &str) -> BackendResult<bool> {
        Ok(self.live_value(key).is_some())
    }

    async fn get(&self, key: &str) -> BackendResult<Option<Vec<u8>>> {
        Ok(self.live_value(key))
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> BackendResult<()> {
        self.write(key, value, None);
        Ok(())
    }

    async fn set_with_expiry(&self, key: &str, value: Vec<u8>, ttl: Duration) -> BackendResult<()> {
        self.write(key, value, Some(ttl));
        Ok(())
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> BackendResult<bool> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        sweep(&mut entries, now);
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.to_string(), Entry::new(value, ttl, now));
        Ok(true)
    }

    async fn delete(&self, key: &str) -> BackendResult<u64> {
        let now = Instant::now();
        let removed = self.entries.lock().remove(key);
        Ok(removed.filter(|e| e.is_live(now)).map_or(0, |_| 1))
    }

    async fn take(&self, key: &str) -> BackendResult<Option<Vec<u8>>> {
        let now = Instant::now();
        let removed = self.entries.lock().remove(key);
        Ok(removed.filter(|e| e.is_live(now)).map(|e| e.value))
    }

    async fn add_to_set(&self, key: &str, member: &str) -> BackendResult<()> {
        self.sets
            .lock()
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string());
        Ok(())
    }

    async fn remove_from_set(&self, key: &str, member: &str) -> BackendResult<()> {
        let mut sets = self.sets.lock();
        if let Some(members) = sets.get_mut(key) {
            members.remove(member);
            if members.is_empty() {
                sets.remove(key);
            }
        }
        Ok(())
    }

    async fn set_members(&self, key: &str) -> BackendResult<Vec<String>> {
        Ok(self
            .sets
            .lock()
            .get(key)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default())
    }
}
