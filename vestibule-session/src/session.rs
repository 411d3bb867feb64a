//! Session data model.

use crate::error::{SessionError, SessionResult};
use crate::id::SessionId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Reserved key holding the identifier a session was last stored under.
///
/// Only ever compared against the requested identifier; never used for lookup.
pub const EMBEDDED_ID_KEY: &str = "_embedded_id";

/// A value stored in a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Raw bytes. Bytes holding valid UTF-8 become [`SessionValue::Text`]
    /// when a session is normalized.
    Bytes(Vec<u8>),
    List(Vec<SessionValue>),
    Map(BTreeMap<String, SessionValue>),
}

impl SessionValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, SessionValue>> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Canonical text form of this value and everything nested in it.
    pub fn normalized(&self) -> SessionValue {
        match self {
            Self::Bytes(bytes) => match std::str::from_utf8(bytes) {
                Ok(text) => Self::Text(text.to_string()),
                Err(_) => Self::Bytes(bytes.clone()),
            },
            Self::List(items) => Self::List(items.iter().map(Self::normalized).collect()),
            Self::Map(map) => Self::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.normalized()))
                    .collect(),
            ),
            other => other.clone(),
        }
    }
}

impl fmt::Display for SessionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::Text(s) => f.write_str(s),
            Self::Bytes(bytes) => write!(f, "0x{}", hex::encode(bytes)),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Self::Map(map) => {
                f.write_str("{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<&str> for SessionValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for SessionValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for SessionValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for SessionValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for SessionValue {
    fn from(i: i32) -> Self {
        Self::Int(i.into())
    }
}

impl From<u32> for SessionValue {
    fn from(i: u32) -> Self {
        Self::Int(i.into())
    }
}

impl From<f64> for SessionValue {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<Vec<u8>> for SessionValue {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Vec<SessionValue>> for SessionValue {
    fn from(items: Vec<SessionValue>) -> Self {
        Self::List(items)
    }
}

impl From<BTreeMap<String, SessionValue>> for SessionValue {
    fn from(map: BTreeMap<String, SessionValue>) -> Self {
        Self::Map(map)
    }
}

/// Session data: an unordered mapping from string keys to [`SessionValue`]s.
///
/// A session whose only key is [`EMBEDDED_ID_KEY`] counts as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Session {
    data: BTreeMap<String, SessionValue>,
}

impl Session {
    /// Create an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a value from the session data.
    pub fn get(&self, key: &str) -> Option<&SessionValue> {
        self.data.get(key)
    }

    /// Set a value in the session data, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<SessionValue>) -> Option<SessionValue> {
        self.data.insert(key.into(), value.into())
    }

    /// Remove a value from the session data.
    pub fn remove(&mut self, key: &str) -> Option<SessionValue> {
        self.data.remove(key)
    }

    /// Check if a key exists in the session data.
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Application keys, excluding the embedded identifier.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data
            .keys()
            .map(String::as_str)
            .filter(|k| *k != EMBEDDED_ID_KEY)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SessionValue)> {
        self.data.iter()
    }

    /// Number of application keys.
    pub fn len(&self) -> usize {
        self.keys().count()
    }

    /// True when no application key is set.
    pub fn is_empty(&self) -> bool {
        self.keys().next().is_none()
    }

    /// Clear all session data, including the embedded identifier.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// The identifier this session claims to belong to, if any.
    pub fn embedded_id(&self) -> Option<&SessionValue> {
        self.data.get(EMBEDDED_ID_KEY)
    }

    /// Tag the session with the identifier it is stored under.
    pub fn embed_id(&mut self, id: &SessionId) {
        self.data
            .insert(EMBEDDED_ID_KEY.to_string(), SessionValue::Text(id.to_string()));
    }

    /// A copy of this session with every byte string that holds UTF-8 turned
    /// into text, recursively.
    pub fn normalized(&self) -> Session {
        Session {
            data: self
                .data
                .iter()
                .map(|(k, v)| (k.clone(), v.normalized()))
                .collect(),
        }
    }

    /// Serialize to the stored binary form.
    pub fn to_bytes(&self) -> SessionResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| SessionError::Serialization(e.to_string()))
    }

    /// Deserialize from the stored binary form.
    pub fn from_bytes(bytes: &[u8]) -> SessionResult<Self> {
        bincode::deserialize(bytes).map_err(|e| SessionError::Deserialization(e.to_string()))
    }
}

impl<K, V> FromIterator<(K, V)> for Session
where
    K: Into<String>,
    V: Into<SessionValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Session {
            data: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Session
where
    K: Into<String>,
    V: Into<SessionValue>,
{
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}
