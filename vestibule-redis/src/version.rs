//! Server version parsing and capability resolution.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A `major.minor.patch` Redis server version as reported by `INFO server`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ServerVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ServerVersion {
    /// First release shipping `GETDEL`.
    pub const GETDEL: ServerVersion = ServerVersion::new(6, 2, 0);

    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse a dotted version string. Missing components default to zero.
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.trim().split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next().map(str::parse::<u32>).transpose().ok()?.unwrap_or(0);
        let patch = parts.next().map(str::parse::<u32>).transpose().ok()?.unwrap_or(0);
        Some(Self::new(major, minor, patch))
    }

    /// Extract `redis_version` from an `INFO server` reply.
    pub fn from_info(info: &str) -> Option<Self> {
        info.lines()
            .find_map(|line| line.strip_prefix("redis_version:"))
            .and_then(Self::parse)
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// How a fetch-then-delete is carried out against the server.
///
/// Resolved once when the service is built and never re-read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TakeStrategy {
    /// Single atomic `GETDEL`.
    GetDel,
    /// `GET` followed by `DEL`; not atomic against concurrent writers.
    GetThenDel,
}

impl TakeStrategy {
    /// Pick the strategy for a detected server version.
    ///
    /// An unknown version falls back to the portable two-command form.
    pub fn for_version(version: Option<ServerVersion>) -> Self {
        match version {
            Some(v) if v >= ServerVersion::GETDEL => Self::GetDel,
            _ => Self::GetThenDel,
        }
    }
}
