//! `host:port` parsing for metrics endpoints.

use crate::{MetricsError, MetricsResult};
use std::fmt;
use std::net::{SocketAddr, ToSocketAddrs};
use std::str::FromStr;

/// A metrics endpoint given as `host:port`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsAddress {
    pub host: String,
    pub port: u16,
}

impl MetricsAddress {
    /// Parse `host:port`, splitting on the last colon.
    ///
    /// # Examples
    ///
    /// ```
    /// use vestibule_metrics::MetricsAddress;
    ///
    /// let addr = MetricsAddress::parse("statsd:8125").unwrap();
    /// assert_eq!(addr.host, "statsd");
    /// assert_eq!(addr.port, 8125);
    /// ```
    pub fn parse(s: &str) -> MetricsResult<Self> {
        let invalid = |reason: &str| MetricsError::InvalidAddress(s.to_string(), reason.to_string());

        let (host, port) = s.trim().rsplit_once(':').ok_or_else(|| invalid("missing port"))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');

        if host.is_empty() {
            return Err(invalid("missing host"));
        }

        let port: u16 = port.parse().map_err(|_| invalid("port is not a number"))?;
        if port == 0 {
            return Err(invalid("port must be non-zero"));
        }

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }

    /// Resolve to the first socket address the host maps to.
    pub fn resolve(&self) -> MetricsResult<SocketAddr> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| MetricsError::Unresolved(self.host.clone()))
    }
}

impl FromStr for MetricsAddress {
    type Err = MetricsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for MetricsAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_host_and_port() {
        let addr: MetricsAddress = "192.168.59.103:8125".parse().unwrap();
        assert_eq!(addr.host, "192.168.59.103");
        assert_eq!(addr.port, 8125);
    }

    #[test]
    fn test_parse_ipv6() {
        let addr = MetricsAddress::parse("[::1]:8125").unwrap();
        assert_eq!(addr.host, "::1");
        assert_eq!(addr.to_string(), "[::1]:8125");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(MetricsAddress::parse("statsd").is_err());
        assert!(MetricsAddress::parse(":8125").is_err());
        assert!(MetricsAddress::parse("statsd:port").is_err());
        assert!(MetricsAddress::parse("statsd:0").is_err());
        assert!(MetricsAddress::parse("statsd:70000").is_err());
    }

    #[test]
    fn test_resolve_localhost() {
        let addr = MetricsAddress::parse("127.0.0.1:8125").unwrap();
        assert_eq!(addr.resolve().unwrap(), "127.0.0.1:8125".parse().unwrap());
    }
}
