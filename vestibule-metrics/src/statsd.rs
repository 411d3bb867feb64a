//! StatsD over UDP.

use crate::{MetricsAddress, MetricsResult, MetricsSink};
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;
use tracing::debug;

/// Sends StatsD datagrams to a single collector.
///
/// The socket is bound and connected once at construction; every sample is a
/// single non-blocking `send`. Lost datagrams are not reported to the caller.
#[derive(Debug)]
pub struct StatsdSink {
    socket: UdpSocket,
    target: SocketAddr,
}

impl StatsdSink {
    /// Connect to a collector given as `host:port`.
    pub fn connect(host_port: &str) -> MetricsResult<Self> {
        let address = MetricsAddress::parse(host_port)?;
        Self::connect_to(address.resolve()?)
    }

    /// Connect to an already resolved collector address.
    pub fn connect_to(target: SocketAddr) -> MetricsResult<Self> {
        let bind: SocketAddr = if target.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };

        let socket = UdpSocket::bind(bind)?;
        socket.connect(target)?;
        socket.set_nonblocking(true)?;

        Ok(Self { socket, target })
    }

    /// The collector this sink sends to.
    pub fn target(&self) -> SocketAddr {
        self.target
    }

    fn send(&self, payload: String) {
        if let Err(e) = self.socket.send(payload.as_bytes()) {
            debug!(target_addr = %self.target, error = %e, "Dropped StatsD datagram");
        }
    }
}

impl MetricsSink for StatsdSink {
    fn increment(&self, name: &str) {
        self.send(format!("{}:1|c", name));
    }

    fn timing(&self, name: &str, duration: Duration) {
        self.send(format!("{}:{}|ms", name, duration.as_millis()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collector() -> UdpSocket {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        socket
    }

    fn recv(socket: &UdpSocket) -> String {
        let mut buf = [0u8; 512];
        let n = socket.recv(&mut buf).unwrap();
        String::from_utf8_lossy(&buf[..n]).into_owned()
    }

    #[test]
    fn test_counter_datagram() {
        let collector = collector();
        let sink = StatsdSink::connect(&collector.local_addr().unwrap().to_string()).unwrap();

        sink.increment("sessions.timeout");
        assert_eq!(recv(&collector), "sessions.timeout:1|c");
    }

    #[test]
    fn test_timing_datagram() {
        let collector = collector();
        let sink = StatsdSink::connect_to(collector.local_addr().unwrap()).unwrap();

        sink.timing("sessions.request_duration", Duration::from_millis(1042));
        assert_eq!(recv(&collector), "sessions.request_duration:1042|ms");
    }

    #[test]
    fn test_connect_rejects_bad_address() {
        assert!(StatsdSink::connect("no-port").is_err());
    }
}
