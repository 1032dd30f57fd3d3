//! Fire-and-forget packet transport
//!
//! A failed send loses one batch of telemetry and nothing else: errors are
//! logged and reported as `false`, never propagated to the instrumented host.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

use super::packet::encode_packet;
use super::record::MetricRecord;

/// Sends one packet of metric records
pub trait Transport {
    /// Transmit `records` as a single packet.
    ///
    /// Returns whether the packet left this process. Callers may ignore it.
    fn transmit(&mut self, records: &[MetricRecord]) -> bool;
}

/// UDP transport to a statsd-compatible collector
///
/// A socket is opened, written and closed inside every `transmit` call; nothing
/// is pooled between packets.
#[derive(Debug, Clone)]
pub struct UdpTransport {
    host: String,
    port: u16,
}

impl UdpTransport {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Destination as configured, `host:port`
    pub fn destination(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn resolve(&self) -> io::Result<SocketAddr> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no address found for {}", self.host),
                )
            })
    }

    fn send(&self, payload: &[u8]) -> io::Result<usize> {
        let target = self.resolve()?;
        let local: SocketAddr = if target.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };

        let socket = UdpSocket::bind(local)?;
        socket.connect(target)?;
        socket.send(payload)
    }
}

impl Transport for UdpTransport {
    fn transmit(&mut self, records: &[MetricRecord]) -> bool {
        let payload = encode_packet(records);

        match self.send(payload.as_bytes()) {
            Ok(written) => {
                tracing::trace!(
                    destination = %self.destination(),
                    records = records.len(),
                    bytes = written,
                    "Sent metric packet"
                );
                true
            }
            Err(e) => {
                tracing::warn!(
                    destination = %self.destination(),
                    records = records.len(),
                    error = %e,
                    "Failed to send metric packet"
                );
                false
            }
        }
    }
}
