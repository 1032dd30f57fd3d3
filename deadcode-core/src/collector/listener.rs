//! UDP receive loop feeding the inventory

use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use super::inventory::SharedInventory;
use super::protocol::parse_metrics;
use crate::error::Result;

/// Largest datagram a UDP socket can deliver
const MAX_DATAGRAM: usize = 65_535;

/// How often the loop wakes up to check for shutdown
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Apply one datagram to the inventory, returning how many class loads it carried
pub fn handle_datagram(payload: &[u8], inventory: &SharedInventory) -> usize {
    let input = String::from_utf8_lossy(payload);
    let metrics = parse_metrics(&input);

    let mut applied = 0;
    let mut inventory = inventory.write();
    for metric in &metrics {
        if let Some(class) = metric.class_name() {
            inventory.increment(&class, metric.increment);
            applied += 1;
        }
    }
    applied
}

/// UDP listener for class load metrics
pub struct CollectorListener {
    socket: UdpSocket,
}

impl CollectorListener {
    pub fn bind(addr: impl ToSocketAddrs) -> Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_read_timeout(Some(POLL_INTERVAL))?;
        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Receive until `shutdown` is set
    pub fn serve(&self, inventory: &SharedInventory, shutdown: &AtomicBool) -> Result<()> {
        tracing::info!(addr = ?self.socket.local_addr().ok(), "Collector listening");
        let mut buf = vec![0u8; MAX_DATAGRAM];

        while !shutdown.load(Ordering::Relaxed) {
            match self.socket.recv_from(&mut buf) {
                Ok((n, peer)) => {
                    let applied = handle_datagram(&buf[..n], inventory);
                    tracing::trace!(%peer, bytes = n, applied, "Received datagram");
                }
                Err(e)
                    if e.kind() == io::ErrorKind::WouldBlock
                        || e.kind() == io::ErrorKind::TimedOut => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to receive datagram");
                }
            }
        }

        tracing::info!("Collector stopped");
        Ok(())
    }
}
