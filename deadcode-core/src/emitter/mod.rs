//! Class load emitter
//!
//! Turns a stream of "class loaded" events into a small number of UDP packets
//! for a statsd-compatible collector, without ever failing the host.
//!
//! ## Data flow
//!
//! ```text
//! class name -> filter -> record -> buffer (+len) -> [len >= packet_size] -> flush
//!                                                                      |
//!                                        pack into packets < packet_size
//!                                                                      |
//!                                                 transmit each packet once
//! ```
//!
//! The emitter is synchronous and single-threaded. Hosts that load classes from
//! several threads share it through [`EmitterHandle`].

mod handle;
mod packet;
mod record;
mod transport;

pub use handle::EmitterHandle;
pub use packet::{encode_packet, pack};
pub use record::{ClassFilter, MetricRecord, COUNTER_SUFFIX, METRIC_NAME};
pub use transport::{Transport, UdpTransport};

use crate::config::EmitterConfig;

/// Emit statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EmitStats {
    /// Events that passed the filter and were buffered
    pub records_accepted: usize,
    /// Events dropped by the namespace filter
    pub records_filtered: usize,
    /// Non-empty flushes performed
    pub flushes: usize,
    /// Packets handed to the transport successfully
    pub packets_sent: usize,
    /// Packets the transport reported as failed
    pub packets_failed: usize,
}

/// Buffers class load records and flushes them as size-bounded packets
pub struct Emitter<T: Transport> {
    filter: ClassFilter,
    packet_size: usize,
    transport: T,
    records: Vec<MetricRecord>,
    /// Always equal to the summed length of `records`
    buffered_len: usize,
    stats: EmitStats,
}

impl Emitter<UdpTransport> {
    /// Create an emitter sending over UDP to the configured host and port
    pub fn from_config(config: &EmitterConfig) -> Self {
        Self::new(
            ClassFilter::new(config.allowed_namespaces.clone()),
            config.packet_size,
            UdpTransport::new(config.host.clone(), config.port),
        )
    }
}

impl<T: Transport> Emitter<T> {
    pub fn new(filter: ClassFilter, packet_size: usize, transport: T) -> Self {
        Self {
            filter,
            packet_size,
            transport,
            records: Vec::new(),
            buffered_len: 0,
            stats: EmitStats::default(),
        }
    }

    /// Record the first load of `class`.
    ///
    /// Flushes before returning once the buffered length reaches the packet size.
    pub fn record_event(&mut self, class: &str) {
        if !self.filter.is_allowed(class) {
            self.stats.records_filtered += 1;
            return;
        }

        let record = MetricRecord::from_class(class);
        self.buffered_len += record.len();
        self.records.push(record);
        self.stats.records_accepted += 1;

        if self.buffered_len >= self.packet_size {
            self.flush();
        }
    }

    /// Send every buffered record and clear the buffer.
    ///
    /// No-op on an empty buffer. The buffer is cleared even when packets fail;
    /// nothing is retried.
    pub fn flush(&mut self) {
        if self.records.is_empty() {
            return;
        }

        let records = std::mem::take(&mut self.records);
        let buffered_len = std::mem::replace(&mut self.buffered_len, 0);
        let record_count = records.len();

        let packets = pack(records, self.packet_size);
        let packet_count = packets.len();
        let mut failed = 0usize;

        for packet in &packets {
            if self.transport.transmit(packet) {
                self.stats.packets_sent += 1;
            } else {
                self.stats.packets_failed += 1;
                failed += 1;
            }
        }
        self.stats.flushes += 1;

        tracing::debug!(
            records = record_count,
            bytes = buffered_len,
            packets = packet_count,
            failed,
            "Flushed class load records"
        );
    }

    /// Number of records waiting for the next flush
    pub fn pending_count(&self) -> usize {
        self.records.len()
    }

    /// Summed byte length of the pending records
    pub fn buffered_len(&self) -> usize {
        self.buffered_len
    }

    pub fn packet_size(&self) -> usize {
        self.packet_size
    }

    pub fn filter(&self) -> &ClassFilter {
        &self.filter
    }

    pub fn stats(&self) -> &EmitStats {
        &self.stats
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}
