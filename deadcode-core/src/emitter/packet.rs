//! Packet splitting and wire encoding

use super::record::MetricRecord;

/// Split buffered records into packets bounded by `threshold` bytes.
///
/// A record joins the current packet only while the packet length plus the
/// record length stays strictly below the threshold. Otherwise the current
/// packet is closed and the record starts a new one, so a record larger than
/// the threshold still travels alone and is never truncated. Order is kept.
///
/// The current packet is closed even when it is still empty: a first record
/// at or over the threshold yields an empty packet ahead of it, which goes
/// out as a bare newline.
///
/// Note the auto-flush trigger fires at `>= threshold`; the two comparisons
/// differ and must stay that way for compatibility with existing collectors.
pub fn pack(records: Vec<MetricRecord>, threshold: usize) -> Vec<Vec<MetricRecord>> {
    let mut packets = Vec::new();
    let mut current: Vec<MetricRecord> = Vec::new();
    let mut current_len = 0usize;

    for record in records {
        let len = record.len();
        if current_len + len < threshold {
            current_len += len;
            current.push(record);
            continue;
        }

        packets.push(std::mem::take(&mut current));
        current_len = len;
        current.push(record);
    }

    if current_len > 0 {
        packets.push(current);
    }

    packets
}

/// Encode one packet as statsd counter lines joined by newlines, plus a
/// trailing newline. An empty packet encodes as `"\n"`.
pub fn encode_packet(records: &[MetricRecord]) -> String {
    let mut payload = records
        .iter()
        .map(MetricRecord::counter_line)
        .collect::<Vec<_>>()
        .join("\n");
    payload.push('\n');
    payload
}
