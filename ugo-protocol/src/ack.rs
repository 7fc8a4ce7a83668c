//! ACK frame processing
//!
//! Reconciles the peer's range-compressed acknowledgment against the packet
//! history. Every packet number in the window the frame describes ends up
//! either acknowledged or counted as missing, and the aggregate outcome is
//! reported to congestion control in one event.

use crate::congestion::{CongestionAdapter, SendAlgorithm};
use crate::error::HandlerError;
use crate::loss::LossDetector;
use crate::packet::{PacketNumber, PacketVector};
use crate::rtt::RttEstimator;
use crate::tracker::SentPacketTracker;
use std::time::Duration;
use ugo_io::Timestamp;

/// Inclusive range of acknowledged packet numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckRange {
    /// First packet number in range
    pub first: PacketNumber,
    /// Last packet number in range (inclusive)
    pub last: PacketNumber,
}

impl AckRange {
    /// Create a new ack range
    pub fn new(first: PacketNumber, last: PacketNumber) -> Self {
        AckRange { first, last }
    }

    /// Create a single-packet ack range
    pub fn single(number: PacketNumber) -> Self {
        AckRange {
            first: number,
            last: number,
        }
    }

    /// Check if this range contains a packet number
    pub fn contains(&self, number: PacketNumber) -> bool {
        self.first <= number && number <= self.last
    }

    /// Number of packets in the range
    pub fn len(&self) -> u32 {
        if self.last < self.first {
            0
        } else {
            self.last - self.first + 1
        }
    }

    /// Check if the range is malformed (last before first)
    pub fn is_empty(&self) -> bool {
        self.last < self.first
    }
}

/// Decoded acknowledgment frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckFrame {
    /// Largest packet number acknowledged by this frame
    pub largest_acked: PacketNumber,
    /// Lower edge of the window this frame describes
    pub largest_in_order: PacketNumber,
    /// Time the peer held the ack before sending it
    pub delay: Duration,
    /// Acknowledged ranges, descending and non-overlapping; empty means the
    /// whole window is acknowledged
    pub ack_ranges: Vec<AckRange>,
}

impl AckFrame {
    /// Create a frame acknowledging `largest_in_order..=largest_acked` entirely
    pub fn new(largest_in_order: PacketNumber, largest_acked: PacketNumber) -> Self {
        AckFrame {
            largest_acked,
            largest_in_order,
            delay: Duration::ZERO,
            ack_ranges: Vec::new(),
        }
    }

    /// Set the acknowledged ranges
    pub fn with_ranges(mut self, ack_ranges: Vec<AckRange>) -> Self {
        self.ack_ranges = ack_ranges;
        self
    }

    /// Set the peer's ack delay
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Check if the frame reports gaps
    pub fn has_missing_ranges(&self) -> bool {
        !self.ack_ranges.is_empty()
    }
}

/// Outcome of processing one acknowledgment frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AckOutcome {
    /// Packets newly acknowledged
    pub acked: PacketVector,
    /// Packets newly queued for retransmission
    pub lost: PacketVector,
    /// Whether the frame produced an RTT sample
    pub rtt_updated: bool,
}

/// Process an acknowledgment frame
///
/// Returns `Ok(None)` for a stale frame that carries nothing new.
pub(crate) fn process_ack<C: SendAlgorithm, R: RttEstimator>(
    tracker: &mut SentPacketTracker,
    loss: &mut LossDetector,
    congestion: &mut CongestionAdapter<C, R>,
    frame: &AckFrame,
    ack_sequence: u32,
    now: Timestamp,
) -> Result<Option<AckOutcome>, HandlerError> {
    if frame.largest_acked > tracker.last_sent_packet_number {
        return Err(HandlerError::AckForUnsentPacket {
            largest_acked: frame.largest_acked,
            last_sent: tracker.last_sent_packet_number,
        });
    }

    if ack_sequence != 0 {
        if ack_sequence <= tracker.largest_received_ack_sequence {
            return Err(HandlerError::DuplicateOrOutOfOrderAck {
                sequence: ack_sequence,
                last_seen: tracker.largest_received_ack_sequence,
            });
        }
        tracker.largest_received_ack_sequence = ack_sequence;
    }

    // Repeated or delayed ack with nothing beyond what was already processed
    if frame.largest_acked <= tracker.largest_in_order_acked
        || frame.largest_acked <= tracker.largest_acked
    {
        tracing::trace!(
            "ignoring stale ack for {} (largest acked {}, in order {})",
            frame.largest_acked,
            tracker.largest_acked,
            tracker.largest_in_order_acked
        );
        return Ok(None);
    }

    tracker.largest_acked = frame.largest_acked;

    let mut outcome = AckOutcome::default();

    if let Some(packet) = tracker.history.get(frame.largest_acked) {
        let sample = now - packet.send_time;
        congestion.update_rtt(sample, frame.delay, now);
        outcome.rtt_updated = true;
        tracing::trace!("RTT sample {:?}, smoothed {:?}", sample, congestion.smoothed_rtt());
    }

    // Packets below the frame's window that the peer passed over; nothing
    // above largest_acked was passed over, whatever the frame claims
    let pre_window_end = frame
        .largest_in_order
        .min(frame.largest_acked.saturating_add(1));
    for number in tracker.largest_in_order_acked..pre_window_end {
        if let Some(lost) = loss.nack(tracker, number) {
            outcome.lost.push(lost);
        }
    }

    let mut ranges = frame.ack_ranges.clone();
    ranges.sort_unstable_by_key(|range| range.first);
    let mut range_index = 0;

    for number in frame.largest_in_order..=frame.largest_acked {
        let acked = if ranges.is_empty() {
            true
        } else {
            while number > ranges[range_index].last && range_index + 1 < ranges.len() {
                range_index += 1;
            }
            ranges[range_index].contains(number)
        };

        if acked {
            if let Some(packet) = tracker.ack_packet(number) {
                // A belated ack for a queued packet was already reported lost
                if !packet.retransmitted {
                    outcome.acked.push(packet.info());
                }
            }
        } else if let Some(lost) = loss.nack(tracker, number) {
            outcome.lost.push(lost);
        }
    }

    congestion.on_congestion_event(
        outcome.rtt_updated,
        tracker.history.bytes_in_flight(),
        &outcome.acked,
        &outcome.lost,
    );

    tracing::trace!(
        "ack {}..={}: {} acked, {} lost, in order {}, {} bytes in flight",
        frame.largest_in_order,
        frame.largest_acked,
        outcome.acked.len(),
        outcome.lost.len(),
        tracker.largest_in_order_acked,
        tracker.history.bytes_in_flight()
    );

    Ok(Some(outcome))
}
