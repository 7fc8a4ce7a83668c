//! Sender-side packet state
//!
//! Owns the packet history, the retransmission queue, the stop-waiting
//! boundary and the packet-number watermarks. The loss detector and the ack
//! engine mutate this state; the handler facade composes them.

use crate::error::HandlerError;
use crate::history::PacketHistory;
use crate::packet::{Packet, PacketInfo, PacketNumber, SentPacket};
use crate::retransmission::RetransmissionQueue;
use crate::stop_waiting::StopWaitingManager;
use ugo_io::Timestamp;

/// Per-connection sent packet state
#[derive(Debug, Default)]
pub struct SentPacketTracker {
    pub(crate) history: PacketHistory,
    pub(crate) queue: RetransmissionQueue,
    stop_waiting: StopWaitingManager,
    /// Number of the most recently sent packet, control packets included
    pub(crate) last_sent_packet_number: PacketNumber,
    /// Send time of the most recently sent packet
    pub(crate) last_sent_packet_time: Option<Timestamp>,
    /// Every packet up to and including this one is acked or retransmitted
    pub(crate) largest_in_order_acked: PacketNumber,
    /// Largest packet number the peer ever acknowledged
    pub(crate) largest_acked: PacketNumber,
    /// Largest ack frame sequence processed so far
    pub(crate) largest_received_ack_sequence: u32,
}

impl SentPacketTracker {
    /// Create empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a packet handed to the network
    ///
    /// Returns the congestion-control view of the packet when it enters flight
    /// accounting; control packets only advance the send timeline.
    pub fn record_sent(
        &mut self,
        packet: Packet,
        now: Timestamp,
    ) -> Result<Option<PacketInfo>, HandlerError> {
        let number = packet.number();
        let info = match packet {
            Packet::Trackable { number, payload } => {
                let sent = SentPacket::new(number, payload, now);
                let info = sent.info();
                self.history.record_sent(sent)?;
                Some(info)
            }
            Packet::Control { number } => {
                if self.history.contains(number) {
                    return Err(HandlerError::DuplicatePacketNumber(number));
                }
                None
            }
        };

        self.last_sent_packet_number = number;
        self.last_sent_packet_time = Some(now);
        Ok(info)
    }

    /// Resolve an acknowledged packet
    ///
    /// Returns the record if it was still tracked. The in-order watermark moves
    /// even when the record is already gone, since the number is resolved
    /// either way.
    pub fn ack_packet(&mut self, number: PacketNumber) -> Option<SentPacket> {
        let packet = self.history.resolve_acked(number);

        if self.largest_in_order_acked.checked_add(1) == Some(number) {
            self.advance_in_order();
        }

        packet
    }

    /// Queue a tracked packet for retransmission
    ///
    /// Releases its bytes from flight, pushes it onto the retransmission queue
    /// and marks it. Returns `None` for unknown or already-queued packets.
    pub fn queue_for_retransmission(&mut self, number: PacketNumber) -> Option<PacketInfo> {
        let info = self.history.mark_retransmitted(number)?;
        self.queue.push(number);

        if self.largest_in_order_acked.checked_add(1) == Some(number) {
            self.advance_in_order();
        }

        tracing::debug!(
            "queued packet {} ({} bytes) for retransmission, in-order boundary {}",
            info.number,
            info.length,
            self.largest_in_order_acked
        );
        Some(info)
    }

    /// Pop the next packet to resend, removing it from the history
    pub fn dequeue_for_retransmission(&mut self) -> Option<SentPacket> {
        self.queue.pop(&mut self.history)
    }

    /// Step the in-order watermark past the next packet and every following
    /// packet that is already resolved, up to the largest acknowledged one
    fn advance_in_order(&mut self) {
        self.largest_in_order_acked += 1;

        while self.largest_in_order_acked < self.largest_acked {
            let next = self.largest_in_order_acked + 1;
            let resolved = self
                .history
                .get(next)
                .map_or(true, |packet| packet.retransmitted);
            if !resolved {
                break;
            }
            self.largest_in_order_acked = next;
        }

        self.stop_waiting.set_boundary(self.largest_in_order_acked);
    }

    /// Packet history
    pub fn history(&self) -> &PacketHistory {
        &self.history
    }

    /// Entries waiting in the retransmission queue
    pub fn queued_retransmissions(&self) -> usize {
        self.queue.len()
    }

    /// History entries plus retransmission queue entries
    pub fn tracked_len(&self) -> usize {
        self.history.len() + self.queue.len()
    }

    /// Number of the most recently sent packet, trackable or control
    pub fn last_sent_packet_number(&self) -> PacketNumber {
        self.last_sent_packet_number
    }

    /// Send time of the most recent packet, `None` before the first send
    pub fn last_sent_packet_time(&self) -> Option<Timestamp> {
        self.last_sent_packet_time
    }

    /// Every packet up to this number is acked or queued for retransmission
    pub fn largest_in_order_acked(&self) -> PacketNumber {
        self.largest_in_order_acked
    }

    /// Largest packet number the peer acknowledged directly
    pub fn largest_acked(&self) -> PacketNumber {
        self.largest_acked
    }

    /// Lowest packet number the peer should still consider outstanding
    pub fn stop_waiting_boundary(&self) -> PacketNumber {
        self.stop_waiting.least_unacked()
    }
}
