//! Receiver model
//!
//! Plays the peer for the simulator: records arriving packet numbers, honours
//! the sender's stop-waiting floor and builds ack frames describing what it
//! holds at or above that floor.

use bytes::Buf;
use std::collections::{BTreeSet, HashSet};
use std::time::Duration;
use ugo_io::Timestamp;
use ugo_protocol::{AckFrame, AckRange, PacketNumber};

/// Receiver-side counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    /// Packets that arrived
    pub packets_received: u64,
    /// Distinct messages delivered
    pub messages_delivered: u64,
    /// Messages that arrived more than once
    pub duplicate_messages: u64,
    /// Ack frames built
    pub acks_built: u64,
}

/// Receiver model
#[derive(Debug)]
pub struct Receiver {
    /// Lowest packet number the sender still waits on
    floor: PacketNumber,
    /// Received packet numbers at or above the floor
    received: BTreeSet<PacketNumber>,
    /// Largest packet number received
    largest_received: PacketNumber,
    /// Message ids delivered so far
    delivered: HashSet<u64>,
    /// Packets received since the last ack
    unacked: u32,
    /// Arrival time of the oldest unacked packet
    first_unacked_arrival: Option<Timestamp>,
    /// Sequence number of the last ack frame built
    ack_sequence: u32,
    /// Ack after this many packets
    ack_every: u32,
    /// Longest an ack may be held back
    ack_delay: Duration,
    stats: ReceiverStats,
}

impl Receiver {
    /// Create a receiver model
    pub fn new(ack_every: u32, ack_delay: Duration) -> Self {
        Receiver {
            floor: 1,
            received: BTreeSet::new(),
            largest_received: 0,
            delivered: HashSet::new(),
            unacked: 0,
            first_unacked_arrival: None,
            ack_sequence: 0,
            ack_every: ack_every.max(1),
            ack_delay,
            stats: ReceiverStats::default(),
        }
    }

    /// Handle an arriving data packet
    ///
    /// `stop_waiting` is the sender's boundary at the time the packet was
    /// sent; the first 8 payload bytes carry the message id.
    pub fn on_packet(
        &mut self,
        number: PacketNumber,
        stop_waiting: PacketNumber,
        mut payload: &[u8],
        now: Timestamp,
    ) {
        self.stats.packets_received += 1;

        if payload.remaining() >= 8 {
            let message = payload.get_u64();
            if self.delivered.insert(message) {
                self.stats.messages_delivered += 1;
            } else {
                self.stats.duplicate_messages += 1;
            }
        }

        if number >= self.floor {
            self.received.insert(number);
        }
        self.largest_received = self.largest_received.max(number);
        self.on_stop_waiting(stop_waiting);

        self.unacked += 1;
        self.first_unacked_arrival.get_or_insert(now);
    }

    /// Raise the floor, forgetting everything below it
    pub fn on_stop_waiting(&mut self, least_unacked: PacketNumber) {
        if least_unacked <= self.floor {
            return;
        }
        self.floor = least_unacked;
        self.received = self.received.split_off(&least_unacked);
    }

    /// Whether an ack is due
    pub fn ack_due(&self, now: Timestamp) -> bool {
        if self.unacked >= self.ack_every {
            return true;
        }
        self.first_unacked_arrival
            .map_or(false, |first| now.duration_since(first) >= self.ack_delay)
    }

    /// Build the next ack frame and its sequence number
    ///
    /// Returns `None` when nothing was received since the previous frame.
    pub fn build_ack(&mut self, now: Timestamp) -> Option<(AckFrame, u32)> {
        let first = self.first_unacked_arrival.take()?;
        self.unacked = 0;
        self.ack_sequence += 1;
        self.stats.acks_built += 1;

        let mut frame = AckFrame::new(self.floor, self.largest_received)
            .with_delay(now.duration_since(first));

        let ranges = self.ranges();
        let contiguous = ranges.len() == 1 && ranges[0].first == self.floor;
        if !contiguous {
            frame = frame.with_ranges(ranges);
        }

        Some((frame, self.ack_sequence))
    }

    /// Received numbers as descending, non-overlapping ranges
    fn ranges(&self) -> Vec<AckRange> {
        let mut ranges: Vec<AckRange> = Vec::new();
        for &number in &self.received {
            match ranges.last_mut() {
                Some(range) if range.last + 1 == number => range.last = number,
                _ => ranges.push(AckRange::single(number)),
            }
        }
        ranges.reverse();
        ranges
    }

    /// Lowest packet number still awaited
    pub fn floor(&self) -> PacketNumber {
        self.floor
    }

    pub fn stats(&self) -> &ReceiverStats {
        &self.stats
    }
}
