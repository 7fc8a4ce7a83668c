//! Packet history and bytes-in-flight accounting
//!
//! Authoritative map of packet numbers to the records of packets that were
//! sent but are not yet resolved. A packet leaves the history when it is
//! acknowledged or when it is dequeued for retransmission.

use crate::error::HandlerError;
use crate::packet::{PacketInfo, PacketNumber, SentPacket};
use std::collections::HashMap;

/// Sent packet history
#[derive(Debug, Default)]
pub struct PacketHistory {
    /// Records keyed by packet number
    packets: HashMap<PacketNumber, SentPacket>,
    /// Bytes of tracked packets neither acknowledged nor queued for retransmission
    bytes_in_flight: u32,
    /// Total bytes recorded as sent
    total_sent: u64,
    /// Total bytes acknowledged
    total_acked: u64,
}

impl PacketHistory {
    /// Create an empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sent packet
    ///
    /// Rejects a number that is already tracked and packets with no payload.
    pub fn record_sent(&mut self, packet: SentPacket) -> Result<(), HandlerError> {
        if self.packets.contains_key(&packet.number) {
            return Err(HandlerError::DuplicatePacketNumber(packet.number));
        }
        if packet.length == 0 {
            return Err(HandlerError::EmptyPacket(packet.number));
        }

        self.total_sent += u64::from(packet.length);
        self.bytes_in_flight = self.bytes_in_flight.saturating_add(packet.length);
        self.packets.insert(packet.number, packet);
        Ok(())
    }

    /// Remove an acknowledged packet and release its bytes
    ///
    /// A packet already queued for retransmission released its bytes at that
    /// point, so only its record is dropped. Returns `None` if the number is
    /// not tracked (already resolved).
    pub fn resolve_acked(&mut self, number: PacketNumber) -> Option<SentPacket> {
        let packet = self.packets.remove(&number)?;

        if !packet.retransmitted {
            self.release_bytes(packet.number, packet.length);
            self.total_acked += u64::from(packet.length);
        }

        Some(packet)
    }

    /// Mark a packet as retransmitted and release its bytes from flight
    ///
    /// The record stays in the history until it is dequeued. Returns `None` if
    /// the packet is unknown or was already marked.
    pub fn mark_retransmitted(&mut self, number: PacketNumber) -> Option<PacketInfo> {
        let packet = self.packets.get_mut(&number)?;
        if packet.retransmitted {
            return None;
        }

        packet.retransmitted = true;
        let info = packet.info();
        self.release_bytes(info.number, info.length);
        Some(info)
    }

    /// Drop a record without touching flight accounting
    pub fn remove(&mut self, number: PacketNumber) -> Option<SentPacket> {
        self.packets.remove(&number)
    }

    /// Check whether a packet number is still tracked
    pub fn contains(&self, number: PacketNumber) -> bool {
        self.packets.contains_key(&number)
    }

    /// Get a tracked packet
    pub fn get(&self, number: PacketNumber) -> Option<&SentPacket> {
        self.packets.get(&number)
    }

    /// Get a tracked packet mutably
    pub fn get_mut(&mut self, number: PacketNumber) -> Option<&mut SentPacket> {
        self.packets.get_mut(&number)
    }

    /// Number of tracked packets
    pub fn len(&self) -> usize {
        self.packets.len()
    }

    /// Check if nothing is tracked
    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Bytes currently in flight
    pub fn bytes_in_flight(&self) -> u32 {
        self.bytes_in_flight
    }

    /// Total bytes recorded as sent
    pub fn total_sent(&self) -> u64 {
        self.total_sent
    }

    /// Total bytes acknowledged
    pub fn total_acked(&self) -> u64 {
        self.total_acked
    }

    fn release_bytes(&mut self, number: PacketNumber, length: u32) {
        if self.bytes_in_flight < length {
            tracing::warn!(
                "bytes in flight ({}) less than length of packet {} ({}), clamping to zero",
                self.bytes_in_flight,
                number,
                length
            );
            self.bytes_in_flight = 0;
        } else {
            self.bytes_in_flight -= length;
        }
    }
}
