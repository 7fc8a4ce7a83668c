//! Sent packet structures
//!
//! The connection layer hands the sender core already-built packets. A packet
//! is either trackable (carries payload bytes that count against the
//! congestion window and may be retransmitted) or control (zero-length
//! signalling that only advances the send timeline).

use bytes::Bytes;
use std::fmt;
use ugo_io::Timestamp;

/// Packet number type
///
/// Assigned monotonically by the connection layer. Zero is never a valid
/// packet number; it is the "nothing yet" value of every boundary.
pub type PacketNumber = u32;

/// A packet handed to the sender core at transmission time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    /// Payload-carrying packet tracked for acknowledgment and retransmission
    Trackable { number: PacketNumber, payload: Bytes },
    /// Control packet, never enters flight accounting
    Control { number: PacketNumber },
}

impl Packet {
    /// Create a trackable packet
    pub fn trackable(number: PacketNumber, payload: Bytes) -> Self {
        Packet::Trackable { number, payload }
    }

    /// Create a control packet
    pub fn control(number: PacketNumber) -> Self {
        Packet::Control { number }
    }

    /// Packet number
    pub fn number(&self) -> PacketNumber {
        match self {
            Packet::Trackable { number, .. } | Packet::Control { number } => *number,
        }
    }

    /// Bytes counted against the congestion window
    pub fn length(&self) -> u32 {
        match self {
            Packet::Trackable { payload, .. } => payload_length(payload),
            Packet::Control { .. } => 0,
        }
    }

    /// Check if this is a control packet
    pub fn is_control(&self) -> bool {
        matches!(self, Packet::Control { .. })
    }
}

/// Record of a trackable packet that has been sent
///
/// Lives in the packet history from `sent` until it is acknowledged or
/// dequeued for retransmission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentPacket {
    /// Packet number
    pub number: PacketNumber,
    /// Bytes counted against the congestion window
    pub length: u32,
    /// Payload to resend on retransmission
    pub payload: Bytes,
    /// Time of transmission
    pub send_time: Timestamp,
    /// Times a newer acknowledgment reported this packet missing
    pub missing_reports: u32,
    /// Queued for retransmission; bytes already released from flight
    pub retransmitted: bool,
}

impl SentPacket {
    pub(crate) fn new(number: PacketNumber, payload: Bytes, send_time: Timestamp) -> Self {
        SentPacket {
            number,
            length: payload_length(&payload),
            payload,
            send_time,
            missing_reports: 0,
            retransmitted: false,
        }
    }

    /// (number, length) pair reported to congestion control
    pub fn info(&self) -> PacketInfo {
        PacketInfo {
            number: self.number,
            length: self.length,
        }
    }
}

impl fmt::Display for SentPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "packet {} ({} bytes, {} missing reports{})",
            self.number,
            self.length,
            self.missing_reports,
            if self.retransmitted {
                ", retransmitted"
            } else {
                ""
            }
        )
    }
}

/// Packet identity and size as seen by congestion control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PacketInfo {
    pub number: PacketNumber,
    pub length: u32,
}

/// Packets reported in one congestion event
pub type PacketVector = Vec<PacketInfo>;

fn payload_length(payload: &Bytes) -> u32 {
    u32::try_from(payload.len()).unwrap_or(u32::MAX)
}
