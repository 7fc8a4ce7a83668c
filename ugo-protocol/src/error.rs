//! Errors surfaced by the sent-packet handler

use thiserror::Error;

/// Sent packet handler errors
///
/// `DuplicateOrOutOfOrderAck` is benign and meant to be dropped by the
/// connection layer. Every other kind is fatal to the connection.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerError {
    #[error("Packet number {0} already exists in packet history")]
    DuplicatePacketNumber(u32),

    #[error("Packet {0} cannot be empty")]
    EmptyPacket(u32),

    #[error("Received ACK for unsent packet {largest_acked} (last sent {last_sent})")]
    AckForUnsentPacket { largest_acked: u32, last_sent: u32 },

    #[error("Duplicate or out-of-order ACK (sequence {sequence}, last seen {last_seen})")]
    DuplicateOrOutOfOrderAck { sequence: u32, last_seen: u32 },

    #[error("Too many outstanding non-acked and non-retransmitted packets: {0}")]
    TooManyTrackedPackets(usize),
}

impl HandlerError {
    /// Whether the connection must be torn down after this error
    pub fn is_fatal(&self) -> bool {
        !matches!(self, HandlerError::DuplicateOrOutOfOrderAck { .. })
    }
}
