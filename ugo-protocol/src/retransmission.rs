//! Retransmission queue
//!
//! Holds the numbers of packets selected for resend. Loss reports tend to
//! arrive newest first, so the queue is drained as a stack. The record itself
//! stays in the packet history until it is dequeued; an entry whose record is
//! gone was acknowledged belatedly and is dropped instead of resent.

use crate::history::PacketHistory;
use crate::packet::{PacketNumber, SentPacket};

/// LIFO queue of packets pending retransmission
#[derive(Debug, Default)]
pub struct RetransmissionQueue {
    stack: Vec<PacketNumber>,
}

impl RetransmissionQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a packet number
    pub fn push(&mut self, number: PacketNumber) {
        self.stack.push(number);
    }

    /// Pop the most recently queued packet that still needs sending
    ///
    /// Removes the returned record from `history`. Entries whose record was
    /// already resolved are discarded along the way.
    pub fn pop(&mut self, history: &mut PacketHistory) -> Option<SentPacket> {
        while let Some(number) = self.stack.pop() {
            match history.remove(number) {
                Some(packet) => return Some(packet),
                None => {
                    tracing::debug!("dropping packet {} from retransmission queue: already acked", number);
                }
            }
        }
        None
    }

    /// Number of queued entries, including stale ones
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    /// Check if the queue is empty
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}
