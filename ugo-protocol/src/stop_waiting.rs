//! Stop-waiting boundary tracking
//!
//! The connection layer encodes this boundary into outgoing stop-waiting
//! signalling so the peer can forget about packets below it.

use crate::packet::PacketNumber;

/// Lowest packet number the peer must still consider outstanding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopWaitingManager {
    least_unacked: PacketNumber,
}

impl StopWaitingManager {
    /// Nothing resolved yet: the peer must still wait for packet 1
    pub fn new() -> Self {
        StopWaitingManager { least_unacked: 1 }
    }

    /// Update from the largest in-order resolved packet number
    ///
    /// Never moves the boundary backwards.
    pub(crate) fn set_boundary(&mut self, largest_in_order_acked: PacketNumber) {
        let least_unacked = largest_in_order_acked.saturating_add(1);
        if least_unacked > self.least_unacked {
            self.least_unacked = least_unacked;
        }
    }

    /// Current boundary
    pub fn least_unacked(&self) -> PacketNumber {
        self.least_unacked
    }
}

impl Default for StopWaitingManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_boundary() {
        assert_eq!(StopWaitingManager::new().least_unacked(), 1);
    }

    #[test]
    fn test_boundary_is_monotonic() {
        let mut manager = StopWaitingManager::new();

        manager.set_boundary(5);
        assert_eq!(manager.least_unacked(), 6);

        manager.set_boundary(3);
        assert_eq!(manager.least_unacked(), 6);
    }
}
