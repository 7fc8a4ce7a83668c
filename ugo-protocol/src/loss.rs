//! Loss detection
//!
//! Two independent policies decide that a sent packet is lost, both ending in
//! the packet being queued for retransmission:
//!
//! - NACK counting: every acknowledgment that passes over a packet counts as a
//!   missing report; once the count exceeds the threshold the packet is
//!   fast-retransmitted.
//! - Retransmission timeout: when nothing has been sent for longer than the
//!   retransmission delay, the oldest outstanding packet is declared lost.

use crate::config::HandlerConfig;
use crate::congestion::{CongestionAdapter, SendAlgorithm};
use crate::packet::{PacketInfo, PacketNumber};
use crate::rtt::RttEstimator;
use crate::tracker::SentPacketTracker;
use std::time::Duration;
use ugo_io::Timestamp;

/// Loss detector
#[derive(Debug, Clone)]
pub struct LossDetector {
    /// Missing reports a packet may accumulate before it is retransmitted
    fast_retransmit_threshold: u32,
    /// Floor for the retransmission timeout
    min_retransmission_time: Duration,
    /// Timeout used while the controller has no estimate
    default_retransmission_time: Duration,
    /// Packets queued by NACK counting
    fast_retransmits: u64,
    /// Packets queued by the retransmission timeout
    timeout_retransmits: u64,
}

impl LossDetector {
    /// Create a loss detector from the handler configuration
    pub fn new(config: &HandlerConfig) -> Self {
        LossDetector {
            fast_retransmit_threshold: config.fast_retransmit_threshold,
            min_retransmission_time: config.min_retransmission_time,
            default_retransmission_time: config.default_retransmission_time,
            fast_retransmits: 0,
            timeout_retransmits: 0,
        }
    }

    /// Count a missing report against a packet
    ///
    /// Returns the packet if this report pushed it over the threshold and it
    /// was queued for retransmission. Unknown (already resolved) and already
    /// queued packets are left alone.
    pub fn nack(
        &mut self,
        tracker: &mut SentPacketTracker,
        number: PacketNumber,
    ) -> Option<PacketInfo> {
        let packet = tracker.history.get_mut(number)?;
        if packet.retransmitted {
            return None;
        }

        packet.missing_reports += 1;
        if packet.missing_reports <= self.fast_retransmit_threshold {
            return None;
        }

        tracing::debug!(
            "fast retransmission of packet {}, missing count {}",
            number,
            packet.missing_reports
        );
        let info = tracker.queue_for_retransmission(number)?;
        self.fast_retransmits += 1;
        Some(info)
    }

    /// Effective retransmission timeout for a raw controller delay
    pub fn retransmission_timeout(&self, controller_delay: Duration) -> Duration {
        let rto = if controller_delay.is_zero() {
            self.default_retransmission_time
        } else {
            controller_delay
        };
        rto.max(self.min_retransmission_time)
    }

    /// Time at which the retransmission timer fires, `None` before the first send
    pub fn deadline(
        &self,
        tracker: &SentPacketTracker,
        controller_delay: Duration,
    ) -> Option<Timestamp> {
        tracker
            .last_sent_packet_time
            .map(|sent| sent + self.retransmission_timeout(controller_delay))
    }

    /// Run the retransmission timer check
    ///
    /// If the deadline has passed, the lowest outstanding packet is reported
    /// lost, the controller is told about the timeout and the packet is
    /// queued. At most one packet is queued per call.
    pub fn on_retransmission_poll<C: SendAlgorithm, R: RttEstimator>(
        &mut self,
        tracker: &mut SentPacketTracker,
        congestion: &mut CongestionAdapter<C, R>,
        now: Timestamp,
    ) -> Option<PacketInfo> {
        let deadline = self.deadline(tracker, congestion.retransmission_delay())?;
        if now < deadline {
            return None;
        }

        let first = tracker.largest_in_order_acked.saturating_add(1);
        let packet = (first..=tracker.last_sent_packet_number).find_map(|number| {
            tracker
                .history
                .get(number)
                .filter(|packet| !packet.retransmitted)
                .map(|packet| packet.info())
        })?;

        congestion.on_congestion_event(
            false,
            tracker.history.bytes_in_flight(),
            &[],
            &[packet],
        );
        congestion.on_retransmission_timeout();

        tracing::debug!(
            "timeout retransmission of packet {}, deadline passed by {:?}",
            packet.number,
            now - deadline
        );
        tracker.queue_for_retransmission(packet.number)?;
        self.timeout_retransmits += 1;
        Some(packet)
    }

    /// Packets queued by NACK counting
    pub fn fast_retransmits(&self) -> u64 {
        self.fast_retransmits
    }

    /// Packets queued by the retransmission timeout
    pub fn timeout_retransmits(&self) -> u64 {
        self.timeout_retransmits
    }
}
