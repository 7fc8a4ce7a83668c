//! Sent Packet Handler
//!
//! The operations the connection layer calls: record every transmitted packet,
//! feed every received acknowledgment, poll for packets to retransmit, and ask
//! whether congestion control allows sending.
//!
//! All operations are synchronous and expected to be called serially by the
//! task that owns the connection.

use crate::ack::{self, AckFrame};
use crate::config::HandlerConfig;
use crate::congestion::{CongestionAdapter, RenoSender, SendAlgorithm};
use crate::error::HandlerError;
use crate::loss::LossDetector;
use crate::packet::{Packet, PacketNumber, SentPacket};
use crate::rtt::{RttEstimator, RttStats, SharedRttStats};
use crate::tracker::SentPacketTracker;
use std::time::Duration;
use ugo_io::{Clock, SystemClock, Timestamp};

/// Sent packet handler statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerStats {
    /// Total bytes recorded as sent
    pub total_sent: u64,
    /// Total bytes acknowledged
    pub total_acked: u64,
    /// Bytes currently in flight
    pub bytes_in_flight: u32,
    /// Packets in the history
    pub tracked_packets: usize,
    /// Entries in the retransmission queue
    pub queued_retransmissions: usize,
    /// Packets queued by NACK counting
    pub fast_retransmits: u64,
    /// Packets queued by the retransmission timeout
    pub timeout_retransmits: u64,
    /// Largest acknowledged packet number
    pub largest_acked: PacketNumber,
    /// Largest in-order resolved packet number
    pub largest_in_order_acked: PacketNumber,
    /// Smoothed RTT
    pub smoothed_rtt: Duration,
    /// Congestion window (bytes)
    pub congestion_window: u32,
}

/// Sent packet handler
///
/// Composes the packet state, loss detection, ack processing and the
/// congestion adapter. The default type parameters give the production stack:
/// a Reno controller sharing RTT statistics with the handler, on the system
/// clock.
pub struct SentPacketHandler<C = RenoSender, R = SharedRttStats, K = SystemClock> {
    config: HandlerConfig,
    tracker: SentPacketTracker,
    loss: LossDetector,
    congestion: CongestionAdapter<C, R>,
    clock: K,
}

impl SentPacketHandler {
    /// Create a handler with the default configuration
    pub fn new() -> Self {
        Self::with_config(HandlerConfig::default())
    }

    /// Create a handler with a custom configuration
    pub fn with_config(config: HandlerConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl Default for SentPacketHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clock> SentPacketHandler<RenoSender, SharedRttStats, K> {
    /// Create a handler with the default congestion stack on a custom clock
    pub fn with_clock(config: HandlerConfig, clock: K) -> Self {
        let rtt = RttStats::shared();
        let controller = RenoSender::new(rtt.clone(), &config);
        Self::with_parts(config, controller, rtt, clock)
    }
}

impl<C: SendAlgorithm, R: RttEstimator, K: Clock> SentPacketHandler<C, R, K> {
    /// Create a handler from its collaborators
    pub fn with_parts(config: HandlerConfig, controller: C, rtt: R, clock: K) -> Self {
        SentPacketHandler {
            config,
            tracker: SentPacketTracker::new(),
            loss: LossDetector::new(&config),
            congestion: CongestionAdapter::new(controller, rtt),
            clock,
        }
    }

    /// Record a packet handed to the network
    pub fn sent(&mut self, packet: Packet) -> Result<(), HandlerError> {
        let now = self.clock.now();

        if let Some(info) = self.tracker.record_sent(packet, now)? {
            self.congestion
                .on_packet_sent(now, self.tracker.history.bytes_in_flight(), info);
        }
        Ok(())
    }

    /// Process a received acknowledgment frame
    ///
    /// `ack_sequence` identifies the frame instance (for example the number of
    /// the packet that carried it); zero disables duplicate detection.
    pub fn received_ack(
        &mut self,
        frame: &AckFrame,
        ack_sequence: u32,
    ) -> Result<(), HandlerError> {
        let now = self.clock.now();
        ack::process_ack(
            &mut self.tracker,
            &mut self.loss,
            &mut self.congestion,
            frame,
            ack_sequence,
            now,
        )?;
        Ok(())
    }

    /// Run the retransmission timer and report whether anything is queued
    ///
    /// Can return true for a queued packet that was since acknowledged
    /// belatedly; `dequeue_for_retransmission` then returns `None`.
    pub fn probably_has_packet_for_retransmission(&mut self) -> bool {
        let now = self.clock.now();
        self.loss
            .on_retransmission_poll(&mut self.tracker, &mut self.congestion, now);

        !self.tracker.queue.is_empty()
    }

    /// Next packet to resend, most recently queued first
    pub fn dequeue_for_retransmission(&mut self) -> Option<SentPacket> {
        if !self.probably_has_packet_for_retransmission() {
            return None;
        }
        self.tracker.dequeue_for_retransmission()
    }

    /// Bytes currently in flight
    pub fn bytes_in_flight(&self) -> u32 {
        self.tracker.history.bytes_in_flight()
    }

    /// Largest packet number the peer acknowledged
    pub fn largest_acked(&self) -> PacketNumber {
        self.tracker.largest_acked()
    }

    /// Every packet up to this number is acked or retransmitted
    pub fn largest_in_order_acked(&self) -> PacketNumber {
        self.tracker.largest_in_order_acked()
    }

    /// Number of the most recently sent packet
    pub fn last_sent_packet_number(&self) -> PacketNumber {
        self.tracker.last_sent_packet_number()
    }

    /// Lowest packet number the peer should still consider outstanding
    pub fn stop_waiting_boundary(&self) -> PacketNumber {
        self.tracker.stop_waiting_boundary()
    }

    /// Whether the congestion window has room
    pub fn congestion_allows_sending(&self) -> bool {
        self.congestion.allows_sending(self.bytes_in_flight())
    }

    /// Congestion window in bytes
    pub fn congestion_window(&self) -> u32 {
        self.congestion.congestion_window()
    }

    /// Smoothed RTT
    pub fn smoothed_rtt(&self) -> Duration {
        self.congestion.smoothed_rtt()
    }

    /// Current retransmission timer deadline, `None` before the first send
    pub fn time_of_first_rto(&self) -> Option<Timestamp> {
        self.loss
            .deadline(&self.tracker, self.congestion.retransmission_delay())
    }

    /// Health check against unbounded growth of tracked packets
    pub fn check_for_error(&self) -> Result<(), HandlerError> {
        let tracked = self.tracker.tracked_len();
        if tracked > self.config.max_tracked_packets {
            tracing::warn!(
                "retransmission queue size: {}, history size: {}",
                self.tracker.queued_retransmissions(),
                self.tracker.history.len()
            );
            return Err(HandlerError::TooManyTrackedPackets(tracked));
        }
        Ok(())
    }

    /// Handler statistics
    pub fn stats(&self) -> HandlerStats {
        let history = self.tracker.history();
        HandlerStats {
            total_sent: history.total_sent(),
            total_acked: history.total_acked(),
            bytes_in_flight: history.bytes_in_flight(),
            tracked_packets: history.len(),
            queued_retransmissions: self.tracker.queued_retransmissions(),
            fast_retransmits: self.loss.fast_retransmits(),
            timeout_retransmits: self.loss.timeout_retransmits(),
            largest_acked: self.tracker.largest_acked(),
            largest_in_order_acked: self.tracker.largest_in_order_acked(),
            smoothed_rtt: self.congestion.smoothed_rtt(),
            congestion_window: self.congestion.congestion_window(),
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    /// Congestion adapter
    pub fn congestion(&self) -> &CongestionAdapter<C, R> {
        &self.congestion
    }
}
