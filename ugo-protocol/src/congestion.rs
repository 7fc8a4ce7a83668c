//! Congestion Control
//!
//! The sender core talks to congestion control only through
//! [`CongestionAdapter`], which wraps any [`SendAlgorithm`] together with the
//! RTT estimator. [`RenoSender`] is the default window-based algorithm.

use crate::config::HandlerConfig;
use crate::packet::{PacketInfo, PacketNumber};
use crate::rtt::{RttEstimator, SharedRttStats};
use std::time::Duration;
use ugo_io::Timestamp;

/// Congestion control algorithm, sender side
pub trait SendAlgorithm {
    /// A packet entered flight accounting
    fn on_packet_sent(
        &mut self,
        sent_time: Timestamp,
        bytes_in_flight: u32,
        number: PacketNumber,
        length: u32,
        retransmittable: bool,
    );

    /// Outcome of one acknowledgment or loss-detection round
    fn on_congestion_event(
        &mut self,
        rtt_updated: bool,
        bytes_in_flight: u32,
        acked: &[PacketInfo],
        lost: &[PacketInfo],
    );

    /// The retransmission timer fired
    fn on_retransmission_timeout(&mut self, packets_retransmitted: bool);

    /// Current retransmission delay, zero if unknown
    fn retransmission_delay(&self) -> Duration;

    /// Congestion window in bytes
    fn congestion_window(&self) -> u32;
}

/// Congestion control statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CongestionStats {
    /// Current congestion window (bytes)
    pub congestion_window: u32,
    /// Slow start threshold (bytes)
    pub ssthresh: u32,
    /// Whether in slow start phase
    pub slow_start: bool,
    /// Number of window reductions caused by loss
    pub loss_reductions: u32,
    /// Number of retransmission timeouts
    pub timeouts: u32,
}

/// Window-based Reno congestion controller
///
/// Slow start until `ssthresh`, then one segment of growth per window of
/// acknowledged bytes. Loss halves the window once per recovery epoch;
/// a retransmission timeout collapses it to the minimum.
#[derive(Debug, Clone)]
pub struct RenoSender {
    /// Congestion window (bytes)
    congestion_window: u32,
    /// Slow start threshold (bytes)
    ssthresh: u32,
    /// Smallest window after a reduction (bytes)
    min_window: u32,
    /// Upper bound for the window (bytes)
    max_window: u32,
    /// Maximum packet size (bytes)
    max_segment_size: u32,
    /// Acked bytes not yet turned into window growth in congestion avoidance
    ack_credit: u32,
    /// Largest packet number handed to `on_packet_sent`
    largest_sent: PacketNumber,
    /// Losses of packets at or below this number belong to the current epoch
    end_of_recovery: PacketNumber,
    /// Number of loss-triggered reductions
    loss_reductions: u32,
    /// Number of retransmission timeouts
    timeouts: u32,
    /// Shared RTT estimate
    rtt: SharedRttStats,
}

impl RenoSender {
    /// Create a new controller
    ///
    /// # Arguments
    /// * `rtt` - RTT statistics shared with the sent packet handler
    /// * `config` - window sizes and segment size
    pub fn new(rtt: SharedRttStats, config: &HandlerConfig) -> Self {
        let max_segment_size = config.max_segment_size.max(1);
        let min_window = max_segment_size.saturating_mul(2);
        let max_window = config.max_window_bytes().max(min_window);

        RenoSender {
            congestion_window: config.initial_window_bytes().clamp(min_window, max_window),
            ssthresh: max_window,
            min_window,
            max_window,
            max_segment_size,
            ack_credit: 0,
            largest_sent: 0,
            end_of_recovery: 0,
            loss_reductions: 0,
            timeouts: 0,
            rtt,
        }
    }

    /// Check if in slow start
    pub fn in_slow_start(&self) -> bool {
        self.congestion_window < self.ssthresh
    }

    /// Check if in a recovery epoch
    pub fn in_recovery(&self) -> bool {
        self.end_of_recovery > 0 && self.largest_sent <= self.end_of_recovery
    }

    /// Get statistics
    pub fn stats(&self) -> CongestionStats {
        CongestionStats {
            congestion_window: self.congestion_window,
            ssthresh: self.ssthresh,
            slow_start: self.in_slow_start(),
            loss_reductions: self.loss_reductions,
            timeouts: self.timeouts,
        }
    }

    fn on_packet_acked(&mut self, packet: &PacketInfo) {
        // No growth for packets sent before the last reduction
        if packet.number <= self.end_of_recovery {
            return;
        }

        if self.in_slow_start() {
            self.congestion_window = self.congestion_window.saturating_add(packet.length);
        } else {
            self.ack_credit = self.ack_credit.saturating_add(packet.length);
            while self.ack_credit >= self.congestion_window {
                self.ack_credit -= self.congestion_window;
                self.congestion_window = self
                    .congestion_window
                    .saturating_add(self.max_segment_size);
            }
        }

        self.congestion_window = self.congestion_window.min(self.max_window);
    }

    fn on_packet_lost(&mut self, packet: &PacketInfo) {
        if packet.number <= self.end_of_recovery {
            return;
        }

        // Multiplicative decrease
        self.ssthresh = (self.congestion_window / 2).max(self.min_window);
        self.congestion_window = self.ssthresh;
        self.ack_credit = 0;
        self.end_of_recovery = self.largest_sent;
        self.loss_reductions += 1;

        tracing::debug!(
            "loss of packet {} reduced congestion window to {} bytes",
            packet.number,
            self.congestion_window
        );
    }
}

impl SendAlgorithm for RenoSender {
    fn on_packet_sent(
        &mut self,
        _sent_time: Timestamp,
        _bytes_in_flight: u32,
        number: PacketNumber,
        _length: u32,
        _retransmittable: bool,
    ) {
        self.largest_sent = self.largest_sent.max(number);
    }

    fn on_congestion_event(
        &mut self,
        _rtt_updated: bool,
        _bytes_in_flight: u32,
        acked: &[PacketInfo],
        lost: &[PacketInfo],
    ) {
        for packet in lost {
            self.on_packet_lost(packet);
        }
        for packet in acked {
            self.on_packet_acked(packet);
        }
    }

    fn on_retransmission_timeout(&mut self, packets_retransmitted: bool) {
        if !packets_retransmitted {
            return;
        }

        self.ssthresh = (self.congestion_window / 2).max(self.min_window);
        self.congestion_window = self.min_window;
        self.ack_credit = 0;
        self.end_of_recovery = self.largest_sent;
        self.timeouts += 1;
    }

    fn retransmission_delay(&self) -> Duration {
        let rtt = self.rtt.read();
        let smoothed = rtt.smoothed_rtt();
        if smoothed.is_zero() {
            return Duration::ZERO;
        }
        smoothed + rtt.mean_deviation() * 4
    }

    fn congestion_window(&self) -> u32 {
        self.congestion_window
    }
}

/// The single point through which the sender core reaches congestion control
/// and RTT estimation
#[derive(Debug)]
pub struct CongestionAdapter<C, R> {
    controller: C,
    rtt: R,
}

impl<C: SendAlgorithm, R: RttEstimator> CongestionAdapter<C, R> {
    /// Wrap a controller and an RTT estimator
    pub fn new(controller: C, rtt: R) -> Self {
        CongestionAdapter { controller, rtt }
    }

    /// Report a packet that entered flight accounting
    pub fn on_packet_sent(&mut self, now: Timestamp, bytes_in_flight: u32, packet: PacketInfo) {
        self.controller
            .on_packet_sent(now, bytes_in_flight, packet.number, packet.length, true);
    }

    /// Feed an RTT sample
    pub fn update_rtt(&mut self, sample: Duration, peer_delay: Duration, now: Timestamp) {
        self.rtt.update(sample, peer_delay, now);
    }

    /// Report the acked and lost sets of one round
    pub fn on_congestion_event(
        &mut self,
        rtt_updated: bool,
        bytes_in_flight: u32,
        acked: &[PacketInfo],
        lost: &[PacketInfo],
    ) {
        self.controller
            .on_congestion_event(rtt_updated, bytes_in_flight, acked, lost);
    }

    /// Report that the retransmission timer fired and queued a packet
    pub fn on_retransmission_timeout(&mut self) {
        self.controller.on_retransmission_timeout(true);
    }

    /// Raw retransmission delay from the controller, zero if unknown
    pub fn retransmission_delay(&self) -> Duration {
        self.controller.retransmission_delay()
    }

    /// Congestion window in bytes
    pub fn congestion_window(&self) -> u32 {
        self.controller.congestion_window()
    }

    /// Whether another packet may be sent with `bytes_in_flight` outstanding
    pub fn allows_sending(&self, bytes_in_flight: u32) -> bool {
        bytes_in_flight <= self.controller.congestion_window()
    }

    /// Smoothed RTT
    pub fn smoothed_rtt(&self) -> Duration {
        self.rtt.smoothed_rtt()
    }

    /// Wrapped controller
    pub fn controller(&self) -> &C {
        &self.controller
    }

    /// Wrapped RTT estimator
    pub fn rtt(&self) -> &R {
        &self.rtt
    }
}
