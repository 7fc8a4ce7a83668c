//! RTT (Round-Trip Time) estimation
//!
//! Tracks RTT measurements and calculates smoothed RTT and mean deviation.
//! The estimate is shared between the sent packet handler, which feeds it
//! samples, and the congestion controller, which derives the retransmission
//! delay from it.

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use ugo_io::Timestamp;

/// Smoothing factor for SRTT
const RTT_ALPHA: f64 = 0.125;
/// Smoothing factor for mean deviation
const RTT_BETA: f64 = 0.25;

/// RTT estimator collaborator
pub trait RttEstimator {
    /// Feed a new sample
    ///
    /// `peer_delay` is the time the peer reports having held the ack before
    /// sending it.
    fn update(&mut self, sample: Duration, peer_delay: Duration, now: Timestamp);

    /// Smoothed RTT, zero before the first sample
    fn smoothed_rtt(&self) -> Duration;
}

/// RTT statistics
#[derive(Debug, Clone, Default)]
pub struct RttStats {
    /// Most recent (delay-adjusted) sample
    latest_rtt: Duration,
    /// Smallest raw sample seen
    min_rtt: Duration,
    /// Smoothed RTT
    smoothed_rtt: Duration,
    /// Mean deviation of the samples
    mean_deviation: Duration,
    /// Number of samples
    sample_count: u32,
    /// Time of the last update
    last_update: Option<Timestamp>,
}

/// RTT statistics shared between the handler and the congestion controller
pub type SharedRttStats = Arc<RwLock<RttStats>>;

impl RttStats {
    /// Create empty statistics
    pub fn new() -> Self {
        Self::default()
    }

    /// Create empty statistics behind a shared handle
    pub fn shared() -> SharedRttStats {
        Arc::new(RwLock::new(Self::new()))
    }

    pub fn latest_rtt(&self) -> Duration {
        self.latest_rtt
    }

    pub fn min_rtt(&self) -> Duration {
        self.min_rtt
    }

    pub fn mean_deviation(&self) -> Duration {
        self.mean_deviation
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn last_update(&self) -> Option<Timestamp> {
        self.last_update
    }
}

impl RttEstimator for RttStats {
    fn update(&mut self, sample: Duration, peer_delay: Duration, now: Timestamp) {
        if sample.is_zero() {
            return;
        }

        // min_rtt ignores the peer delay: it is the lower bound the delay
        // adjustment must not cross
        if self.min_rtt.is_zero() || sample < self.min_rtt {
            self.min_rtt = sample;
        }

        let mut adjusted = sample;
        if let Some(without_delay) = sample.checked_sub(peer_delay) {
            if without_delay > self.min_rtt {
                adjusted = without_delay;
            }
        }
        self.latest_rtt = adjusted;

        if self.sample_count == 0 {
            self.smoothed_rtt = adjusted;
            self.mean_deviation = adjusted / 2;
        } else {
            let error = if self.smoothed_rtt > adjusted {
                self.smoothed_rtt - adjusted
            } else {
                adjusted - self.smoothed_rtt
            };
            self.mean_deviation =
                self.mean_deviation.mul_f64(1.0 - RTT_BETA) + error.mul_f64(RTT_BETA);
            self.smoothed_rtt =
                self.smoothed_rtt.mul_f64(1.0 - RTT_ALPHA) + adjusted.mul_f64(RTT_ALPHA);
        }

        self.sample_count = self.sample_count.saturating_add(1);
        self.last_update = Some(now);
    }

    fn smoothed_rtt(&self) -> Duration {
        self.smoothed_rtt
    }
}

impl<R: RttEstimator> RttEstimator for Arc<RwLock<R>> {
    fn update(&mut self, sample: Duration, peer_delay: Duration, now: Timestamp) {
        self.write().update(sample, peer_delay, now);
    }

    fn smoothed_rtt(&self) -> Duration {
        self.read().smoothed_rtt()
    }
}
