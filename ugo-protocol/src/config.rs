//! Sent packet handler configuration

use std::time::Duration;

/// Default maximum packet size in bytes
pub const DEFAULT_MAX_SEGMENT_SIZE: u32 = 1350;

/// Tunables for the sent packet handler and its default congestion controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerConfig {
    /// Upper bound on history plus retransmission queue entries
    pub max_tracked_packets: usize,
    /// A packet is queued for retransmission once its missing reports exceed this
    pub fast_retransmit_threshold: u32,
    /// Floor for the retransmission timeout
    pub min_retransmission_time: Duration,
    /// Retransmission timeout used while the controller has no estimate
    pub default_retransmission_time: Duration,
    /// Maximum packet size (bytes)
    pub max_segment_size: u32,
    /// Initial congestion window (packets)
    pub initial_congestion_window: u32,
    /// Maximum congestion window (packets)
    pub max_congestion_window: u32,
}

impl HandlerConfig {
    /// Initial congestion window in bytes
    pub fn initial_window_bytes(&self) -> u32 {
        self.initial_congestion_window
            .saturating_mul(self.max_segment_size)
    }

    /// Maximum congestion window in bytes
    pub fn max_window_bytes(&self) -> u32 {
        self.max_congestion_window.saturating_mul(self.max_segment_size)
    }
}

impl Default for HandlerConfig {
    fn default() -> Self {
        HandlerConfig {
            max_tracked_packets: 2000,
            fast_retransmit_threshold: 3,
            min_retransmission_time: Duration::from_millis(200),
            default_retransmission_time: Duration::from_millis(500),
            max_segment_size: DEFAULT_MAX_SEGMENT_SIZE,
            initial_congestion_window: 32,
            max_congestion_window: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_window_sizes() {
        let config = HandlerConfig::default();

        assert_eq!(config.initial_window_bytes(), 32 * 1350);
        assert_eq!(config.max_window_bytes(), 1000 * 1350);
    }

    #[test]
    fn test_window_sizes_saturate() {
        let config = HandlerConfig {
            max_congestion_window: u32::MAX,
            ..HandlerConfig::default()
        };

        assert_eq!(config.max_window_bytes(), u32::MAX);
    }
}
