//! Configuration file support for the UGO simulator

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use ugo_protocol::HandlerConfig;

/// Simulated link configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LinkConfig {
    /// One-way delay in milliseconds
    pub delay_ms: u64,
    /// Probability that a data packet is dropped (0.0 to 1.0)
    pub loss_rate: f64,
    /// Probability that an ack frame is dropped (0.0 to 1.0)
    pub ack_loss_rate: f64,
    /// Receiver sends an ack after this many packets
    pub ack_every: u32,
    /// Longest the receiver holds an ack, in milliseconds
    pub ack_delay_ms: u64,
    /// RNG seed
    pub seed: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        LinkConfig {
            delay_ms: 25,
            loss_rate: 0.02,
            ack_loss_rate: 0.0,
            ack_every: 2,
            ack_delay_ms: 5,
            seed: 1,
        }
    }
}

/// Sender workload configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SenderConfig {
    /// Number of messages to deliver
    pub messages: u64,
    /// Payload size of each message
    pub payload_size: usize,
    /// Simulation step in milliseconds
    pub tick_ms: u64,
    /// Upper bound on simulated time, in seconds
    pub duration_secs: u64,
    /// Statistics interval in milliseconds of simulated time
    pub stats_interval_ms: u64,
}

impl Default for SenderConfig {
    fn default() -> Self {
        SenderConfig {
            messages: 10_000,
            payload_size: 1200,
            tick_ms: 1,
            duration_secs: 120,
            stats_interval_ms: 1000,
        }
    }
}

/// Handler tuning, mapped onto [`HandlerConfig`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HandlerSection {
    pub max_tracked_packets: usize,
    pub fast_retransmit_threshold: u32,
    pub min_retransmission_ms: u64,
    pub default_retransmission_ms: u64,
    pub max_segment_size: u32,
    pub initial_congestion_window: u32,
    pub max_congestion_window: u32,
}

impl Default for HandlerSection {
    fn default() -> Self {
        let defaults = HandlerConfig::default();
        HandlerSection {
            max_tracked_packets: defaults.max_tracked_packets,
            fast_retransmit_threshold: defaults.fast_retransmit_threshold,
            min_retransmission_ms: defaults.min_retransmission_time.as_millis() as u64,
            default_retransmission_ms: defaults.default_retransmission_time.as_millis() as u64,
            max_segment_size: defaults.max_segment_size,
            initial_congestion_window: defaults.initial_congestion_window,
            max_congestion_window: defaults.max_congestion_window,
        }
    }
}

impl HandlerSection {
    /// Build the handler configuration
    pub fn to_handler_config(&self) -> HandlerConfig {
        HandlerConfig {
            max_tracked_packets: self.max_tracked_packets,
            fast_retransmit_threshold: self.fast_retransmit_threshold,
            min_retransmission_time: Duration::from_millis(self.min_retransmission_ms),
            default_retransmission_time: Duration::from_millis(self.default_retransmission_ms),
            max_segment_size: self.max_segment_size,
            initial_congestion_window: self.initial_congestion_window,
            max_congestion_window: self.max_congestion_window,
        }
    }
}

/// Combined configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    /// Link model
    pub link: LinkConfig,
    /// Sender workload
    pub sender: SenderConfig,
    /// Handler tuning
    pub handler: HandlerSection,
}

impl SimConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: SimConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Example configuration: a lossy cellular-like link
    pub fn example() -> Self {
        SimConfig {
            link: LinkConfig {
                delay_ms: 40,
                loss_rate: 0.05,
                ack_loss_rate: 0.01,
                ack_every: 2,
                ack_delay_ms: 10,
                seed: 7,
            },
            sender: SenderConfig {
                messages: 20_000,
                ..SenderConfig::default()
            },
            handler: HandlerSection::default(),
        }
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, rate) in [
            ("link.loss_rate", self.link.loss_rate),
            ("link.ack_loss_rate", self.link.ack_loss_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be between 0.0 and 1.0, got {}",
                    name, rate
                )));
            }
        }
        if self.link.ack_every == 0 {
            return Err(ConfigError::Invalid("link.ack_every must be at least 1".into()));
        }
        if self.sender.payload_size < MESSAGE_HEADER_LEN {
            return Err(ConfigError::Invalid(format!(
                "sender.payload_size must be at least {} bytes",
                MESSAGE_HEADER_LEN
            )));
        }
        if self.sender.tick_ms == 0 {
            return Err(ConfigError::Invalid("sender.tick_ms must be at least 1".into()));
        }
        if self.handler.max_segment_size == 0 {
            return Err(ConfigError::Invalid(
                "handler.max_segment_size must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Bytes of each payload taken by the message id
pub const MESSAGE_HEADER_LEN: usize = 8;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl LinkConfig {
    /// One-way delay as Duration
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Ack hold time as Duration
    pub fn ack_delay(&self) -> Duration {
        Duration::from_millis(self.ack_delay_ms)
    }
}

impl SenderConfig {
    /// Simulation step as Duration
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    /// Simulated time limit as Duration
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }

    /// Statistics interval as Duration
    pub fn stats_interval(&self) -> Duration {
        Duration::from_millis(self.stats_interval_ms)
    }
}
