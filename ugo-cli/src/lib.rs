//! UGO CLI Library
//!
//! Shared functionality for the UGO simulator: configuration, the receiver
//! model, the simulation loop and statistics display.

pub mod config;
pub mod receiver;
pub mod sim;
pub mod stats;

pub use config::{ConfigError, HandlerSection, LinkConfig, SenderConfig, SimConfig};
pub use receiver::{Receiver, ReceiverStats};
pub use sim::{LinkStats, SimReport, Simulation};
pub use stats::{display_compact_stats, display_summary, format_bandwidth, format_bytes};
