//! UGO - reliable packet-numbered transport
//!
//! High-level Rust API for the UGO sender reliability core.

pub use ugo_io as io;
pub use ugo_protocol as protocol;

// Re-export commonly used types
pub use protocol::{AckFrame, AckRange, HandlerConfig, HandlerError, Packet, SentPacketHandler};
