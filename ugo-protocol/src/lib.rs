//! UGO Sender Reliability Core
//!
//! This crate implements the sent-packet side of the UGO transport: packet
//! history and bytes-in-flight accounting, acknowledgment reconciliation,
//! NACK-count and timeout loss detection, the retransmission queue, the
//! stop-waiting boundary, RTT estimation, and the congestion-control adapter.

pub mod ack;
pub mod config;
pub mod congestion;
pub mod error;
pub mod handler;
pub mod history;
pub mod loss;
pub mod packet;
pub mod retransmission;
pub mod rtt;
pub mod stop_waiting;
pub mod tracker;

pub use ack::{AckFrame, AckOutcome, AckRange};
pub use config::HandlerConfig;
pub use congestion::{CongestionAdapter, CongestionStats, RenoSender, SendAlgorithm};
pub use error::HandlerError;
pub use handler::{HandlerStats, SentPacketHandler};
pub use history::PacketHistory;
pub use loss::LossDetector;
pub use packet::{Packet, PacketInfo, PacketNumber, PacketVector, SentPacket};
pub use retransmission::RetransmissionQueue;
pub use rtt::{RttEstimator, RttStats, SharedRttStats};
pub use stop_waiting::StopWaitingManager;
pub use tracker::SentPacketTracker;
