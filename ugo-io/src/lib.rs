//! UGO I/O and Platform Abstraction
//!
//! This crate provides the timing primitives shared by the UGO crates:
//! monotonic timestamps and the injectable clock used by the sender core.

pub mod time;

pub use time::{Clock, ManualClock, SystemClock, Timestamp};
