//! Time utilities for the UGO transport
//!
//! Provides the monotonic timestamp used for packet send times, RTT samples
//! and retransmission deadlines, plus the clock abstraction the sender core
//! reads time through.

use parking_lot::Mutex;
use std::ops::{Add, Sub};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic timestamp
///
/// Wraps `std::time::Instant`. Subtracting two timestamps saturates at zero
/// instead of panicking, so a send time that is "in the future" relative to a
/// synthetic clock yields an empty duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(Instant);

impl Timestamp {
    /// Get the current timestamp from the system monotonic clock
    #[inline]
    pub fn now() -> Self {
        Timestamp(Instant::now())
    }

    /// Create a timestamp from a base instant
    #[inline]
    pub fn from_instant(instant: Instant) -> Self {
        Timestamp(instant)
    }

    /// Get the underlying instant
    #[inline]
    pub fn as_instant(&self) -> Instant {
        self.0
    }

    /// Calculate duration since another timestamp, zero if `earlier` is later
    #[inline]
    pub fn duration_since(&self, earlier: Timestamp) -> Duration {
        self.0.saturating_duration_since(earlier.0)
    }

    /// Microseconds elapsed since a reference timestamp
    pub fn as_micros_since(&self, reference: Timestamp) -> u64 {
        self.duration_since(reference)
            .as_micros()
            .try_into()
            .unwrap_or(u64::MAX)
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, duration: Duration) -> Timestamp {
        Timestamp(self.0 + duration)
    }
}

impl Sub<Duration> for Timestamp {
    type Output = Timestamp;

    fn sub(self, duration: Duration) -> Timestamp {
        Timestamp(self.0 - duration)
    }
}

impl Sub for Timestamp {
    type Output = Duration;

    fn sub(self, other: Timestamp) -> Duration {
        self.duration_since(other)
    }
}

/// Source of the current time
///
/// The sender core never calls `Instant::now()` directly; it asks its clock.
/// Production code uses [`SystemClock`], tests and the simulator use
/// [`ManualClock`] to drive time explicitly.
pub trait Clock {
    /// Current time
    fn now(&self) -> Timestamp;
}

/// Clock backed by the system monotonic clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Manually advanced clock
///
/// Clones share the same underlying time, so a test can keep one handle and
/// give another to the component under test.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Timestamp>>,
}

impl ManualClock {
    /// Create a clock frozen at the current system time
    pub fn new() -> Self {
        Self::starting_at(Timestamp::now())
    }

    /// Create a clock frozen at `start`
    pub fn starting_at(start: Timestamp) -> Self {
        ManualClock {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Move time forward by `by`
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now = *now + by;
    }

    /// Set the time; moving backwards is ignored
    pub fn set(&self, to: Timestamp) {
        let mut now = self.now.lock();
        if to > *now {
            *now = to;
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}
