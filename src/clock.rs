//! Time sources for deterministic and real-time operation.
//!
//! The engine never reads the system clock directly; every timestamp comes
//! from an injected [`TimeSource`]. Under [`SimClock`] the same input
//! sequence always yields the same event stream.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Abstract nanosecond clock.
///
/// Implementations use interior mutability so a single `Arc<dyn TimeSource>`
/// can be shared by an engine, its book, and a multi-symbol dispatcher.
pub trait TimeSource: Send + Sync {
    /// Current time in nanoseconds.
    fn now_ns(&self) -> u64;
}

/// Manually advanced clock for tests and historical replay.
#[derive(Debug, Default)]
pub struct SimClock {
    current_ns: AtomicU64,
}

impl SimClock {
    /// Create a clock starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clock starting at `initial_ns`.
    pub fn starting_at(initial_ns: u64) -> Self {
        Self {
            current_ns: AtomicU64::new(initial_ns),
        }
    }

    /// Move the clock forward by `delta_ns`.
    pub fn advance(&self, delta_ns: u64) {
        self.current_ns.fetch_add(delta_ns, Ordering::Relaxed);
    }

    /// Set the clock to an absolute time.
    pub fn set(&self, ns: u64) {
        self.current_ns.store(ns, Ordering::Relaxed);
    }
}

impl TimeSource for SimClock {
    #[inline]
    fn now_ns(&self) -> u64 {
        self.current_ns.load(Ordering::Relaxed)
    }
}

/// Monotonic real clock: nanoseconds since construction.
#[derive(Debug)]
pub struct MonoClock {
    start: Instant,
}

impl MonoClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for MonoClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonoClock {
    #[inline]
    fn now_ns(&self) -> u64 {
        self.start.elapsed().as_nanos() as u64
    }
}
