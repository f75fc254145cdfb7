//! Integer-tick price representation.
//!
//! Prices are stored as a signed count of ticks. All comparison and hashing
//! go through the integer tick, never the real value, so floating-point
//! rounding can never split a price level in two.

use serde::{Deserialize, Serialize};

/// A price expressed as a whole number of ticks.
///
/// Ordering, equality, and hashing are all derived from the tick count.
/// Conversion to and from a real price uses a caller-supplied tick size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TickPrice(i64);

impl TickPrice {
    /// Sentinel for "no price" (e.g. an empty book side).
    pub const INVALID: TickPrice = TickPrice(-1);

    /// Construct from a raw tick count.
    #[inline]
    pub const fn new(ticks: i64) -> Self {
        Self(ticks)
    }

    /// Raw tick count.
    #[inline]
    pub const fn ticks(self) -> i64 {
        self.0
    }

    /// Whether this is a real price rather than the absence sentinel.
    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != Self::INVALID.0
    }

    /// Convert a real price to ticks, rounding to the nearest tick
    /// (ties away from zero).
    #[inline]
    pub fn from_f64(price: f64, tick_size: f64) -> Self {
        Self((price / tick_size).round() as i64)
    }

    /// Convert back to a real price.
    #[inline]
    pub fn to_f64(self, tick_size: f64) -> f64 {
        self.0 as f64 * tick_size
    }
}

impl std::fmt::Display for TickPrice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
