//! Fixed-width time buckets since the Unix Epoch.
//!
//! The UDP frontend derives connection IDs from the bucket the current time
//! falls into, so that a token stays verifiable for the current and the
//! previous bucket without the server storing anything per client.
use std::time::Duration;

use crate::clock::Time;

/// A point in time expressed as the number of whole `increment`-sized buckets
/// elapsed since the Unix Epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeExtent {
    /// Width of one bucket.
    pub increment: Duration,
    /// Number of whole buckets since the Unix Epoch.
    pub amount: u64,
}

impl TimeExtent {
    #[must_use]
    pub const fn new(increment: Duration, amount: u64) -> Self {
        Self { increment, amount }
    }

    /// Returns the extent `delta` buckets earlier, or `None` on underflow.
    #[must_use]
    pub fn decrease(&self, delta: u64) -> Option<Self> {
        self.amount.checked_sub(delta).map(|amount| Self {
            increment: self.increment,
            amount,
        })
    }
}

/// Builds the [`TimeExtent`] the clock `C` currently falls into.
///
/// # Panics
///
/// Panics if `increment` is zero.
#[must_use]
pub fn make_time_extent<C: Time>(increment: Duration) -> TimeExtent {
    assert!(!increment.is_zero(), "a time extent increment must not be zero");
    TimeExtent {
        increment,
        amount: C::now().as_secs() / increment.as_secs(),
    }
}
