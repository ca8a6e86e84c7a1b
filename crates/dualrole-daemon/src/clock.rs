//! Monotonic time source for hold-duration measurement

use std::time::Instant;

/// Source of monotonic timestamps.
///
/// The disambiguator only ever compares two readings of the same clock, so any
/// monotonic source works. Tests substitute a manually advanced clock.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// The system monotonic clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
