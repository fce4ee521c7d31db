//! Clock used for the duplicate-scan window
//!
//! The flow only needs a monotonic "now"; tests swap in a clock they can
//! move forward by hand instead of sleeping past the window.

use std::time::Instant;

pub trait TimeProvider: Send + Sync {
    fn now(&self) -> Instant;
}

/// Real monotonic clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[cfg(test)]
pub use self::manual::MockTimeProvider;
