//! Scan deduplication
//!
//! A camera sees the same card for many consecutive frames. The deduplicator
//! accepts a value when it differs from the last accepted one, or when the
//! window has elapsed since that value was accepted.

use std::time::{Duration, Instant};

pub const DEFAULT_DEDUP_WINDOW: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone)]
pub struct ScanDeduplicator {
    window: Duration,
    last: Option<(String, Instant)>,
}

impl Default for ScanDeduplicator {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUP_WINDOW)
    }
}

impl ScanDeduplicator {
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Decide whether `value` seen at `now` should be processed; accepting
    /// records it as the last accepted value
    pub fn should_accept(&mut self, value: &str, now: Instant) -> bool {
        let accept = match &self.last {
            Some((last, at)) if last == value => now.saturating_duration_since(*at) >= self.window,
            _ => true,
        };

        if accept {
            self.last = Some((value.to_string(), now));
        }
        accept
    }

    /// Forget the last accepted value
    pub fn reset(&mut self) {
        self.last = None;
    }
}
