//! Randomized pause between two crawls.

use rand::{Rng, rng};
use std::time::Duration;

/// Uniformly random delay in `[min, max]`.
///
/// This is the only throttle on outbound requests: the worker takes it
/// after every resource, so the crawl rate never exceeds one subreddit per
/// `min`, and the jitter keeps the cadence irregular.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    min: Duration,
    max: Duration,
}

impl Throttle {
    /// `max` below `min` is clamped to `min`.
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max: max.max(min),
        }
    }

    /// No pause at all.
    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub fn next_delay(&self) -> Duration {
        let spread = (self.max - self.min).as_millis() as u64;
        if spread == 0 {
            return self.min;
        }
        self.min + Duration::from_millis(rng().random_range(0..=spread))
    }
}
