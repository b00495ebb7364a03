//! Wall-clock time budget.

use std::time::{Duration, Instant};

/// Time limit measured from the start of a solve.
///
/// Copies share the original start instant, so a worker forked from the
/// main search runs against the same deadline.
#[derive(Debug, Clone, Copy)]
pub struct TimeBudget {
    start: Instant,
    limit: Option<Duration>,
}

impl TimeBudget {
    pub fn new(limit: Option<Duration>) -> Self {
        Self {
            start: Instant::now(),
            limit,
        }
    }

    pub fn unlimited() -> Self {
        Self::new(None)
    }

    pub fn millis(ms: u64) -> Self {
        Self::new(Some(Duration::from_millis(ms)))
    }

    pub fn limit(&self) -> Option<Duration> {
        self.limit
    }

    /// Returns true while the budget is not exhausted.
    pub fn check_time(&self) -> bool {
        self.limit.map_or(true, |limit| self.start.elapsed() < limit)
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Default for TimeBudget {
    fn default() -> Self {
        Self::unlimited()
    }
}
