//! Bound improvement telemetry.
//!
//! A [`BoundTracker`](crate::tracker::BoundTracker) with an attached sender
//! emits one [`BoundEvent`] per strict improvement of either bound.

use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundEventKind {
    LowerBoundImproved,
    UpperBoundImproved,
}

impl BoundEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BoundEventKind::LowerBoundImproved => "lower_bound_improved",
            BoundEventKind::UpperBoundImproved => "upper_bound_improved",
        }
    }
}

impl fmt::Display for BoundEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bound moved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundEvent {
    pub kind: BoundEventKind,
    /// The new bound, in absolute profit.
    pub value: i64,
    /// Time since the tracker was created.
    pub elapsed: Duration,
    /// Which component produced the bound.
    pub reason: &'static str,
}

pub type EventSender = mpsc::UnboundedSender<BoundEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<BoundEvent>;

/// Creates an unbounded event channel for [`solve_with_events`](crate::solve_with_events).
pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
