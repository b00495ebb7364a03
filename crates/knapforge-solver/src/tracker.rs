//! Shared lower and upper bounds.
//!
//! The tracker is the only state shared between the main search and the
//! surrogate worker. Bounds are monotone: the lower bound never decreases,
//! the upper bound never increases, and a solution is only ever replaced by
//! a strictly more profitable one.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use fixedbitset::FixedBitSet;
use tracing::debug;

use crate::event::{BoundEvent, BoundEventKind, EventSender};
use crate::termination::CancellationToken;

const UNKNOWN_UPPER: i64 = i64::MAX;

#[derive(Debug)]
struct Record {
    lower: i64,
    upper: i64,
    floor: i64,
    solution: Option<FixedBitSet>,
    solution_profit: i64,
    events: Option<EventSender>,
    on_proof: Option<CancellationToken>,
}

#[derive(Debug)]
struct Parent {
    tracker: BoundTracker,
    offset: i64,
}

#[derive(Debug)]
struct Shared {
    lower: AtomicI64,
    upper: AtomicI64,
    record: Mutex<Record>,
    parent: Option<Parent>,
    created: Instant,
}

/// Lower and upper bounds for one (sub-)problem, with the best known
/// solution.
///
/// Reads go through atomics; writes take the record lock. A child tracker
/// created with [`child`](Self::child) sees its parent's lower bound
/// (shifted by the offset) and forwards its own upper bound improvements
/// upward.
///
/// # Example
///
/// ```
/// use fixedbitset::FixedBitSet;
/// use knapforge_solver::tracker::BoundTracker;
///
/// let tracker = BoundTracker::new(3);
/// assert_eq!(tracker.lower_bound(), 0);
///
/// let mut solution = FixedBitSet::with_capacity(3);
/// solution.insert(1);
/// assert!(tracker.offer_lower(7, Some(solution), "example"));
/// assert!(!tracker.offer_lower(5, None, "example"));
/// assert!(tracker.offer_upper(9, "example"));
/// assert_eq!(tracker.upper_bound(), Some(9));
/// assert!(!tracker.is_proven());
/// ```
#[derive(Debug, Clone)]
pub struct BoundTracker {
    shared: Arc<Shared>,
}

impl BoundTracker {
    /// Tracker for an instance of `len` items, starting from the empty
    /// solution at profit zero.
    pub fn new(len: usize) -> Self {
        Self::build(0, Some(FixedBitSet::with_capacity(len)), None)
    }

    /// Tracker that only accepts solutions strictly better than `floor`.
    pub fn with_floor(floor: i64) -> Self {
        Self::build(floor, None, None)
    }

    /// Tracker for a sub-problem whose profits are `offset` below the
    /// parent's.
    pub fn child(&self, offset: i64) -> Self {
        let parent = Parent {
            tracker: self.clone(),
            offset,
        };
        Self::build(0, None, Some(parent))
    }

    fn build(lower: i64, solution: Option<FixedBitSet>, parent: Option<Parent>) -> Self {
        let (solution_profit, floor) = match solution {
            Some(_) => (lower, i64::MIN),
            None => (i64::MIN, lower),
        };
        Self {
            shared: Arc::new(Shared {
                lower: AtomicI64::new(lower),
                upper: AtomicI64::new(UNKNOWN_UPPER),
                record: Mutex::new(Record {
                    lower,
                    upper: UNKNOWN_UPPER,
                    floor,
                    solution,
                    solution_profit,
                    events: None,
                    on_proof: None,
                }),
                parent,
                created: Instant::now(),
            }),
        }
    }

    /// Emits a [`BoundEvent`] on every later improvement.
    pub fn set_event_sender(&self, sender: EventSender) {
        self.lock().events = Some(sender);
    }

    /// Cancels `token` once the lower bound reaches the upper bound.
    pub fn cancel_on_proof(&self, token: CancellationToken) {
        self.lock().on_proof = Some(token);
    }

    /// Best lower bound, including the parent's.
    pub fn lower_bound(&self) -> i64 {
        let own = self.own_lower_bound();
        match &self.shared.parent {
            Some(parent) => own.max(parent.tracker.lower_bound().saturating_sub(parent.offset)),
            None => own,
        }
    }

    /// Lower bound established by this tracker alone.
    pub fn own_lower_bound(&self) -> i64 {
        self.shared.lower.load(Ordering::Acquire)
    }

    pub fn upper_bound(&self) -> Option<i64> {
        match self.shared.upper.load(Ordering::Acquire) {
            UNKNOWN_UPPER => None,
            upper => Some(upper),
        }
    }

    pub fn is_proven(&self) -> bool {
        self.upper_bound()
            .is_some_and(|upper| self.lower_bound() >= upper)
    }

    pub fn best_solution(&self) -> Option<FixedBitSet> {
        self.lock().solution.clone()
    }

    /// Profit of [`best_solution`](Self::best_solution), or `i64::MIN`
    /// when there is none.
    pub fn solution_profit(&self) -> i64 {
        self.lock().solution_profit
    }

    /// Raises the lower bound to `value`. A solution attaining it replaces
    /// the stored one when it is strictly more profitable.
    ///
    /// Returns true when the bound itself improved.
    pub fn offer_lower(
        &self,
        value: i64,
        solution: Option<FixedBitSet>,
        reason: &'static str,
    ) -> bool {
        if solution.is_none() && value <= self.own_lower_bound() {
            return false;
        }
        let mut record = self.lock();
        if let Some(solution) = solution {
            if value > record.solution_profit && value >= record.lower && value > record.floor {
                record.solution = Some(solution);
                record.solution_profit = value;
            }
        }
        if value <= record.lower {
            return false;
        }
        record.lower = value;
        self.shared.lower.store(value, Ordering::Release);
        debug!(event = "lower_bound_improved", value, reason);
        self.emit(&record, BoundEventKind::LowerBoundImproved, value, reason);
        self.check_proof(&record);
        true
    }

    /// Lowers the upper bound to `value`, never below the lower bound.
    ///
    /// Returns true when the bound improved.
    pub fn offer_upper(&self, value: i64, reason: &'static str) -> bool {
        if value >= self.shared.upper.load(Ordering::Acquire) {
            return false;
        }
        let value = value.max(self.lower_bound());
        let mut record = self.lock();
        if value >= record.upper {
            return false;
        }
        record.upper = value;
        self.shared.upper.store(value, Ordering::Release);
        debug!(event = "upper_bound_improved", value, reason);
        self.emit(&record, BoundEventKind::UpperBoundImproved, value, reason);
        self.check_proof(&record);
        drop(record);
        if let Some(parent) = &self.shared.parent {
            parent
                .tracker
                .offer_upper(value.saturating_add(parent.offset), reason);
        }
        true
    }

    fn emit(&self, record: &Record, kind: BoundEventKind, value: i64, reason: &'static str) {
        if let Some(events) = &record.events {
            // A dropped receiver only means nobody is listening.
            let _ = events.send(BoundEvent {
                kind,
                value,
                elapsed: self.shared.created.elapsed(),
                reason,
            });
        }
    }

    fn check_proof(&self, record: &Record) {
        if record.upper != UNKNOWN_UPPER && self.lower_bound().max(record.lower) >= record.upper {
            if let Some(token) = &record.on_proof {
                token.cancel();
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Record> {
        // The record holds no invariant that a panicking writer could break.
        self.shared
            .record
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
