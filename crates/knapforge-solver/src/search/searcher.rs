//! The expanding-core state space search.

use knapforge_core::{bound, CodecSnapshot, Instance, PartialCode, PartialSolutionCodec, Result};
use tracing::{debug, trace};

use super::state::{SearchState, StateList};
use crate::core_manager::CoreManager;
use crate::scope::SolveScope;
use crate::surrogate::SurrogateCoordinator;
use crate::tracker::BoundTracker;

/// Where the searcher is in its main loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    Initializing,
    Expanding,
    Bounding,
    /// Finished: either no state can beat the lower bound or the target
    /// profit was reached.
    Converged,
    /// Stopped by cancellation before the search finished.
    TimedOut,
}

/// The most profitable feasible state seen, with the window it was
/// encoded under.
#[derive(Debug, Clone)]
pub struct BestState {
    pub weight: i64,
    pub profit: i64,
    pub snapshot: CodecSnapshot,
}

/// Alternating add/remove dynamic programming over a located instance.
///
/// States hold absolute weight and profit, so items fixed by core
/// extension while the search runs never invalidate them.
#[derive(Debug)]
pub struct StateSpaceSearcher {
    states: StateList,
    codec: PartialSolutionCodec,
    core: CoreManager,
    /// Next position to add.
    next_right: usize,
    /// Exclusive cursor; the next position to remove is `next_left - 1`.
    next_left: usize,
    /// Largest upper bound over the live states.
    max_bound: i64,
    best: Option<BestState>,
    target: Option<i64>,
    phase: SearchPhase,
}

impl StateSpaceSearcher {
    /// Starts from the break solution of a located instance that has a break
    /// item.
    ///
    /// With a `target`, the search stops as soon as a feasible state reaches
    /// that profit.
    pub fn new(
        instance: &Instance,
        window_size: usize,
        core: CoreManager,
        target: Option<i64>,
    ) -> Result<Self> {
        let window = instance.window();
        debug_assert!(window.is_located() && !window.all_fit());
        let break_item = window.break_item();
        let codec = PartialSolutionCodec::new(window_size, break_item, instance.len())?;
        let (weight, profit) = instance.break_solution();
        let initial = SearchState {
            weight,
            profit,
            code: PartialCode::default(),
        };
        Ok(Self {
            states: StateList::new(initial),
            codec,
            core,
            next_right: break_item,
            next_left: break_item,
            max_bound: bound::dantzig(instance),
            best: None,
            target,
            phase: SearchPhase::Initializing,
        })
    }

    pub fn phase(&self) -> SearchPhase {
        self.phase
    }

    pub fn states(&self) -> &StateList {
        &self.states
    }

    pub fn codec(&self) -> &PartialSolutionCodec {
        &self.codec
    }

    pub fn core(&self) -> &CoreManager {
        &self.core
    }

    pub fn best(&self) -> Option<&BestState> {
        self.best.as_ref()
    }

    fn best_profit(&self) -> i64 {
        self.best.as_ref().map_or(i64::MIN, |best| best.profit)
    }

    fn lower_bound(&self, tracker: &BoundTracker) -> i64 {
        tracker.lower_bound().max(self.best_profit())
    }

    /// Runs until convergence or cancellation and returns the final phase.
    ///
    /// A converged search has pushed its proof to `tracker` as an upper
    /// bound equal to the lower bound.
    pub fn run(
        &mut self,
        instance: &mut Instance,
        tracker: &BoundTracker,
        scope: &mut SolveScope,
        mut surrogate: Option<&mut SurrogateCoordinator>,
    ) -> SearchPhase {
        self.phase = SearchPhase::Expanding;
        loop {
            if scope.should_stop() {
                self.phase = if tracker.is_proven() {
                    SearchPhase::Converged
                } else {
                    SearchPhase::TimedOut
                };
                break;
            }
            let lower_bound = self.lower_bound(tracker);
            if self.target.is_some_and(|target| self.best_profit() >= target) {
                self.phase = SearchPhase::Converged;
                break;
            }

            self.phase = SearchPhase::Bounding;
            if self.states.is_empty() || self.max_bound <= lower_bound {
                tracker.offer_upper(lower_bound, "state space exhausted");
                self.phase = SearchPhase::Converged;
                break;
            }
            tracker.offer_upper(self.max_bound, "state space bound");
            if let Some(coordinator) = surrogate.as_deref_mut() {
                coordinator.maybe_trigger(self.states.len(), instance, tracker, scope);
            }

            self.phase = SearchPhase::Expanding;
            let left = self
                .core
                .bound_item_left(instance, self.next_left, lower_bound);
            let mut right = self
                .core
                .bound_item_right(instance, self.next_right, lower_bound);
            if left.is_none() && right.is_none() {
                tracker.offer_upper(lower_bound, "state space exhausted");
                self.phase = SearchPhase::Converged;
                break;
            }

            if let Some(position) = right {
                right = self.add_item(instance, tracker, scope, position, left, lower_bound);
            }
            if let Some(position) = left {
                if !self.states.is_empty() {
                    let lower_bound = self.lower_bound(tracker);
                    self.remove_item(instance, tracker, scope, position, right, lower_bound);
                }
            }
        }

        debug!(
            event = "search_end",
            phase = ?self.phase,
            states = self.states.len(),
            best = self.best_profit(),
            forgotten = self.codec.forgotten().len()
        );
        self.phase
    }

    /// Adds the item at `position` and returns the next position to add.
    fn add_item(
        &mut self,
        instance: &mut Instance,
        tracker: &BoundTracker,
        scope: &mut SolveScope,
        position: usize,
        left: Option<usize>,
        lower_bound: i64,
    ) -> Option<usize> {
        self.codec.assign(position);
        let right = self
            .core
            .bound_item_right(instance, position + 1, lower_bound);
        self.next_right = position + 1;
        let item = *instance.item(position);
        self.expand(
            instance,
            tracker,
            scope,
            Step {
                position,
                weight: item.weight,
                profit: item.profit,
                adding: true,
            },
            right,
            left,
            lower_bound,
        );
        right
    }

    /// Removes the item at `position`.
    fn remove_item(
        &mut self,
        instance: &mut Instance,
        tracker: &BoundTracker,
        scope: &mut SolveScope,
        position: usize,
        right: Option<usize>,
        lower_bound: i64,
    ) {
        self.codec.assign(position);
        let left = self
            .core
            .bound_item_left(instance, position, lower_bound);
        self.next_left = position;
        let item = *instance.item(position);
        self.expand(
            instance,
            tracker,
            scope,
            Step {
                position,
                weight: -item.weight,
                profit: -item.profit,
                adding: false,
            },
            right,
            left,
            lower_bound,
        );
    }

    #[allow(clippy::too_many_arguments)]
    fn expand(
        &mut self,
        instance: &Instance,
        tracker: &BoundTracker,
        scope: &mut SolveScope,
        step: Step,
        right: Option<usize>,
        left: Option<usize>,
        lower_bound: i64,
    ) {
        let capacity = instance.capacity();
        let codec = &self.codec;
        let input = self.states.len();
        let mut lower = lower_bound;
        let mut improved = None;
        let mut max_bound = i64::MIN;

        // Unshifted states keep the break-solution value of the item,
        // shifted ones take the other.
        let keep = |code| {
            if step.adding {
                codec.remove(code, step.position)
            } else {
                codec.add(code, step.position)
            }
        };
        let shift = |code| {
            if step.adding {
                codec.add(code, step.position)
            } else {
                codec.remove(code, step.position)
            }
        };
        self.states
            .merge(step.weight, step.profit, keep, shift, |state| {
                if state.weight <= capacity && state.profit > lower {
                    lower = state.profit;
                    improved = Some(*state);
                }
                let upper = state_bound(instance, state, right, left);
                if upper <= lower {
                    return false;
                }
                max_bound = max_bound.max(upper);
                true
            });

        debug_assert!(self.states.is_dominance_free());
        scope.stats.record_expansion(input, self.states.len());
        self.max_bound = max_bound;
        if let Some(state) = improved {
            self.best = Some(BestState {
                weight: state.weight,
                profit: state.profit,
                snapshot: self.codec.snapshot(state.code),
            });
            tracker.offer_lower(state.profit, None, "state space search");
        }
        trace!(
            event = "expand",
            position = step.position,
            adding = step.adding,
            states = self.states.len(),
            lower_bound = lower
        );
    }
}

#[derive(Debug, Clone, Copy)]
struct Step {
    position: usize,
    weight: i64,
    profit: i64,
    adding: bool,
}

/// Upper bound on every completion of `state`.
///
/// Feasible states can still gain from the next item to add; states over
/// capacity must shed weight through the next item to remove.
fn state_bound(
    instance: &Instance,
    state: &SearchState,
    right: Option<usize>,
    left: Option<usize>,
) -> i64 {
    let capacity = instance.capacity();
    if state.weight <= capacity {
        match right {
            Some(pivot) => bound::dembo(instance, pivot, state.profit, capacity - state.weight),
            None => state.profit,
        }
    } else {
        bound::dembo_reverse(instance, left, state.profit, state.weight - capacity)
    }
}
