//! Surrogate relaxation of a cardinality constraint.
//!
//! When the break solution already uses as many free items as can ever
//! fit, every solution satisfies `sum x <= card`. When it uses one item
//! fewer than any solution beating the lower bound needs, every improving
//! solution satisfies `sum x >= card`. Adding a multiplier `s` to every
//! weight and `s * card` to the capacity folds the constraint into the
//! knapsack, with `s >= 0` for the first case and `s <= 0` for the second,
//! which often tightens the Dantzig bound considerably. The multiplier is
//! found by bisection on the break cardinality of the transformed instance;
//! the transformed instance is then solved exactly, and any solution of it
//! that fits the original capacity is offered back.

use std::thread::{self, JoinHandle};

use fixedbitset::FixedBitSet;
use knapforge_config::{SolveConfig, SurrogateExecution, SurrogateTrigger};
use knapforge_core::{bound, Instance, Item};
use tracing::{debug, info, warn};

use crate::core_manager::CoreManager;
use crate::scope::SolveScope;
use crate::solver::{ExactSolver, SolveRole};
use crate::stats::SolverStats;
use crate::tracker::BoundTracker;

/// Result of the multiplier bisection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurrogateBound {
    /// Best multiplier found: positive for a maximum cardinality, negative
    /// for a minimum cardinality. `0` means the relaxation is no tighter
    /// than the plain Dantzig bound.
    pub multiplier: i64,
    /// The cardinality folded into the capacity.
    pub cardinality: usize,
    /// Upper bound including the profit of fixed items.
    pub upper_bound: i64,
}

/// Which side of the item count the relaxation constrains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    /// No more than the number of items that fit together.
    Maximum,
    /// At least the number of items needed to beat the lower bound.
    Minimum,
}

/// Computes the surrogate bound for the free items of a located instance.
///
/// Returns `None` when the break solution matches neither the maximum
/// cardinality nor one below the minimum cardinality for `lower_bound`,
/// when every free item fits, or when cancelled before any multiplier was
/// evaluated.
pub fn relax(
    instance: &Instance,
    lower_bound: i64,
    scope: &mut SolveScope,
) -> Option<SurrogateBound> {
    let window = instance.window();
    if !window.is_located() || window.all_fit() {
        return None;
    }
    let problem = SurrogateProblem::new(instance);
    let break_count = window.break_item() - window.first();
    let maximum = problem.max_cardinality();
    if break_count == maximum {
        return problem.bisect(Side::Maximum, maximum, scope);
    }
    let minimum = problem.min_cardinality(lower_bound);
    if minimum == Some(break_count + 1) {
        return problem.bisect(Side::Minimum, break_count + 1, scope);
    }
    debug!(event = "surrogate_skipped", break_count, maximum, minimum = ?minimum);
    None
}

/// Starts the surrogate relaxation once the search grows past a state count.
#[derive(Debug)]
pub struct SurrogateCoordinator {
    threshold: usize,
    execution: SurrogateExecution,
    child_config: SolveConfig,
    triggered: bool,
    worker: Option<JoinHandle<SolverStats>>,
}

impl SurrogateCoordinator {
    /// Returns `None` when the trigger is disabled.
    pub fn new(config: &SolveConfig) -> Option<Self> {
        match config.surrogate_trigger {
            SurrogateTrigger::Disabled => None,
            SurrogateTrigger::StateCount(threshold) => Some(Self {
                threshold,
                execution: config.surrogate_execution,
                child_config: config
                    .clone()
                    .with_surrogate_trigger(SurrogateTrigger::Disabled),
                triggered: false,
                worker: None,
            }),
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered
    }

    /// Runs the relaxation the first time `live_states` exceeds the
    /// threshold. Returns true when a surrogate sub-solve was started.
    pub fn maybe_trigger(
        &mut self,
        live_states: usize,
        instance: &Instance,
        tracker: &BoundTracker,
        scope: &mut SolveScope,
    ) -> bool {
        if self.triggered || live_states <= self.threshold {
            return false;
        }
        self.triggered = true;

        let Some(relaxation) = relax(instance, tracker.lower_bound(), scope) else {
            return false;
        };
        self.apply(relaxation, instance, tracker, scope)
    }

    /// Offers the relaxation's bound and starts the sub-solve of the
    /// transformed instance. A zero multiplier only offers the bound.
    fn apply(
        &mut self,
        relaxation: SurrogateBound,
        instance: &Instance,
        tracker: &BoundTracker,
        scope: &mut SolveScope,
    ) -> bool {
        info!(
            event = "surrogate_bound",
            multiplier = relaxation.multiplier,
            cardinality = relaxation.cardinality,
            upper_bound = relaxation.upper_bound
        );
        tracker.offer_upper(relaxation.upper_bound, "surrogate relaxation");
        if relaxation.multiplier == 0 {
            return false;
        }

        let problem = SurrogateProblem::new(instance);
        let Some(relaxed) = problem.transform(relaxation.multiplier, relaxation.cardinality) else {
            return false;
        };
        self.launch(problem, relaxed, tracker, scope);
        true
    }

    fn launch(
        &mut self,
        problem: SurrogateProblem,
        relaxed: Instance,
        tracker: &BoundTracker,
        scope: &mut SolveScope,
    ) {
        let token = scope.token().child();
        let child_tracker = tracker.child(problem.fixed_profit);
        child_tracker.cancel_on_proof(token.clone());
        let child_scope = scope.fork(token);
        let parent = tracker.clone();
        let config = self.child_config.clone();
        scope.stats.surrogate_solves += 1;

        let work = move || {
            solve_relaxed(
                problem,
                relaxed,
                &config,
                &parent,
                &child_tracker,
                child_scope,
            )
        };
        match self.execution {
            SurrogateExecution::Inline => {
                let stats = work();
                scope.stats.merge(&stats);
            }
            SurrogateExecution::Background => {
                match thread::Builder::new()
                    .name("knapforge-surrogate".to_string())
                    .spawn(work)
                {
                    Ok(handle) => self.worker = Some(handle),
                    Err(err) => warn!(event = "surrogate_spawn_failed", error = %err),
                }
            }
        }
    }

    /// Waits for a background sub-solve and folds in its statistics.
    pub fn join(&mut self, scope: &mut SolveScope) {
        if let Some(handle) = self.worker.take() {
            match handle.join() {
                Ok(stats) => scope.stats.merge(&stats),
                Err(_) => warn!(event = "surrogate_worker_panicked"),
            }
        }
    }
}

fn solve_relaxed(
    problem: SurrogateProblem,
    mut relaxed: Instance,
    config: &SolveConfig,
    parent: &BoundTracker,
    tracker: &BoundTracker,
    mut scope: SolveScope,
) -> SolverStats {
    let status = ExactSolver::new(config).run(&mut relaxed, tracker, &mut scope, SolveRole::Surrogate);
    match status {
        Ok(status) => debug!(
            event = "surrogate_end",
            status = %status,
            lower_bound = tracker.own_lower_bound()
        ),
        Err(err) => {
            warn!(event = "surrogate_failed", error = %err);
            return scope.stats;
        }
    }

    // A transformed solution off the folded cardinality may exceed the
    // original capacity.
    if let Some(solution) = tracker.best_solution() {
        if problem.fits(&solution) {
            let profit = tracker.solution_profit() + problem.fixed_profit;
            parent.offer_lower(profit, Some(problem.translate(&solution)), "surrogate solution");
        }
    }
    scope.stats
}

/// The free part of an instance, renumbered, with enough bookkeeping to map
/// a solution back.
#[derive(Debug, Clone)]
struct SurrogateProblem {
    items: Vec<Item>,
    /// Original id of each renumbered item.
    origin: Vec<usize>,
    /// Ids of items fixed into the knapsack.
    fixed_in: Vec<usize>,
    capacity: i64,
    fixed_profit: i64,
    len: usize,
}

impl SurrogateProblem {
    fn new(instance: &Instance) -> Self {
        let free = instance.free_range();
        let items = instance
            .free_items()
            .iter()
            .enumerate()
            .map(|(id, item)| Item::new(id, item.weight, item.profit))
            .collect();
        Self {
            items,
            origin: instance.free_items().iter().map(|item| item.id).collect(),
            fixed_in: instance.items()[..free.start]
                .iter()
                .map(|item| item.id)
                .collect(),
            capacity: instance.residual_capacity(),
            fixed_profit: instance.fixed_profit(),
            len: instance.len(),
        }
    }

    /// Number of the lightest items that fit together.
    fn max_cardinality(&self) -> usize {
        let mut weights: Vec<i64> = self.items.iter().map(|item| item.weight).collect();
        weights.sort_unstable();
        let mut packed = 0;
        weights
            .iter()
            .take_while(|&&weight| {
                packed += weight;
                packed <= self.capacity
            })
            .count()
    }

    /// Fewest free items whose profit, with the fixed profit, exceeds
    /// `lower_bound`; `None` when even all of them do not.
    fn min_cardinality(&self, lower_bound: i64) -> Option<usize> {
        let mut profits: Vec<i64> = self.items.iter().map(|item| item.profit).collect();
        profits.sort_unstable_by(|a, b| b.cmp(a));
        let mut earned = self.fixed_profit;
        for (count, profit) in profits.into_iter().enumerate() {
            if earned > lower_bound {
                return Some(count);
            }
            earned = earned.saturating_add(profit);
        }
        (earned > lower_bound).then_some(self.items.len())
    }

    /// The instance with `multiplier` added to every weight and
    /// `multiplier * cardinality` to the capacity, or `None` on overflow or
    /// when a weight or the capacity would drop below one or zero.
    fn transform(&self, multiplier: i64, cardinality: usize) -> Option<Instance> {
        let capacity = multiplier
            .checked_mul(i64::try_from(cardinality).ok()?)?
            .checked_add(self.capacity)?;
        let items = self
            .items
            .iter()
            .map(|item| {
                let weight = item.weight.checked_add(multiplier)?;
                (weight > 0).then(|| Item::new(item.id, weight, item.profit))
            })
            .collect::<Option<Vec<_>>>()?;
        Instance::new(items, capacity).ok()
    }

    /// Bisects the multiplier magnitude until the transformed break
    /// solution holds exactly `cardinality` items and fills the capacity.
    fn bisect(
        &self,
        side: Side,
        cardinality: usize,
        scope: &mut SolveScope,
    ) -> Option<SurrogateBound> {
        let max_weight = self.items.iter().map(|item| item.weight).max()?;
        let min_weight = self.items.iter().map(|item| item.weight).min()?;
        let max_profit = self.items.iter().map(|item| item.profit).max()?;
        let (sign, limit) = match side {
            Side::Maximum => (1, max_weight.saturating_mul(max_profit).max(1)),
            Side::Minimum => (-1, min_weight - 1),
        };
        let (mut lo, mut hi) = (0_i64, limit);
        let mut core = CoreManager::new();
        let mut best: Option<SurrogateBound> = None;

        while lo <= hi && !scope.should_stop() {
            let magnitude = lo + (hi - lo) / 2;
            let multiplier = sign * magnitude;
            let Some(mut relaxed) = self.transform(multiplier, cardinality) else {
                hi = magnitude - 1;
                continue;
            };
            scope.stats.surrogate_rounds += 1;
            let taken = core.locate_break_item(&mut relaxed, scope.rng());
            let upper_bound = bound::dantzig(&relaxed) + self.fixed_profit;
            if best.map_or(true, |best| upper_bound < best.upper_bound) {
                best = Some(SurrogateBound {
                    multiplier,
                    cardinality,
                    upper_bound,
                });
            }

            let (weight, _) = relaxed.break_solution();
            let room = relaxed.capacity() - weight;
            if taken == cardinality && room == 0 {
                break;
            }
            // A larger magnitude pushes the count toward `cardinality`.
            let grow = match side {
                Side::Maximum => taken > cardinality || (taken == cardinality && room > 0),
                Side::Minimum => taken < cardinality,
            };
            if grow {
                lo = magnitude + 1;
            } else {
                hi = magnitude - 1;
            }
        }
        best
    }

    /// Returns true when the renumbered `solution` fits the residual
    /// capacity with its plain weights.
    fn fits(&self, solution: &FixedBitSet) -> bool {
        let weight: i64 = solution.ones().map(|index| self.items[index].weight).sum();
        weight <= self.capacity
    }

    /// Maps a solution of the renumbered items to one over the original ids.
    fn translate(&self, solution: &FixedBitSet) -> FixedBitSet {
        let mut full = FixedBitSet::with_capacity(self.len);
        for &id in &self.fixed_in {
            full.insert(id);
        }
        for index in solution.ones() {
            full.insert(self.origin[index]);
        }
        full
    }
}

#[cfg(test)]
mod tests {
    use knapforge_test::{dp, scenarios};

    use super::*;
    use crate::termination::{CancellationToken, TimeBudget};

    fn scope() -> SolveScope {
        SolveScope::new(CancellationToken::new(), TimeBudget::unlimited(), Some(17))
    }

    fn located(instance: &mut Instance, scope: &mut SolveScope) {
        CoreManager::new().locate_break_item(instance, scope.rng());
    }

    #[test]
    fn test_max_cardinality() {
        let instance = Instance::from_pairs(&[(4, 1), (2, 1), (3, 1), (9, 1)], 9).unwrap();
        assert_eq!(SurrogateProblem::new(&instance).max_cardinality(), 3);
    }

    #[test]
    fn test_min_cardinality() {
        let instance = scenarios::surrogate_min_cardinality().instance();
        let problem = SurrogateProblem::new(&instance);
        assert_eq!(problem.min_cardinality(12), Some(1));
        assert_eq!(problem.min_cardinality(20), Some(2));
        assert_eq!(problem.min_cardinality(30), Some(3));
        assert_eq!(problem.min_cardinality(40), None);
    }

    #[test]
    fn test_surrogate_bound_is_valid() {
        let scenario = scenarios::surrogate_max_cardinality();
        let mut scope = scope();
        let mut instance = scenario.instance();
        located(&mut instance, &mut scope);
        let relaxation = relax(&instance, 21, &mut scope).expect("cardinality matches");
        assert_eq!(relaxation.cardinality, 2);
        assert!(relaxation.multiplier > 0);
        assert!(relaxation.upper_bound >= scenario.optimum);
        assert!(relaxation.upper_bound <= bound::dantzig(&instance));
    }

    #[test]
    fn test_minimum_side_uses_negative_multiplier() {
        let scenario = scenarios::surrogate_min_cardinality();
        let mut scope = scope();
        let mut instance = scenario.instance();
        located(&mut instance, &mut scope);
        assert_eq!(bound::dantzig(&instance), 21);

        let relaxation = relax(&instance, 20, &mut scope).expect("one item short");
        assert_eq!(relaxation.cardinality, 2);
        assert!(relaxation.multiplier < 0);
        assert_eq!(relaxation.upper_bound, scenario.optimum);
    }

    #[test]
    fn test_minimum_side_proves_lower_bound() {
        let scenario = scenarios::surrogate_min_cardinality();
        let tracker = BoundTracker::new(scenario.items.len());
        let mut held = FixedBitSet::with_capacity(scenario.items.len());
        held.insert(0);
        held.insert(3);
        tracker.offer_lower(20, Some(held), "test");
        let mut scope = scope();
        let mut instance = scenario.instance();
        located(&mut instance, &mut scope);

        let config = SolveConfig::new()
            .with_surrogate_trigger(SurrogateTrigger::StateCount(0))
            .with_surrogate_execution(SurrogateExecution::Inline);
        let mut coordinator = SurrogateCoordinator::new(&config).unwrap();
        assert!(coordinator.maybe_trigger(1, &instance, &tracker, &mut scope));
        assert_eq!(scope.stats.surrogate_solves, 1);
        assert!(tracker.is_proven());
        assert_eq!(tracker.lower_bound(), 20);
        assert_eq!(tracker.upper_bound(), Some(20));
        let solution = tracker.best_solution().unwrap();
        assert!(dp::is_feasible(&scenario.items, scenario.capacity, &solution));
        assert_eq!(dp::profit_of(&scenario.items, &solution), 20);
    }

    #[test]
    fn test_skipped_when_no_cardinality_matches() {
        // Three light items break before the heavy profitable one; four
        // items fit, yet two beat the lower bound.
        let mut instance =
            Instance::from_pairs(&[(1, 3), (1, 3), (1, 3), (9, 20), (2, 1)], 10).unwrap();
        let mut scope = scope();
        located(&mut instance, &mut scope);
        assert_eq!(relax(&instance, 20, &mut scope), None);
    }

    #[test]
    fn test_overflow_risk_narrows_range() {
        let huge = i64::MAX / 4;
        let mut instance =
            Instance::from_pairs(&[(huge, huge), (huge, huge - 1), (huge, 3)], 2 * huge).unwrap();
        let mut scope = scope();
        located(&mut instance, &mut scope);
        let relaxation = relax(&instance, 0, &mut scope).expect("cardinality matches");
        assert!(relaxation.upper_bound >= 2 * huge - 1);
    }

    #[test]
    fn test_zero_multiplier_only_offers_bound() {
        let scenario = scenarios::surrogate_max_cardinality();
        let tracker = BoundTracker::new(scenario.items.len());
        tracker.offer_lower(21, None, "test");
        let mut scope = scope();
        let mut instance = scenario.instance();
        located(&mut instance, &mut scope);

        let config = SolveConfig::new()
            .with_surrogate_trigger(SurrogateTrigger::StateCount(0))
            .with_surrogate_execution(SurrogateExecution::Inline);
        let mut coordinator = SurrogateCoordinator::new(&config).unwrap();
        let relaxation = SurrogateBound {
            multiplier: 0,
            cardinality: 2,
            upper_bound: 27,
        };
        assert!(!coordinator.apply(relaxation, &instance, &tracker, &mut scope));
        assert_eq!(scope.stats.surrogate_solves, 0);
        assert_eq!(tracker.lower_bound(), 21);
        assert_eq!(tracker.upper_bound(), Some(27));

        let relaxation = relax(&instance, 21, &mut scope).unwrap();
        assert_ne!(relaxation.multiplier, 0);
        assert!(coordinator.apply(relaxation, &instance, &tracker, &mut scope));
        assert_eq!(scope.stats.surrogate_solves, 1);
        assert_eq!(tracker.lower_bound(), scenario.optimum);
    }

    #[test]
    fn test_inline_sub_solve_finds_feasible_solution() {
        let scenario = scenarios::surrogate_max_cardinality();
        let tracker = BoundTracker::new(scenario.items.len());
        let mut scope = scope();
        let mut instance = scenario.instance();
        located(&mut instance, &mut scope);

        let config = SolveConfig::new()
            .with_surrogate_trigger(SurrogateTrigger::StateCount(0))
            .with_surrogate_execution(SurrogateExecution::Inline);
        let mut coordinator = SurrogateCoordinator::new(&config).unwrap();
        coordinator.maybe_trigger(1, &instance, &tracker, &mut scope);
        coordinator.join(&mut scope);

        let solution = tracker.best_solution().unwrap();
        assert!(dp::is_feasible(&scenario.items, scenario.capacity, &solution));
        assert_eq!(dp::profit_of(&scenario.items, &solution), tracker.solution_profit());
        assert!(tracker.solution_profit() <= scenario.optimum);
        // Triggers once.
        assert!(!coordinator.maybe_trigger(10, &instance, &tracker, &mut scope));
    }
}
