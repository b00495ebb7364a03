//! The exact pipeline and the top-level entry points.

use std::fmt;
use std::time::{Duration, Instant};

use fixedbitset::FixedBitSet;
use knapforge_config::{LowerBoundSource, SolveConfig, UpperBoundMode};
use knapforge_core::{bound, Decision, Fix, FixSummary, Instance, Item, KnapsackError, Result};
use tracing::{debug, info};

use crate::core_manager::CoreManager;
use crate::event::EventSender;
use crate::heuristic::greedy;
use crate::reduce::{self, Reduction};
use crate::scope::SolveScope;
use crate::search::{SearchPhase, StateSpaceSearcher};
use crate::stats::SolverStats;
use crate::surrogate::SurrogateCoordinator;
use crate::termination::{CancellationToken, TimeBudget};
use crate::tracker::BoundTracker;

/// Terminal state of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// The lower bound is proven optimal.
    Converged,
    /// Cancelled first; the bounds are the best known.
    TimedOut,
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveStatus::Converged => f.write_str("converged"),
            SolveStatus::TimedOut => f.write_str("timed_out"),
        }
    }
}

/// Outcome of [`solve`].
#[derive(Debug, Clone)]
pub struct SolveResult {
    pub lower_bound: i64,
    pub upper_bound: i64,
    /// The selected items, indexed by item id. Its profit equals
    /// `lower_bound`.
    pub solution: FixedBitSet,
    pub status: SolveStatus,
    pub stats: SolverStats,
    pub duration: Duration,
}

impl SolveResult {
    pub fn is_optimal(&self) -> bool {
        self.lower_bound >= self.upper_bound
    }

    /// Ids of the selected items in increasing order.
    pub fn selected_items(&self) -> Vec<usize> {
        self.solution.ones().collect()
    }
}

/// Solves `instance` to optimality or until the configured time limit.
///
/// # Example
///
/// ```
/// use knapforge_config::SolveConfig;
/// use knapforge_core::Instance;
/// use knapforge_solver::{solve, SolveStatus};
///
/// let instance = Instance::from_pairs(&[(6, 7), (6, 7), (5, 5), (5, 5), (5, 5)], 15).unwrap();
/// let result = solve(instance, &SolveConfig::default()).unwrap();
///
/// assert_eq!(result.status, SolveStatus::Converged);
/// assert_eq!(result.lower_bound, 15);
/// assert_eq!(result.selected_items(), vec![2, 3, 4]);
/// ```
pub fn solve(instance: Instance, config: &SolveConfig) -> Result<SolveResult> {
    solve_inner(instance, config, None)
}

/// Like [`solve`], additionally sending every bound improvement to
/// `events`.
pub fn solve_with_events(
    instance: Instance,
    config: &SolveConfig,
    events: EventSender,
) -> Result<SolveResult> {
    solve_inner(instance, config, Some(events))
}

fn solve_inner(
    mut instance: Instance,
    config: &SolveConfig,
    events: Option<EventSender>,
) -> Result<SolveResult> {
    config
        .validate()
        .map_err(|err| KnapsackError::Config(err.to_string()))?;
    let started = Instant::now();
    let token = CancellationToken::new();
    let mut scope = SolveScope::new(
        token.clone(),
        TimeBudget::new(config.time_limit()),
        config.random_seed,
    );
    let tracker = BoundTracker::new(instance.len());
    tracker.cancel_on_proof(token);
    if let Some(events) = events {
        tracker.set_event_sender(events);
    }

    info!(
        event = "solve_start",
        items = instance.len(),
        capacity = instance.capacity(),
        mode = ?config.upper_bound_mode,
        time_limit_ms = config.time_limit().map(|limit| limit.as_millis() as u64)
    );

    if config.initial_lower_bound_source == LowerBoundSource::Greedy {
        let (profit, solution) = greedy(&instance);
        tracker.offer_lower(profit, Some(solution), "greedy heuristic");
    }
    ExactSolver::new(config).run(&mut instance, &tracker, &mut scope, SolveRole::Root)?;

    let solution = tracker
        .best_solution()
        .unwrap_or_else(|| FixedBitSet::with_capacity(instance.len()));
    let lower_bound = tracker.solution_profit().max(0);
    let total_profit = instance.items().iter().map(|item| item.profit).sum::<i64>();
    let upper_bound = tracker.upper_bound().unwrap_or(total_profit).max(lower_bound);
    let status = if lower_bound >= upper_bound {
        SolveStatus::Converged
    } else {
        SolveStatus::TimedOut
    };
    let duration = started.elapsed();

    info!(
        event = "solve_end",
        lower_bound,
        upper_bound,
        status = %status,
        duration_ms = duration.as_millis() as u64,
        expansions = scope.stats.expansions,
        peak_states = scope.stats.peak_states
    );
    Ok(SolveResult {
        lower_bound,
        upper_bound,
        solution,
        status,
        stats: scope.stats,
        duration,
    })
}

/// What a pipeline run is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SolveRole {
    /// The caller's instance; may start the surrogate relaxation.
    Root,
    /// The transformed instance of a surrogate relaxation.
    Surrogate,
    /// Forgotten decisions of a best state; stops at `target` profit.
    Reconstruction { target: i64 },
}

/// Runs trivial fixing, partial sorting, reduction and the state space
/// search on one instance, then turns the best state into a solution.
///
/// Sub-solves for surrogate relaxation and reconstruction are plain
/// recursive calls with their own tracker and scope.
#[derive(Debug)]
pub(crate) struct ExactSolver<'a> {
    config: &'a SolveConfig,
    depth: usize,
}

impl<'a> ExactSolver<'a> {
    pub(crate) fn new(config: &'a SolveConfig) -> Self {
        Self { config, depth: 0 }
    }

    pub(crate) fn run(
        &self,
        instance: &mut Instance,
        tracker: &BoundTracker,
        scope: &mut SolveScope,
        role: SolveRole,
    ) -> Result<SolveStatus> {
        scope.stats.searches += 1;
        let trivial = fix_trivial(instance);
        scope.stats.record_fixed(trivial.total());

        if instance.window().free_len() == 0 {
            let first = instance.window().first();
            let solution = instance.solution_with(|pos| pos < first);
            let profit = instance.fixed_profit();
            tracker.offer_lower(profit, Some(solution), "trivial instance");
            tracker.offer_upper(profit, "trivial instance");
            return Ok(SolveStatus::Converged);
        }

        let mut core = CoreManager::new();
        let break_item = match self.config.upper_bound_mode {
            UpperBoundMode::BreakAnchored => core.locate_break_item(instance, scope.rng()),
            UpperBoundMode::FullySorted => core.sort_free_range(instance),
        };
        let (_, break_profit) = instance.break_solution();
        debug!(
            event = "break_item",
            depth = self.depth,
            position = break_item,
            free = instance.window().free_len(),
            break_profit
        );

        let solution = instance.solution_with(|pos| pos < break_item);
        if instance.window().all_fit() {
            tracker.offer_lower(break_profit, Some(solution), "all items fit");
            tracker.offer_upper(break_profit, "all items fit");
            return Ok(SolveStatus::Converged);
        }
        tracker.offer_upper(bound::dantzig(instance), "dantzig bound");
        tracker.offer_lower(break_profit, Some(solution), "break solution");

        let target = match role {
            SolveRole::Reconstruction { target } => {
                if tracker.solution_profit() >= target {
                    return Ok(SolveStatus::Converged);
                }
                Some(target)
            }
            _ => None,
        };

        match reduce::reduce(instance, tracker.lower_bound(), self.config.upper_bound_mode) {
            Reduction::LowerBoundOptimal => {
                tracker.offer_upper(tracker.lower_bound(), "reduction");
                return Ok(SolveStatus::Converged);
            }
            Reduction::Reduced(summary) => scope.stats.record_fixed(summary.total()),
        }

        let mut searcher =
            StateSpaceSearcher::new(instance, self.config.core_window_size, core, target)?;
        let mut surrogate = match role {
            SolveRole::Root => SurrogateCoordinator::new(self.config),
            _ => None,
        };
        let phase = searcher.run(instance, tracker, scope, surrogate.as_mut());
        if let Some(coordinator) = surrogate.as_mut() {
            coordinator.join(scope);
        }
        scope.stats.core_extensions += searcher.core().extensions();
        scope.stats.record_fixed(searcher.core().fixed());

        self.finalize(instance, &searcher, tracker, scope)?;
        Ok(match phase {
            SearchPhase::Converged => SolveStatus::Converged,
            _ => SolveStatus::TimedOut,
        })
    }

    /// Offers the solution behind the searcher's best state, recovering
    /// forgotten decisions when the window slid past them.
    fn finalize(
        &self,
        instance: &Instance,
        searcher: &StateSpaceSearcher,
        tracker: &BoundTracker,
        scope: &mut SolveScope,
    ) -> Result<()> {
        let Some(best) = searcher.best() else {
            return Ok(());
        };
        if best.profit <= tracker.solution_profit() {
            return Ok(());
        }
        let decisions = searcher.codec().reconstruct_snapshot(&best.snapshot);
        if best.snapshot.is_complete() {
            let solution = instance.solution_with(|pos| decisions[pos] == Decision::ForcedIn);
            debug_assert_eq!(instance.evaluate(&solution), (best.weight, best.profit));
            tracker.offer_lower(best.profit, Some(solution), "state space search");
            return Ok(());
        }
        self.reconstruct(instance, &decisions, best.profit, tracker, scope)
    }

    /// Solves the undecided items as a smaller instance that must reach
    /// `profit` together with the decided ones.
    ///
    /// The sub-solve shares the run's deadline. When it stops short of the
    /// target the tracker keeps the solution it already holds.
    fn reconstruct(
        &self,
        instance: &Instance,
        decisions: &[Decision],
        profit: i64,
        tracker: &BoundTracker,
        scope: &mut SolveScope,
    ) -> Result<()> {
        let mut items = Vec::new();
        let mut sub_index = vec![None; instance.len()];
        let (mut decided_weight, mut decided_profit) = (0, 0);
        for (pos, decision) in decisions.iter().enumerate() {
            let item = instance.item(pos);
            match decision {
                Decision::ForcedIn => {
                    decided_weight += item.weight;
                    decided_profit += item.profit;
                }
                Decision::ForcedOut => {}
                Decision::Undecided => {
                    sub_index[pos] = Some(items.len());
                    items.push(Item::new(items.len(), item.weight, item.profit));
                }
            }
        }

        let target = profit - decided_profit;
        debug!(
            event = "reconstruct",
            depth = self.depth,
            undecided = items.len(),
            target
        );
        let mut sub = Instance::new(items, instance.capacity() - decided_weight)?;
        let sub_tracker = BoundTracker::with_floor(target - 1);
        let mut sub_scope = scope.nested();
        let solver = ExactSolver {
            config: self.config,
            depth: self.depth + 1,
        };
        solver.run(
            &mut sub,
            &sub_tracker,
            &mut sub_scope,
            SolveRole::Reconstruction { target },
        )?;
        scope.stats.merge(&sub_scope.stats);
        scope.stats.reconstructions += 1;

        let Some(sub_solution) = sub_tracker.best_solution() else {
            // Stopped before reaching the target; the tracker keeps its
            // previous solution.
            debug!(
                event = "reconstruct_incomplete",
                depth = self.depth,
                target
            );
            return Ok(());
        };
        let solution = instance.solution_with(|pos| match decisions[pos] {
            Decision::ForcedIn => true,
            Decision::ForcedOut => false,
            Decision::Undecided => sub_index[pos].is_some_and(|index| sub_solution.contains(index)),
        });
        let total = decided_profit + sub_tracker.solution_profit();
        debug_assert!(instance.evaluate(&solution).0 <= instance.capacity());
        tracker.offer_lower(total, Some(solution), "reconstruction");
        Ok(())
    }
}

/// Fixes zero-weight items in and items heavier than the residual capacity
/// out.
fn fix_trivial(instance: &mut Instance) -> FixSummary {
    let residual = instance.residual_capacity();
    instance.fix_by(|_, item| {
        if item.weight == 0 {
            Some(Fix::Included)
        } else if item.weight > residual {
            Some(Fix::Excluded)
        } else {
            None
        }
    })
}
