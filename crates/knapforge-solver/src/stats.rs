//! Solver statistics.
//!
//! Plain counters collected while solving. Sub-solves keep their own
//! [`SolverStats`] and fold them into the parent with [`SolverStats::merge`].

use std::time::{Duration, Instant};

/// Aggregate counters for one solve, including its sub-solves.
///
/// # Example
///
/// ```
/// use knapforge_solver::stats::SolverStats;
///
/// let mut stats = SolverStats::default();
/// stats.start();
/// stats.record_expansion(4, 7);
/// stats.record_expansion(7, 3);
///
/// assert_eq!(stats.expansions, 2);
/// assert_eq!(stats.states_generated, 22);
/// assert_eq!(stats.peak_states, 7);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SolverStats {
    start_time: Option<Instant>,
    /// Exact pipeline runs, counting sub-solves.
    pub searches: u64,
    /// Add or remove steps applied to the state list.
    pub expansions: u64,
    /// Candidate states produced by merges before pruning.
    pub states_generated: u64,
    /// Largest live state list seen.
    pub peak_states: usize,
    /// Intervals pulled into the sorted core.
    pub core_extensions: u64,
    /// Items fixed by reduction or extension-time tests.
    pub items_fixed: u64,
    /// Multiplier evaluations of the surrogate bisection.
    pub surrogate_rounds: u64,
    /// Surrogate sub-solves started.
    pub surrogate_solves: u64,
    /// Sub-solves run to recover forgotten decisions.
    pub reconstructions: u64,
}

impl SolverStats {
    /// Marks the start of solving.
    pub fn start(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Returns the elapsed time since solving started.
    pub fn elapsed(&self) -> Duration {
        self.start_time.map(|t| t.elapsed()).unwrap_or_default()
    }

    /// Records one merge over `input` states that kept `live` of them.
    pub fn record_expansion(&mut self, input: usize, live: usize) {
        self.expansions += 1;
        self.states_generated += 2 * input as u64;
        self.peak_states = self.peak_states.max(live);
    }

    pub fn record_fixed(&mut self, count: usize) {
        self.items_fixed += count as u64;
    }

    /// Folds counters from a sub-solve into these.
    pub fn merge(&mut self, other: &SolverStats) {
        self.searches += other.searches;
        self.expansions += other.expansions;
        self.states_generated += other.states_generated;
        self.peak_states = self.peak_states.max(other.peak_states);
        self.core_extensions += other.core_extensions;
        self.items_fixed += other.items_fixed;
        self.surrogate_rounds += other.surrogate_rounds;
        self.surrogate_solves += other.surrogate_solves;
        self.reconstructions += other.reconstructions;
    }
}
