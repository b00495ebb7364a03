//! KnapForge Solver Engine
//!
//! This crate provides the exact 0-1 knapsack solver:
//! - Break item location by randomized partial sorting (`core_manager`)
//! - Variable reduction (`reduce`)
//! - Expanding-core dynamic programming (`search`)
//! - Surrogate relaxation on a background worker (`surrogate`)
//! - Shared bounds, cancellation and telemetry (`tracker`, `termination`, `event`)

pub mod core_manager;
pub mod event;
pub mod heuristic;
pub mod reduce;
pub mod scope;
pub mod search;
pub mod solver;
pub mod stats;
pub mod surrogate;
pub mod termination;
pub mod tracker;

pub use core_manager::CoreManager;
pub use event::{BoundEvent, BoundEventKind, EventReceiver, EventSender};
pub use heuristic::greedy;
pub use reduce::Reduction;
pub use scope::SolveScope;
pub use search::{SearchPhase, StateSpaceSearcher};
pub use solver::{solve, solve_with_events, SolveResult, SolveStatus};
pub use stats::SolverStats;
pub use surrogate::{SurrogateBound, SurrogateCoordinator};
pub use termination::{CancellationToken, TimeBudget};
pub use tracker::BoundTracker;
