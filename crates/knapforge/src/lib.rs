//! KnapForge - An exact 0-1 knapsack solver in Rust
//!
//! Expanding-core dynamic programming with partial sorting, variable
//! reduction and a surrogate cardinality relaxation.
//!
//! # Example
//!
//! ```rust
//! use knapforge::prelude::*;
//!
//! let instance = Instance::from_pairs(&[(5, 10), (4, 40), (6, 30), (3, 50)], 10).unwrap();
//! let result = solve(instance, &SolveConfig::default()).unwrap();
//! assert!(result.is_optimal());
//! assert_eq!(result.lower_bound, 90);
//! assert_eq!(result.selected_items(), vec![1, 3]);
//! ```

// Problem model
pub use knapforge_core::{bound, Instance, Item, KnapsackError, Result};

// Configuration
pub use knapforge_config::{
    ConfigError, LowerBoundSource, SolveConfig, SurrogateExecution, SurrogateTrigger,
    TerminationConfig, UpperBoundMode,
};

// Solving
pub use knapforge_solver::event::{self, BoundEvent, BoundEventKind, EventReceiver, EventSender};
pub use knapforge_solver::{
    greedy, solve, solve_with_events, CancellationToken, SolveResult, SolveStatus, SolverStats,
};

#[cfg(feature = "console")]
pub use knapforge_console as console;

mod solver;
pub use solver::run_solver;

pub mod prelude {
    pub use super::{Instance, Item, KnapsackError};
    pub use super::{LowerBoundSource, SolveConfig, SurrogateTrigger, UpperBoundMode};
    pub use super::{run_solver, solve, solve_with_events, SolveResult, SolveStatus};
}
