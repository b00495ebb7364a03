//! Solver entry point that hides configuration loading.

use knapforge_config::SolveConfig;
use knapforge_core::{Instance, Result};
use knapforge_solver::{solve, SolveResult};

/// Solves the instance given as `(weight, profit)` pairs.
///
/// Item ids are the pair indices. The configuration is read from
/// `solver.toml` in the working directory when it exists; otherwise the
/// defaults apply. With the `console` feature the colored console output is
/// initialized first.
pub fn run_solver(pairs: &[(i64, i64)], capacity: i64) -> Result<SolveResult> {
    #[cfg(feature = "console")]
    knapforge_console::init();

    let config = SolveConfig::load("solver.toml").unwrap_or_default();
    solve(Instance::from_pairs(pairs, capacity)?, &config)
}
