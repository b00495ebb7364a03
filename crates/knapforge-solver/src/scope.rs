//! Per-run solving context.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::stats::SolverStats;
use crate::termination::{CancellationToken, TimeBudget};

/// Everything a pipeline run needs besides the instance and the tracker:
/// the cancellation token, the time budget, the random source for pivot
/// selection and the statistics counters.
#[derive(Debug)]
pub struct SolveScope {
    token: CancellationToken,
    budget: TimeBudget,
    rng: StdRng,
    pub stats: SolverStats,
}

impl SolveScope {
    pub fn new(token: CancellationToken, budget: TimeBudget, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let mut stats = SolverStats::default();
        stats.start();
        Self {
            token,
            budget,
            rng,
            stats,
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn budget(&self) -> &TimeBudget {
        &self.budget
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Polls cancellation and the budget. An exhausted budget cancels the
    /// token so workers sharing it stop as well.
    pub fn should_stop(&self) -> bool {
        if self.token.is_cancelled() {
            return true;
        }
        if !self.budget.check_time() {
            self.token.cancel();
            return true;
        }
        false
    }

    /// Creates a scope for a worker that shares this run's deadline.
    pub fn fork(&mut self, token: CancellationToken) -> SolveScope {
        let seed = self.rng.random();
        SolveScope::new(token, self.budget, Some(seed))
    }

    /// Creates a scope for a nested solve that keeps this run's deadline.
    ///
    /// Cancelling this scope's own token does not reach the nested solve,
    /// so a proof that ends this run still lets it recover its solution;
    /// cancelling any ancestor does.
    pub fn nested(&mut self) -> SolveScope {
        let seed = self.rng.random();
        SolveScope::new(self.token.sibling(), self.budget, Some(seed))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_exhausted_budget_cancels_token() {
        let token = CancellationToken::new();
        let scope = SolveScope::new(
            token.clone(),
            TimeBudget::new(Some(Duration::ZERO)),
            Some(1),
        );
        assert!(scope.should_stop());
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_nested_scope_ignores_own_token() {
        let token = CancellationToken::new();
        let mut scope = SolveScope::new(token.clone(), TimeBudget::unlimited(), Some(1));
        let nested = scope.nested();
        token.cancel();
        assert!(scope.should_stop());
        assert!(!nested.should_stop());
    }

    #[test]
    fn test_nested_scope_follows_ancestors() {
        let root = CancellationToken::new();
        let mut scope = SolveScope::new(root.child(), TimeBudget::unlimited(), Some(1));
        let nested = scope.nested();
        scope.token().cancel();
        assert!(!nested.should_stop());
        root.cancel();
        assert!(nested.should_stop());
    }

    #[test]
    fn test_nested_scope_keeps_deadline() {
        let mut scope = SolveScope::new(
            CancellationToken::new(),
            TimeBudget::new(Some(Duration::ZERO)),
            Some(1),
        );
        let nested = scope.nested();
        assert_eq!(nested.budget().limit(), Some(Duration::ZERO));
        assert!(nested.should_stop());
    }

    #[test]
    fn test_fork_keeps_deadline() {
        let mut scope = SolveScope::new(
            CancellationToken::new(),
            TimeBudget::millis(250),
            Some(1),
        );
        let forked = scope.fork(scope.token().child());
        assert_eq!(forked.budget().limit(), Some(Duration::from_millis(250)));
    }
}
