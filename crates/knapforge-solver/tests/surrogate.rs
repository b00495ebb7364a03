//! Integration tests for the surrogate relaxation running alongside the
//! main search.

use knapforge_config::{SolveConfig, SurrogateExecution, SurrogateTrigger};
use knapforge_solver::{solve, SolveStatus};
use knapforge_test::generate::{generate, Family};
use knapforge_test::{dp, scenarios};

fn config(execution: SurrogateExecution, seed: u64) -> SolveConfig {
    SolveConfig::default()
        .with_random_seed(seed)
        .with_surrogate_trigger(SurrogateTrigger::StateCount(0))
        .with_surrogate_execution(execution)
}

#[test]
fn test_inline_surrogate_keeps_optimum() {
    for family in Family::ALL {
        for seed in 0..6 {
            let generated = generate(family, 70, 100, seed);
            let optimum = dp::optimum(&generated.pairs, generated.capacity);
            let result = solve(
                generated.instance(),
                &config(SurrogateExecution::Inline, seed),
            )
            .unwrap();
            assert_eq!(result.status, SolveStatus::Converged);
            assert_eq!(result.lower_bound, optimum, "{family:?} seed {seed}");
            assert_eq!(dp::profit_of(&generated.pairs, &result.solution), optimum);
        }
    }
}

#[test]
fn test_background_surrogate_keeps_optimum() {
    for family in Family::ALL {
        for seed in 0..6 {
            let generated = generate(family, 70, 100, seed);
            let optimum = dp::optimum(&generated.pairs, generated.capacity);
            let result = solve(
                generated.instance(),
                &config(SurrogateExecution::Background, seed),
            )
            .unwrap();
            assert_eq!(result.status, SolveStatus::Converged);
            assert_eq!(result.lower_bound, optimum, "{family:?} seed {seed}");
            assert!(dp::is_feasible(
                &generated.pairs,
                generated.capacity,
                &result.solution
            ));
        }
    }
}

#[test]
fn test_surrogate_with_narrow_window() {
    let generated = generate(Family::StronglyCorrelated, 50, 80, 4);
    let optimum = dp::optimum(&generated.pairs, generated.capacity);
    let config = config(SurrogateExecution::Background, 4).with_core_window_size(3);
    let result = solve(generated.instance(), &config).unwrap();
    assert_eq!(dp::profit_of(&generated.pairs, &result.solution), optimum);
}

#[test]
fn test_cardinality_scenario() {
    let scenario = scenarios::surrogate_max_cardinality();
    for execution in [SurrogateExecution::Inline, SurrogateExecution::Background] {
        let result = solve(scenario.instance(), &config(execution, 1)).unwrap();
        assert!(result.is_optimal());
        assert_eq!(result.upper_bound, scenario.optimum);
        assert_eq!(result.selected_items(), vec![1, 3]);
    }
}
