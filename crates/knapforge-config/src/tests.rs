//! Tests for solve configuration.

use super::*;

#[test]
fn test_toml_parsing() {
    let toml = r#"
        upper_bound_mode = "fully_sorted"
        initial_lower_bound_source = "none"
        surrogate_trigger = { state_count = 500 }
        surrogate_execution = "inline"
        core_window_size = 16
        random_seed = 42

        [termination]
        seconds_spent_limit = 30
    "#;

    let config = SolveConfig::from_toml_str(toml).unwrap();
    assert_eq!(config.upper_bound_mode, UpperBoundMode::FullySorted);
    assert_eq!(config.initial_lower_bound_source, LowerBoundSource::None);
    assert_eq!(config.surrogate_trigger, SurrogateTrigger::StateCount(500));
    assert_eq!(config.surrogate_execution, SurrogateExecution::Inline);
    assert_eq!(config.core_window_size, 16);
    assert_eq!(config.random_seed, Some(42));
    assert_eq!(config.termination.unwrap().seconds_spent_limit, Some(30));
}

#[test]
fn test_toml_disabled_surrogate() {
    let config = SolveConfig::from_toml_str(r#"surrogate_trigger = "disabled""#).unwrap();
    assert_eq!(config.surrogate_trigger, SurrogateTrigger::Disabled);
}

#[test]
fn test_yaml_parsing() {
    let yaml = r#"
        upper_bound_mode: break_anchored
        surrogate_trigger: disabled
        core_window_size: 128
        termination:
          millis_spent_limit: 250
    "#;

    let config = SolveConfig::from_yaml_str(yaml).unwrap();
    assert_eq!(config.upper_bound_mode, UpperBoundMode::BreakAnchored);
    assert_eq!(config.surrogate_trigger, SurrogateTrigger::Disabled);
    assert_eq!(config.time_limit(), Some(Duration::from_millis(250)));
}

#[test]
fn test_defaults() {
    let config = SolveConfig::from_toml_str("").unwrap();
    assert_eq!(config.upper_bound_mode, UpperBoundMode::BreakAnchored);
    assert_eq!(config.initial_lower_bound_source, LowerBoundSource::Greedy);
    assert_eq!(config.surrogate_trigger, SurrogateTrigger::StateCount(2000));
    assert_eq!(config.surrogate_execution, SurrogateExecution::Background);
    assert_eq!(config.core_window_size, 64);
    assert_eq!(config.time_limit(), None);
}

#[test]
fn test_window_size_is_validated() {
    let err = SolveConfig::from_toml_str("core_window_size = 0").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
    assert!(SolveConfig::from_toml_str("core_window_size = 129").is_err());
    assert!(SolveConfig::new().with_core_window_size(200).validate().is_err());
}

#[test]
fn test_builder() {
    let config = SolveConfig::new()
        .with_random_seed(123)
        .with_termination_seconds(2)
        .with_termination_millis(500)
        .with_upper_bound_mode(UpperBoundMode::FullySorted)
        .with_surrogate_trigger(SurrogateTrigger::StateCount(1));

    assert_eq!(config.random_seed, Some(123));
    assert_eq!(config.time_limit(), Some(Duration::from_millis(2500)));
    assert_eq!(config.upper_bound_mode, UpperBoundMode::FullySorted);
}

#[test]
fn test_huge_time_limit_saturates() {
    let termination = TerminationConfig {
        seconds_spent_limit: Some(u64::MAX),
        millis_spent_limit: Some(u64::MAX),
    };
    assert_eq!(termination.time_limit(), Some(Duration::MAX));

    let config = SolveConfig::new().with_termination_seconds(u64::MAX / 1000 + 1);
    assert_eq!(config.time_limit(), Some(Duration::from_secs(u64::MAX / 1000 + 1)));
}

#[test]
fn test_load_missing_file() {
    assert!(matches!(
        SolveConfig::load("does-not-exist.yaml"),
        Err(ConfigError::Io(_))
    ));
}
