//! Configuration system for KnapForge.
//!
//! Load solve configuration from TOML or YAML to choose the upper bound
//! mode, the initial lower bound, the surrogate relaxation trigger and the
//! time limit without code changes.
//!
//! # Examples
//!
//! Load configuration from a TOML string:
//!
//! ```
//! use knapforge_config::{SolveConfig, UpperBoundMode};
//! use std::time::Duration;
//!
//! let config = SolveConfig::from_toml_str(r#"
//!     upper_bound_mode = "fully_sorted"
//!     core_window_size = 32
//!
//!     [termination]
//!     seconds_spent_limit = 30
//! "#).unwrap();
//!
//! assert_eq!(config.upper_bound_mode, UpperBoundMode::FullySorted);
//! assert_eq!(config.time_limit(), Some(Duration::from_secs(30)));
//! ```
//!
//! Use the default config when the file is missing:
//!
//! ```
//! use knapforge_config::SolveConfig;
//!
//! let config = SolveConfig::load("knapsack.toml").unwrap_or_default();
//! assert_eq!(config.core_window_size, 64);
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest supported partial solution window, in decision bits.
pub const MAX_CORE_WINDOW_SIZE: usize = 128;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main solve configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case", default)]
pub struct SolveConfig {
    /// Which reduction bound runs before the search.
    pub upper_bound_mode: UpperBoundMode,

    /// Where the initial lower bound comes from.
    pub initial_lower_bound_source: LowerBoundSource,

    /// Live state count that starts surrogate relaxation.
    pub surrogate_trigger: SurrogateTrigger,

    /// Where the surrogate sub-solve runs.
    pub surrogate_execution: SurrogateExecution,

    /// Number of decisions each search state remembers.
    pub core_window_size: usize,

    /// Random seed for reproducible partitioning.
    pub random_seed: Option<u64>,

    /// Termination configuration.
    pub termination: Option<TerminationConfig>,
}

impl Default for SolveConfig {
    fn default() -> Self {
        Self {
            upper_bound_mode: UpperBoundMode::default(),
            initial_lower_bound_source: LowerBoundSource::default(),
            surrogate_trigger: SurrogateTrigger::default(),
            surrogate_execution: SurrogateExecution::default(),
            core_window_size: 64,
            random_seed: None,
            termination: None,
        }
    }
}

impl SolveConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file, picking the format by extension.
    ///
    /// `.yaml` and `.yml` files are parsed as YAML, anything else as TOML.
    ///
    /// # Errors
    ///
    /// Returns error if the file doesn't exist or fails to parse.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml" | "yml") => Self::from_yaml_file(path),
            _ => Self::from_toml_file(path),
        }
    }

    /// Loads configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Parses configuration from a YAML string.
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.core_window_size == 0 || self.core_window_size > MAX_CORE_WINDOW_SIZE {
            return Err(ConfigError::Invalid(format!(
                "core_window_size must be in 1..={MAX_CORE_WINDOW_SIZE}, got {}",
                self.core_window_size
            )));
        }
        Ok(())
    }

    /// Sets the upper bound mode.
    pub fn with_upper_bound_mode(mut self, mode: UpperBoundMode) -> Self {
        self.upper_bound_mode = mode;
        self
    }

    /// Sets the initial lower bound source.
    pub fn with_initial_lower_bound_source(mut self, source: LowerBoundSource) -> Self {
        self.initial_lower_bound_source = source;
        self
    }

    /// Sets the surrogate relaxation trigger.
    pub fn with_surrogate_trigger(mut self, trigger: SurrogateTrigger) -> Self {
        self.surrogate_trigger = trigger;
        self
    }

    /// Sets where the surrogate sub-solve runs.
    pub fn with_surrogate_execution(mut self, execution: SurrogateExecution) -> Self {
        self.surrogate_execution = execution;
        self
    }

    /// Sets the partial solution window size.
    pub fn with_core_window_size(mut self, size: usize) -> Self {
        self.core_window_size = size;
        self
    }

    /// Sets the random seed.
    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    /// Sets the termination time limit in seconds.
    pub fn with_termination_seconds(mut self, seconds: u64) -> Self {
        self.termination = Some(TerminationConfig {
            seconds_spent_limit: Some(seconds),
            ..self.termination.unwrap_or_default()
        });
        self
    }

    /// Sets the termination time limit in milliseconds.
    pub fn with_termination_millis(mut self, millis: u64) -> Self {
        self.termination = Some(TerminationConfig {
            millis_spent_limit: Some(millis),
            ..self.termination.unwrap_or_default()
        });
        self
    }

    /// Returns the termination time limit, if configured.
    ///
    /// Convenience method that delegates to `termination.time_limit()`.
    pub fn time_limit(&self) -> Option<Duration> {
        self.termination.as_ref().and_then(|t| t.time_limit())
    }
}

/// Reduction bound run before the state-space search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpperBoundMode {
    /// Dembo-Hammer tests anchored at the break item; needs only the
    /// partial order.
    #[default]
    BreakAnchored,

    /// Martello-Toth tests on a fully sorted free range.
    FullySorted,
}

/// Source of the lower bound before the search starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LowerBoundSource {
    /// Run the greedy heuristic once.
    #[default]
    Greedy,

    /// Start from the empty knapsack.
    None,
}

/// When surrogate relaxation starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SurrogateTrigger {
    /// Never run surrogate relaxation.
    Disabled,

    /// Run once the live state count exceeds this value.
    StateCount(usize),
}

impl Default for SurrogateTrigger {
    fn default() -> Self {
        SurrogateTrigger::StateCount(2000)
    }
}

/// Where the exact surrogate sub-solve runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SurrogateExecution {
    /// On the searching thread, before the search continues.
    Inline,

    /// On a worker thread joined when the search ends.
    #[default]
    Background,
}

/// Termination configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct TerminationConfig {
    /// Maximum seconds to spend solving.
    pub seconds_spent_limit: Option<u64>,

    /// Maximum milliseconds to spend solving, added to the seconds.
    pub millis_spent_limit: Option<u64>,
}

impl TerminationConfig {
    /// Returns the time limit as a Duration, if any.
    pub fn time_limit(&self) -> Option<Duration> {
        let limit = Duration::from_secs(self.seconds_spent_limit.unwrap_or(0))
            .saturating_add(Duration::from_millis(self.millis_spent_limit.unwrap_or(0)));
        (!limit.is_zero()).then_some(limit)
    }
}

#[cfg(test)]
mod tests;
