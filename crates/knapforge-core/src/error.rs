//! Error types for KnapForge

use thiserror::Error;

/// Main error type for KnapForge operations
#[derive(Debug, Error)]
pub enum KnapsackError {
    /// Instance rejected before it reaches the solver
    #[error("Invalid instance: {0}")]
    InvalidInstance(String),

    /// Error in solver configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not occur in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for KnapForge operations
pub type Result<T> = std::result::Result<T, KnapsackError>;
