//! Error types for ensemble construction

use thiserror::Error;

use crate::models::ResultSetId;

/// Result type alias for the ensemble service
pub type Result<T> = std::result::Result<T, EnsembleError>;

#[derive(Debug, Error)]
pub enum EnsembleError {
    /// Unknown or out-of-range configuration value, raised before any work
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The pool must hold strictly more result sets than the requested ensemble size
    #[error("Not enough result sets to form ensemble (have {available}, need more than {required})")]
    InsufficientPool { available: usize, required: usize },

    /// A result set whose recommendations could not be materialized
    #[error("Result set {id} unavailable: {reason}")]
    Unavailable { id: ResultSetId, reason: String },

    /// Result-set provider failure (listing or fetching)
    #[error("Result source error: {0}")]
    Source(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<envy::Error> for EnsembleError {
    fn from(err: envy::Error) -> Self {
        Self::Configuration(err.to_string())
    }
}
