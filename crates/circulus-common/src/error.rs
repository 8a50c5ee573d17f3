//! Error types for the Circulus reputation engine
//!
//! Provides a unified error type and the ingest validation variants

use thiserror::Error;

/// Result type alias using ReputationError
pub type Result<T> = std::result::Result<T, ReputationError>;

/// Unified error type for reputation operations
#[derive(Debug, Error)]
pub enum ReputationError {
    // Backing metrics/event/directory store unreachable
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    // Event rejected at ingest
    #[error("Invalid event: {0}")]
    InvalidEvent(#[from] EventError),

    // Directory has no role for the entity
    #[error("Unresolved role for entity {entity_id}")]
    UnresolvedRole { entity_id: String },

    // Final write of a computed score failed
    #[error("Persist error: {0}")]
    Persist(String),

    // No score recorded for the entity
    #[error("Not found: {0}")]
    NotFound(String),

    // Computation exceeded its deadline
    #[error("Operation timed out: {0}")]
    Timeout(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ReputationError {
    /// Whether retrying the same trigger later can succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ReputationError::DataUnavailable(_)
                | ReputationError::Persist(_)
                | ReputationError::Timeout(_)
        )
    }
}

/// Ingest validation errors
#[derive(Debug, Error, PartialEq)]
pub enum EventError {
    #[error("entity_id is required")]
    MissingEntity,

    #[error("impact score {0} outside [-1, 1]")]
    ImpactOutOfRange(f64),

    #[error("weight must be positive, got {0}")]
    NonPositiveWeight(f64),

    #[error("unknown event type: {0}")]
    UnknownType(String),
}

impl From<serde_json::Error> for ReputationError {
    fn from(err: serde_json::Error) -> Self {
        ReputationError::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for ReputationError {
    fn from(err: anyhow::Error) -> Self {
        ReputationError::Internal(err.to_string())
    }
}
