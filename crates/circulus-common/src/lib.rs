//! # Circulus Common
//!
//! Shared types and errors for the Circulus reputation engine.
//!
//! ## Core Types
//!
//! - [`Role`]: marketplace role of a participant (supplier, collector, processor, buyer)
//! - [`EntityMetrics`]: immutable snapshot of an entity's behavioral counters
//! - [`ReputationEvent`]: append-only record of an observed outcome
//! - [`ReputationScore`]: 0-100 composite score with its component breakdown
//!
//! ## Errors
//!
//! - [`ReputationError`]: unified error type, with [`EventError`] for ingest validation

pub mod error;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{EventError, ReputationError, Result};
pub use types::{
    entity::Role,
    event::{EventType, NewEvent, ReputationEvent},
    metrics::EntityMetrics,
    reputation_score::{clamp_score, ReputationScore, ScoreComponents, Trigger},
};

/// Circulus version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum score value for components and the overall score
pub const MAX_SCORE: f64 = 100.0;

/// Minimum score value for components and the overall score
pub const MIN_SCORE: f64 = 0.0;

/// Default event lookback window in days
pub const DEFAULT_LOOKBACK_DAYS: i64 = 90;

/// Overall score below which a `low_reputation` alert fires
pub const LOW_REPUTATION_THRESHOLD: u8 = 50;

/// Absolute score movement logged as significant
pub const SIGNIFICANT_CHANGE: i16 = 10;

/// Absolute score movement that raises a drop/boost alert
pub const ALERT_CHANGE: i16 = 20;
