//! Score persistence port
//!
//! The latest score per entity is replaced as a whole by a versioned upsert;
//! every persisted record is also appended to the entity's history.

pub mod memory;

pub use memory::InMemoryScoreStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use circulus_common::{ReputationScore, Result};
use serde::Deserialize;

/// Time range filter for history queries
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryRange {
    /// Inclusive lower bound on `updated_at`
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `updated_at`
    pub to: Option<DateTime<Utc>>,
    /// Keep only the newest `limit` records
    pub limit: Option<usize>,
}

impl HistoryRange {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| at >= from) && self.to.map_or(true, |to| at < to)
    }
}

/// Persistent store of computed scores
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScoreStore: Send + Sync {
    /// Latest persisted score, if any
    async fn latest(&self, entity_id: &str) -> Result<Option<ReputationScore>>;

    /// Persisted scores within `range`, oldest first
    async fn history(&self, entity_id: &str, range: &HistoryRange) -> Result<Vec<ReputationScore>>;

    /// Store `score` as the new latest. `score.version` must be exactly one
    /// past the current latest version (1 for a first score); anything else
    /// is a write conflict and nothing is stored.
    async fn persist(&self, score: ReputationScore) -> Result<ReputationScore>;
}
