//! In-memory score store
//!
//! Each entity has one record holding an `Arc` to its latest score and the
//! append-only history. Upserts swap the `Arc` under the DashMap shard lock,
//! so readers only ever observe complete records.

use super::{HistoryRange, ScoreStore};
use async_trait::async_trait;
use circulus_common::{ReputationError, ReputationScore, Result};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug)]
struct EntityRecord {
    latest: Arc<ReputationScore>,
    history: Vec<Arc<ReputationScore>>,
}

/// DashMap-backed versioned score store
#[derive(Debug, Default)]
pub struct InMemoryScoreStore {
    records: DashMap<String, EntityRecord>,
}

impl InMemoryScoreStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entities with at least one score
    pub fn entity_count(&self) -> usize {
        self.records.len()
    }
}

#[async_trait]
impl ScoreStore for InMemoryScoreStore {
    async fn latest(&self, entity_id: &str) -> Result<Option<ReputationScore>> {
        Ok(self
            .records
            .get(entity_id)
            .map(|r| r.latest.as_ref().clone()))
    }

    async fn history(&self, entity_id: &str, range: &HistoryRange) -> Result<Vec<ReputationScore>> {
        let mut scores: Vec<ReputationScore> = self
            .records
            .get(entity_id)
            .map(|r| {
                r.history
                    .iter()
                    .filter(|s| range.contains(s.updated_at))
                    .map(|s| s.as_ref().clone())
                    .collect()
            })
            .unwrap_or_default();

        if let Some(limit) = range.limit {
            let skip = scores.len().saturating_sub(limit);
            scores.drain(..skip);
        }
        Ok(scores)
    }

    async fn persist(&self, score: ReputationScore) -> Result<ReputationScore> {
        let score = Arc::new(score);

        match self.records.entry(score.entity_id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(mut occupied) => {
                let record = occupied.get_mut();
                let expected = record.latest.version + 1;
                if score.version != expected {
                    return Err(ReputationError::Persist(format!(
                        "version conflict for {}: expected {}, got {}",
                        score.entity_id, expected, score.version
                    )));
                }
                record.history.push(score.clone());
                record.latest = score.clone();
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                if score.version != 1 {
                    return Err(ReputationError::Persist(format!(
                        "version conflict for {}: expected 1, got {}",
                        score.entity_id, score.version
                    )));
                }
                vacant.insert(EntityRecord {
                    latest: score.clone(),
                    history: vec![score.clone()],
                });
            }
        }

        debug!(entity = %score.entity_id, version = score.version, "Score persisted");
        Ok(score.as_ref().clone())
    }
}
