//! In-memory append-only event log
//!
//! Events are grouped per entity; each group keeps the set of fingerprints it
//! has seen so re-submitted events are dropped at append time.

use super::{AppendOutcome, EventLog};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use circulus_common::{ReputationEvent, Result};
use dashmap::DashMap;
use std::collections::HashSet;
use tracing::debug;

#[derive(Debug, Default)]
struct EntityEvents {
    seen: HashSet<String>,
    events: Vec<ReputationEvent>,
}

/// DashMap-backed event log
#[derive(Debug, Default)]
pub struct InMemoryEventLog {
    by_entity: DashMap<String, EntityEvents>,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total events across all entities
    pub fn len(&self) -> usize {
        self.by_entity.iter().map(|e| e.events.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl EventLog for InMemoryEventLog {
    async fn append(&self, event: ReputationEvent) -> Result<AppendOutcome> {
        let mut entry = self.by_entity.entry(event.entity_id.clone()).or_default();

        if !entry.seen.insert(event.id.clone()) {
            debug!(event_id = %event.id, entity = %event.entity_id, "Duplicate event ignored");
            return Ok(AppendOutcome::Duplicate(event.id));
        }

        let id = event.id.clone();
        entry.events.push(event);
        Ok(AppendOutcome::Recorded(id))
    }

    async fn read_window(&self, entity_id: &str, since: DateTime<Utc>) -> Result<Vec<ReputationEvent>> {
        let mut window: Vec<ReputationEvent> = self
            .by_entity
            .get(entity_id)
            .map(|entry| {
                entry
                    .events
                    .iter()
                    .filter(|e| e.timestamp > since)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        window.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));
        Ok(window)
    }
}
