//! In-memory metrics source and entity directory
//!
//! Used by the standalone service and by tests. Production deployments put
//! adapters over the ledger database and the marketplace directory behind the
//! same traits.

use super::{EntityDirectory, MetricsSource};
use async_trait::async_trait;
use circulus_common::{EntityMetrics, Result, Role};
use dashmap::DashMap;

/// Metrics snapshots keyed by entity
#[derive(Debug, Default)]
pub struct InMemoryMetricsSource {
    metrics: DashMap<String, EntityMetrics>,
}

impl InMemoryMetricsSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot upstream systems report for an entity
    pub fn set(&self, entity_id: impl Into<String>, metrics: EntityMetrics) {
        self.metrics.insert(entity_id.into(), metrics);
    }
}

#[async_trait]
impl MetricsSource for InMemoryMetricsSource {
    async fn fetch_metrics(&self, entity_id: &str) -> Result<EntityMetrics> {
        Ok(self
            .metrics
            .get(entity_id)
            .map(|m| m.clone())
            .unwrap_or_else(EntityMetrics::empty))
    }
}

/// Explicit entity → role registry
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    roles: DashMap<String, Role>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, entity_id: impl Into<String>, role: Role) {
        self.roles.insert(entity_id.into(), role);
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

#[async_trait]
impl EntityDirectory for InMemoryDirectory {
    async fn resolve_role(&self, entity_id: &str) -> Result<Option<Role>> {
        Ok(self.roles.get(entity_id).map(|r| *r))
    }

    async fn list_entities(&self) -> Result<Vec<String>> {
        let mut ids: Vec<String> = self.roles.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        Ok(ids)
    }
}
