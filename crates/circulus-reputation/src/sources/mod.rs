//! Input ports
//!
//! The engine reads metrics, events and roles through these traits. The
//! transaction/quality/dispute subsystems and the entity directory own the
//! data; adapters here only read it (and, for the event log, append to it).

pub mod event_log;
pub mod fixtures;
pub mod memory;

pub use event_log::InMemoryEventLog;
pub use fixtures::FixtureGenerator;
pub use memory::{InMemoryDirectory, InMemoryMetricsSource};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use circulus_common::{EntityMetrics, ReputationEvent, Result, Role};
use serde::Serialize;

/// Source of per-entity behavioral counters
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Counters for an entity; all-zero for an entity with no activity.
    /// Fails with `DataUnavailable` only if the backing store is unreachable.
    async fn fetch_metrics(&self, entity_id: &str) -> Result<EntityMetrics>;
}

/// Result of appending to the event log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "event_id", rename_all = "snake_case")]
pub enum AppendOutcome {
    Recorded(String),
    Duplicate(String),
}

impl AppendOutcome {
    pub fn event_id(&self) -> &str {
        match self {
            AppendOutcome::Recorded(id) | AppendOutcome::Duplicate(id) => id,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, AppendOutcome::Recorded(_))
    }
}

/// Append-only reputation event log
#[async_trait]
pub trait EventLog: Send + Sync {
    /// Append a validated event; an event with a known id is a duplicate
    async fn append(&self, event: ReputationEvent) -> Result<AppendOutcome>;

    /// Events with `timestamp > since`, newest first, without duplicates.
    /// Events stamped ahead of the reader's clock are included.
    async fn read_window(&self, entity_id: &str, since: DateTime<Utc>) -> Result<Vec<ReputationEvent>>;
}

/// Entity directory owned by the marketplace
#[async_trait]
pub trait EntityDirectory: Send + Sync {
    /// Role of an entity, `None` if the directory does not know it
    async fn resolve_role(&self, entity_id: &str) -> Result<Option<Role>>;

    /// Every known entity, for scheduled sweeps
    async fn list_entities(&self) -> Result<Vec<String>>;
}
