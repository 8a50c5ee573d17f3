//! EntityMetrics - behavioral counters for one entity
//!
//! Produced by the upstream transaction, quality, dispute and payment
//! subsystems. The engine takes a fresh snapshot per computation and never
//! mutates it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregate counters for an entity over its history
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMetrics {
    /// Deliveries completed
    pub total_deliveries: u64,
    /// Deliveries completed within the agreed window
    pub on_time_deliveries: u64,
    /// Quality inspections performed
    pub quality_checks: u64,
    /// Quality inspections passed
    pub quality_passes: u64,
    /// Batches processed under the sustainable handling protocol
    pub sustainable_batches: u64,
    /// Batches processed overall
    pub total_batches: u64,
    /// Disputes opened against the entity
    pub disputes: u64,
    /// Disputes that reached resolution
    pub resolved_disputes: u64,
    /// Payments settled late
    pub payment_delays: u64,
    /// Last recorded activity, `None` if the entity was never active
    pub last_active: Option<DateTime<Utc>>,
}

impl EntityMetrics {
    /// Zero-activity snapshot for an entity with no history
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether any counter is non-zero
    pub fn has_activity(&self) -> bool {
        self.total_deliveries > 0
            || self.quality_checks > 0
            || self.total_batches > 0
            || self.disputes > 0
            || self.payment_delays > 0
    }

    /// Fractional days elapsed since last activity
    pub fn days_since_active(&self, now: DateTime<Utc>) -> Option<f64> {
        self.last_active
            .map(|last| (now - last).num_milliseconds().max(0) as f64 / 86_400_000.0)
    }
}
