//! Deterministic fixture generator
//!
//! Seeded generator for demo data, tests and benchmarks. The scoring path
//! never draws random numbers; only fixtures do, and the same seed always
//! yields the same entities, metrics and events.

use super::{EventLog, InMemoryDirectory, InMemoryMetricsSource};
use chrono::{DateTime, Duration, Utc};
use circulus_common::{EntityMetrics, EventType, NewEvent, ReputationEvent, Result, Role};
use rand::{rngs::StdRng, Rng, SeedableRng};

const EVENT_TYPES: [EventType; 4] = [
    EventType::Delivery,
    EventType::Quality,
    EventType::SustainableBatch,
    EventType::Payment,
];

/// Seeded source of realistic-looking marketplace activity
pub struct FixtureGenerator {
    rng: StdRng,
}

impl FixtureGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Counters for an established participant, last active within 30 days of `now`
    pub fn metrics(&mut self, now: DateTime<Utc>) -> EntityMetrics {
        let total_deliveries = self.rng.gen_range(50..150);
        let quality_checks = self.rng.gen_range(30..110);
        let total_batches = self.rng.gen_range(50..150);
        let disputes = self.rng.gen_range(0..5);

        EntityMetrics {
            total_deliveries,
            on_time_deliveries: self.rng.gen_range(40..=total_deliveries),
            quality_checks,
            quality_passes: self.rng.gen_range(25.min(quality_checks)..=quality_checks),
            sustainable_batches: self.rng.gen_range(10..40),
            total_batches,
            disputes,
            resolved_disputes: self.rng.gen_range(0..=disputes),
            payment_delays: self.rng.gen_range(0..10),
            last_active: Some(now - Duration::minutes(self.rng.gen_range(0..30 * 24 * 60))),
        }
    }

    /// `count` events spread over the last 30 days; about one in five is negative
    pub fn events(&mut self, entity_id: &str, count: usize, now: DateTime<Utc>) -> Vec<ReputationEvent> {
        (0..count)
            .filter_map(|_| {
                let event_type = EVENT_TYPES[self.rng.gen_range(0..EVENT_TYPES.len())];
                let impact = if self.rng.gen_bool(0.2) {
                    -0.5
                } else {
                    self.rng.gen_range(0.0..=1.0)
                };
                let weight = if event_type == EventType::SustainableBatch { 2.0 } else { 1.0 };
                let age = Duration::minutes(self.rng.gen_range(0..30 * 24 * 60));
                NewEvent::new(entity_id, event_type, impact, weight, now - age)
                    .seal()
                    .ok()
            })
            .collect()
    }

    pub fn role(&mut self) -> Role {
        Role::ALL[self.rng.gen_range(0..Role::ALL.len())]
    }

    /// Register `count` entities with roles, metrics and events
    pub async fn populate(
        &mut self,
        count: usize,
        directory: &InMemoryDirectory,
        metrics: &InMemoryMetricsSource,
        events: &dyn EventLog,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>> {
        let mut ids = Vec::with_capacity(count);
        for i in 0..count {
            let role = self.role();
            let entity_id = format!("ent-{:04}", i);
            directory.register(entity_id.clone(), role);
            metrics.set(entity_id.clone(), self.metrics(now));

            let n = self.rng.gen_range(5..15);
            for event in self.events(&entity_id, n, now) {
                events.append(event).await?;
            }
            ids.push(entity_id);
        }
        Ok(ids)
    }
}
