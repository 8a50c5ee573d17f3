//! Reputation service
//!
//! Wires ingest, the recompute queue and the scheduled sweep around one
//! engine. The HTTP layer and the binary talk to this type.

use crate::engine::ReputationEngine;
use crate::worker::{WorkerHandle, WorkerStatus};
use circulus_common::{NewEvent, Result, Trigger};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Response to an ingested event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReceipt {
    pub event_id: String,
    pub duplicate: bool,
    /// Recompute job queued for the entity, if any
    pub recompute_job: Option<Uuid>,
}

/// Reputation service
pub struct ReputationService {
    engine: Arc<ReputationEngine>,
    worker: WorkerHandle,
    auto_recompute: bool,
}

impl ReputationService {
    pub fn new(engine: Arc<ReputationEngine>, worker: WorkerHandle, auto_recompute: bool) -> Self {
        Self {
            engine,
            worker,
            auto_recompute,
        }
    }

    pub fn engine(&self) -> &Arc<ReputationEngine> {
        &self.engine
    }

    pub fn worker_status(&self) -> WorkerStatus {
        self.worker.status()
    }

    /// Record an event and, if it is new, queue an event-triggered recompute
    #[instrument(skip(self, event), fields(entity = %event.entity_id))]
    pub async fn ingest(&self, event: NewEvent) -> Result<IngestReceipt> {
        let entity_id = event.entity_id.clone();
        let outcome = self.engine.record_event(event).await?;

        let recompute_job = if self.auto_recompute && outcome.is_new() {
            Some(self.worker.enqueue(entity_id, Trigger::Event).await?)
        } else {
            None
        };

        Ok(IngestReceipt {
            event_id: outcome.event_id().to_string(),
            duplicate: !outcome.is_new(),
            recompute_job,
        })
    }

    /// Queue a recompute without waiting for it
    pub async fn request_recompute(&self, entity_id: &str, trigger: Trigger) -> Result<Uuid> {
        self.worker.enqueue(entity_id, trigger).await
    }

    /// Queue a scheduled recompute for every known entity
    #[instrument(skip(self))]
    pub async fn sweep(&self) -> Result<usize> {
        let entities = self.engine.known_entities().await?;
        let count = entities.len();
        for entity_id in entities {
            self.worker.enqueue(entity_id, Trigger::Scheduled).await?;
        }
        info!(entities = count, "Scheduled sweep queued");
        Ok(count)
    }

    /// Run [`sweep`](Self::sweep) every `interval`, starting immediately
    pub fn spawn_sweeper(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if let Err(e) = self.sweep().await {
                    warn!(error = %e, "Scheduled sweep failed");
                }
                debug!(next_in_secs = interval.as_secs(), "Sweep complete");
            }
        })
    }

    /// Stop the recompute worker
    pub fn shutdown(&self) {
        self.worker.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::TracingAlertSink;
    use crate::engine::EnginePorts;
    use crate::scoring::ScoringParams;
    use crate::sources::{InMemoryDirectory, InMemoryEventLog, InMemoryMetricsSource};
    use crate::store::{InMemoryScoreStore, ScoreStore};
    use crate::worker::{RecomputeWorker, WorkerConfig};
    use chrono::Utc;
    use circulus_common::{EventType, Role};

    fn service(auto_recompute: bool) -> (ReputationService, Arc<InMemoryScoreStore>, JoinHandle<()>) {
        let directory = Arc::new(InMemoryDirectory::new());
        directory.register("col-1", Role::Collector);
        directory.register("buy-1", Role::Buyer);
        let store = Arc::new(InMemoryScoreStore::new());
        let engine = Arc::new(
            ReputationEngine::new(
                ScoringParams::default(),
                EnginePorts {
                    metrics: Arc::new(InMemoryMetricsSource::new()),
                    events: Arc::new(InMemoryEventLog::new()),
                    directory,
                    store: store.clone(),
                    alerts: Arc::new(TracingAlertSink),
                },
            )
            .unwrap(),
        );
        let (worker, join) = RecomputeWorker::spawn(engine.clone(), WorkerConfig::default());
        (ReputationService::new(engine, worker, auto_recompute), store, join)
    }

    async fn wait_processed(service: &ReputationService, jobs: u64) {
        for _ in 0..500 {
            if service.worker_status().processed >= jobs {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("worker did not process {} jobs", jobs);
    }

    #[tokio::test]
    async fn test_new_event_queues_recompute() {
        let (service, store, join) = service(true);
        let event = NewEvent::new("col-1", EventType::Delivery, 0.8, 1.0, Utc::now());

        let receipt = service.ingest(event.clone()).await.unwrap();
        assert!(!receipt.duplicate);
        assert!(receipt.recompute_job.is_some());

        let again = service.ingest(event).await.unwrap();
        assert!(again.duplicate);
        assert!(again.recompute_job.is_none());
        assert_eq!(again.event_id, receipt.event_id);

        wait_processed(&service, 1).await;
        let score = store.latest("col-1").await.unwrap().unwrap();
        assert_eq!(score.trigger, Trigger::Event);
        assert_eq!(score.events_considered, 1);

        service.shutdown();
        join.await.unwrap();
    }

    #[tokio::test]
    async fn test_auto_recompute_disabled() {
        let (service, _store, join) = service(false);
        let event = NewEvent::new("col-1", EventType::Quality, 0.4, 1.0, Utc::now());
        assert!(service.ingest(event).await.unwrap().recompute_job.is_none());

        service.shutdown();
        join.await.unwrap();
    }

    #[tokio::test]
    async fn test_sweep_covers_every_entity() {
        let (service, store, join) = service(false);
        assert_eq!(service.sweep().await.unwrap(), 2);

        wait_processed(&service, 2).await;
        assert!(store.latest("col-1").await.unwrap().is_some());
        assert!(store.latest("buy-1").await.unwrap().is_some());

        service.shutdown();
        join.await.unwrap();
    }
}
