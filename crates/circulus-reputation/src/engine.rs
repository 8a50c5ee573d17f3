//! Reputation engine
//!
//! Coordinates one recomputation:
//! 1. Resolves the entity's role from the directory
//! 2. Reads the previous score
//! 3. Fetches metrics and the event window
//! 4. Runs the scoring pipeline
//! 5. Persists the new score as a versioned upsert
//! 6. Compares against the previous score and publishes alerts
//!
//! Steps 1-6 run under a per-entity lock so the read-compare-persist sequence
//! for one entity never interleaves with another computation for the same
//! entity. Different entities never contend. Steps 1-5 share one deadline;
//! each alert publish gets its own.

use crate::alerts::{assess_change, Alert, AlertSink};
use crate::scoring::{self, ScoreInputs, ScoringParams};
use crate::sources::{AppendOutcome, EntityDirectory, EventLog, MetricsSource};
use crate::store::{HistoryRange, ScoreStore};
use crate::telemetry::ReputationMetrics;
use chrono::{DateTime, Utc};
use circulus_common::{
    EntityMetrics, NewEvent, ReputationError, ReputationEvent, ReputationScore, Result, Role, Trigger,
};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument, warn};

/// Default deadline for reading inputs and persisting one computation
pub const DEFAULT_COMPUTE_TIMEOUT: Duration = Duration::from_secs(10);

/// External collaborators the engine reads from and writes to
#[derive(Clone)]
pub struct EnginePorts {
    pub metrics: Arc<dyn MetricsSource>,
    pub events: Arc<dyn EventLog>,
    pub directory: Arc<dyn EntityDirectory>,
    pub store: Arc<dyn ScoreStore>,
    pub alerts: Arc<dyn AlertSink>,
}

/// Reputation engine
pub struct ReputationEngine {
    params: Arc<ScoringParams>,
    ports: EnginePorts,
    compute_timeout: Duration,
    /// One async mutex per entity with a computation in flight
    locks: DashMap<String, Arc<Mutex<()>>>,
    telemetry: Option<Arc<ReputationMetrics>>,
}

impl ReputationEngine {
    /// Create an engine; fails if `params` is not a valid parameter set
    pub fn new(params: ScoringParams, ports: EnginePorts) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params: Arc::new(params),
            ports,
            compute_timeout: DEFAULT_COMPUTE_TIMEOUT,
            locks: DashMap::new(),
            telemetry: None,
        })
    }

    /// Set the per-computation deadline
    pub fn with_compute_timeout(mut self, timeout: Duration) -> Self {
        self.compute_timeout = timeout;
        self
    }

    /// Attach Prometheus metrics
    pub fn with_telemetry(mut self, telemetry: Arc<ReputationMetrics>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    pub fn params(&self) -> &ScoringParams {
        &self.params
    }

    /// Validate and append an event from an upstream subsystem
    #[instrument(skip(self, event), fields(entity = %event.entity_id, event_type = %event.event_type))]
    pub async fn record_event(&self, event: NewEvent) -> Result<AppendOutcome> {
        let sealed = match event.seal() {
            Ok(sealed) => sealed,
            Err(e) => {
                warn!(error = %e, "Rejected reputation event");
                if let Some(t) = &self.telemetry {
                    t.events_rejected_total.inc();
                }
                return Err(e.into());
            }
        };

        let outcome = self.ports.events.append(sealed).await?;
        if let Some(t) = &self.telemetry {
            match outcome {
                AppendOutcome::Recorded(_) => t.events_recorded_total.inc(),
                AppendOutcome::Duplicate(_) => t.events_duplicate_total.inc(),
            }
        }
        debug!(event_id = %outcome.event_id(), new = outcome.is_new(), "Reputation event ingested");
        Ok(outcome)
    }

    /// Recompute an entity's score now
    pub async fn recompute(&self, entity_id: &str, trigger: Trigger) -> Result<ReputationScore> {
        self.recompute_at(entity_id, trigger, Utc::now()).await
    }

    /// Recompute an entity's score as of `now`
    #[instrument(skip_all, fields(entity = %entity_id, trigger = %trigger))]
    pub async fn recompute_at(
        &self,
        entity_id: &str,
        trigger: Trigger,
        now: DateTime<Utc>,
    ) -> Result<ReputationScore> {
        let started = Instant::now();

        let result = {
            let slot = EntityLock::new(&self.locks, entity_id);
            let _held = slot.lock().await;
            self.recompute_locked(entity_id, trigger, now).await
        };

        if let Some(t) = &self.telemetry {
            t.recompute_duration_seconds
                .observe(started.elapsed().as_secs_f64());
            match &result {
                Ok(_) => t
                    .recomputations_total
                    .with_label_values(&[&trigger.to_string()])
                    .inc(),
                Err(_) => t.recompute_failures_total.inc(),
            }
        }
        if let Err(e) = &result {
            warn!(error = %e, "Reputation recompute failed");
        }
        result
    }

    async fn recompute_locked(
        &self,
        entity_id: &str,
        trigger: Trigger,
        now: DateTime<Utc>,
    ) -> Result<ReputationScore> {
        let deadline = tokio::time::Instant::now() + self.compute_timeout;

        let Inputs {
            role,
            previous,
            metrics,
            events,
        } = tokio::time::timeout_at(deadline, self.gather_inputs(entity_id, now))
            .await
            .map_err(|_| self.timed_out(entity_id, "inputs"))??;

        let mut score = scoring::compute_score(
            ScoreInputs {
                entity_id,
                role,
                metrics: &metrics,
                events: &events,
                now,
            },
            &self.params,
            trigger,
        );
        score.version = previous.as_ref().map_or(0, |p| p.version) + 1;

        let persisted = tokio::time::timeout_at(deadline, self.ports.store.persist(score))
            .await
            .map_err(|_| self.timed_out(entity_id, "persist"))?
            .map_err(|e| match e {
                ReputationError::Persist(_) => e,
                other => ReputationError::Persist(other.to_string()),
            })?;

        info!(
            role = %persisted.entity_type,
            score = persisted.overall_score,
            version = persisted.version,
            events = persisted.events_considered,
            "Reputation recomputed"
        );

        let assessment = assess_change(previous.as_ref(), &persisted);
        if assessment.significant {
            info!(delta = ?assessment.delta, score = persisted.overall_score, "Significant reputation change");
        }
        for alert in assessment.alerts {
            self.publish_alert(alert).await;
        }

        Ok(persisted)
    }

    /// Role, previous score, metrics and the event window. Events stamped
    /// after `now` stay in the window and fold in at age 0.
    async fn gather_inputs(&self, entity_id: &str, now: DateTime<Utc>) -> Result<Inputs> {
        let role = self
            .ports
            .directory
            .resolve_role(entity_id)
            .await?
            .ok_or_else(|| ReputationError::UnresolvedRole {
                entity_id: entity_id.to_string(),
            })?;

        let since = now - chrono::Duration::days(self.params.lookback_days);
        let (previous, metrics, events) = tokio::try_join!(
            self.ports.store.latest(entity_id),
            self.ports.metrics.fetch_metrics(entity_id),
            self.ports.events.read_window(entity_id, since),
        )?;

        Ok(Inputs {
            role,
            previous,
            metrics,
            events,
        })
    }

    fn timed_out(&self, entity_id: &str, stage: &str) -> ReputationError {
        ReputationError::Timeout(format!(
            "{} for {} not done within {}ms",
            stage,
            entity_id,
            self.compute_timeout.as_millis()
        ))
    }

    async fn publish_alert(&self, alert: Alert) {
        let alert_type = alert.alert_type;
        if let Some(t) = &self.telemetry {
            t.alerts_total.with_label_values(&[alert_type.as_str()]).inc();
        }
        let failure = match tokio::time::timeout(self.compute_timeout, self.ports.alerts.publish(alert)).await {
            Ok(Ok(())) => return,
            Ok(Err(e)) => e.to_string(),
            Err(_) => "timed out".to_string(),
        };
        warn!(alert_type = %alert_type, error = %failure, "Alert publish failed");
        if let Some(t) = &self.telemetry {
            t.alert_publish_failures_total.inc();
        }
    }

    /// Latest persisted score
    pub async fn latest_score(&self, entity_id: &str) -> Result<ReputationScore> {
        self.ports
            .store
            .latest(entity_id)
            .await?
            .ok_or_else(|| ReputationError::NotFound(format!("no score for {}", entity_id)))
    }

    /// Persisted scores within `range`, oldest first
    pub async fn score_history(&self, entity_id: &str, range: &HistoryRange) -> Result<Vec<ReputationScore>> {
        self.ports.store.history(entity_id, range).await
    }

    /// Entities known to the directory
    pub async fn known_entities(&self) -> Result<Vec<String>> {
        self.ports.directory.list_entities().await
    }

    /// Entities with a computation currently holding their lock
    pub fn in_flight(&self) -> usize {
        self.locks.len()
    }
}

struct Inputs {
    role: Role,
    previous: Option<ReputationScore>,
    metrics: EntityMetrics,
    events: Vec<ReputationEvent>,
}

/// Handle on an entity's mutex; the map entry goes away with the last handle,
/// including when the computation is cancelled while waiting
struct EntityLock<'a> {
    locks: &'a DashMap<String, Arc<Mutex<()>>>,
    entity_id: &'a str,
    lock: Arc<Mutex<()>>,
}

impl<'a> EntityLock<'a> {
    fn new(locks: &'a DashMap<String, Arc<Mutex<()>>>, entity_id: &'a str) -> Self {
        let lock = locks
            .entry(entity_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        Self {
            locks,
            entity_id,
            lock,
        }
    }

    async fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().await
    }
}

impl Drop for EntityLock<'_> {
    fn drop(&mut self) {
        // Map entry plus this handle
        self.locks
            .remove_if(self.entity_id, |_, lock| Arc::strong_count(lock) == 2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::sink::MockAlertSink;
    use crate::alerts::TracingAlertSink;
    use crate::sources::{InMemoryDirectory, InMemoryEventLog, InMemoryMetricsSource, MockMetricsSource};
    use crate::store::{InMemoryScoreStore, MockScoreStore};
    use async_trait::async_trait;
    use circulus_common::{EventType, Role};

    struct Fixture {
        directory: Arc<InMemoryDirectory>,
        metrics: Arc<InMemoryMetricsSource>,
        events: Arc<InMemoryEventLog>,
        store: Arc<InMemoryScoreStore>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                directory: Arc::new(InMemoryDirectory::new()),
                metrics: Arc::new(InMemoryMetricsSource::new()),
                events: Arc::new(InMemoryEventLog::new()),
                store: Arc::new(InMemoryScoreStore::new()),
            }
        }

        fn ports(&self, alerts: Arc<dyn AlertSink>) -> EnginePorts {
            EnginePorts {
                metrics: self.metrics.clone(),
                events: self.events.clone(),
                directory: self.directory.clone(),
                store: self.store.clone(),
                alerts,
            }
        }
    }

    #[tokio::test]
    async fn test_unknown_entity_is_unresolved() {
        let fx = Fixture::new();
        let engine = ReputationEngine::new(ScoringParams::default(), fx.ports(Arc::new(TracingAlertSink))).unwrap();

        let err = engine.recompute("ghost", Trigger::Manual).await.unwrap_err();
        assert!(matches!(err, ReputationError::UnresolvedRole { .. }));
        assert!(fx.store.latest("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_persist_failure_stores_nothing_and_raises_no_alert() {
        let fx = Fixture::new();
        fx.directory.register("sup-1", Role::Supplier);

        let mut store = MockScoreStore::new();
        store.expect_latest().returning(|_| Ok(None));
        store
            .expect_persist()
            .returning(|_| Err(ReputationError::DataUnavailable("disk full".into())));

        let mut sink = MockAlertSink::new();
        sink.expect_publish().times(0);

        let mut ports = fx.ports(Arc::new(sink));
        ports.store = Arc::new(store);
        let engine = ReputationEngine::new(ScoringParams::default(), ports).unwrap();

        let err = engine.recompute("sup-1", Trigger::Manual).await.unwrap_err();
        assert!(matches!(err, ReputationError::Persist(_)));
    }

    #[tokio::test]
    async fn test_alert_failure_does_not_block_persist() {
        let fx = Fixture::new();
        fx.directory.register("sup-1", Role::Supplier);

        let mut sink = MockAlertSink::new();
        sink.expect_publish()
            .times(1)
            .returning(|_| Err(ReputationError::Internal("broker down".into())));

        let engine = ReputationEngine::new(ScoringParams::default(), fx.ports(Arc::new(sink))).unwrap();

        // New supplier scores 45, which raises low_reputation
        let score = engine.recompute("sup-1", Trigger::Manual).await.unwrap();
        assert_eq!(score.overall_score, 45);
        assert_eq!(engine.latest_score("sup-1").await.unwrap().version, 1);
    }

    #[tokio::test]
    async fn test_metrics_outage_is_data_unavailable() {
        let fx = Fixture::new();
        fx.directory.register("col-1", Role::Collector);

        let mut metrics = MockMetricsSource::new();
        metrics
            .expect_fetch_metrics()
            .returning(|_| Err(ReputationError::DataUnavailable("ledger offline".into())));

        let mut ports = fx.ports(Arc::new(TracingAlertSink));
        ports.metrics = Arc::new(metrics);
        let engine = ReputationEngine::new(ScoringParams::default(), ports).unwrap();

        let err = engine.recompute("col-1", Trigger::Scheduled).await.unwrap_err();
        assert!(matches!(err, ReputationError::DataUnavailable(_)));
        assert!(fx.store.latest("col-1").await.unwrap().is_none());
    }

    struct SlowMetrics;

    #[async_trait]
    impl MetricsSource for SlowMetrics {
        async fn fetch_metrics(&self, _entity_id: &str) -> Result<EntityMetrics> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(EntityMetrics::empty())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_discards_computation() {
        let fx = Fixture::new();
        fx.directory.register("proc-1", Role::Processor);

        let mut ports = fx.ports(Arc::new(TracingAlertSink));
        ports.metrics = Arc::new(SlowMetrics);
        let engine = ReputationEngine::new(ScoringParams::default(), ports)
            .unwrap()
            .with_compute_timeout(Duration::from_millis(50));

        let err = engine.recompute("proc-1", Trigger::Event).await.unwrap_err();
        assert!(matches!(err, ReputationError::Timeout(_)));
        assert!(fx.store.latest("proc-1").await.unwrap().is_none());
        assert_eq!(engine.in_flight(), 0);
    }

    struct StalledDirectory;

    #[async_trait]
    impl EntityDirectory for StalledDirectory {
        async fn resolve_role(&self, _entity_id: &str) -> Result<Option<Role>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Some(Role::Supplier))
        }

        async fn list_entities(&self) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_directory_hits_deadline() {
        let fx = Fixture::new();
        let mut ports = fx.ports(Arc::new(TracingAlertSink));
        ports.directory = Arc::new(StalledDirectory);
        let engine = ReputationEngine::new(ScoringParams::default(), ports)
            .unwrap()
            .with_compute_timeout(Duration::from_millis(50));

        let err = engine.recompute("sup-1", Trigger::Scheduled).await.unwrap_err();
        assert!(matches!(err, ReputationError::Timeout(_)));
        assert!(fx.store.latest("sup-1").await.unwrap().is_none());
        assert_eq!(engine.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_waiter_releases_lock_entry() {
        let fx = Fixture::new();
        fx.directory.register("proc-1", Role::Processor);
        let mut ports = fx.ports(Arc::new(TracingAlertSink));
        ports.metrics = Arc::new(SlowMetrics);
        let engine = Arc::new(ReputationEngine::new(ScoringParams::default(), ports).unwrap());

        let holder = tokio::spawn({
            let engine = engine.clone();
            async move { engine.recompute("proc-1", Trigger::Event).await }
        });
        tokio::task::yield_now().await;

        let mut waiter = Box::pin(engine.recompute("proc-1", Trigger::Manual));
        assert!(futures::poll!(waiter.as_mut()).is_pending());
        assert_eq!(engine.in_flight(), 1);

        // Holder finishes while the waiter still holds a handle
        let _ = holder.await.unwrap();
        assert_eq!(engine.in_flight(), 1);

        drop(waiter);
        assert_eq!(engine.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_rejected_event_never_reaches_log() {
        let fx = Fixture::new();
        let engine = ReputationEngine::new(ScoringParams::default(), fx.ports(Arc::new(TracingAlertSink))).unwrap();

        let bad = NewEvent::new("sup-1", EventType::Quality, 2.0, 1.0, Utc::now());
        let err = engine.record_event(bad).await.unwrap_err();
        assert!(matches!(err, ReputationError::InvalidEvent(_)));
        assert!(fx.events.is_empty());
    }

    #[test]
    fn test_invalid_params_rejected() {
        let fx = Fixture::new();
        let mut params = ScoringParams::default();
        params.lookback_days = 0;
        assert!(ReputationEngine::new(params, fx.ports(Arc::new(TracingAlertSink))).is_err());
    }
}
