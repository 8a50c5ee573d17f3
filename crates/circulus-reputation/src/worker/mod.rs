//! Recompute worker
//!
//! Jobs arrive on a bounded queue from the scheduled sweep, from event ingest
//! and from manual requests. The pool pulls them in batches and runs a
//! bounded number concurrently against the engine; transient failures are
//! retried with a fixed delay.

pub mod pool;

pub use pool::{RecomputeWorker, WorkerHandle};

use chrono::{DateTime, Utc};
use circulus_common::Trigger;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use uuid::Uuid;

/// Worker pool configuration
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Name reported in status and logs
    pub name: String,
    /// Maximum jobs pulled off the queue per batch
    pub batch_size: usize,
    /// Maximum recomputations in flight
    pub concurrency: usize,
    /// Attempts per job before it is counted as failed
    pub max_retries: u32,
    /// Delay between attempts
    pub retry_delay: Duration,
    /// Queue capacity
    pub queue_capacity: usize,
    /// Status log interval
    pub heartbeat_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            name: "reputation-recompute".to_string(),
            batch_size: 20,
            concurrency: 5,
            max_retries: 3,
            retry_delay: Duration::from_secs(5),
            queue_capacity: 1024,
            heartbeat_interval: Duration::from_secs(30),
        }
    }
}

/// A queued recomputation
#[derive(Debug, Clone, Serialize)]
pub struct RecomputeJob {
    pub id: Uuid,
    pub entity_id: String,
    pub trigger: Trigger,
    /// Attempts made so far
    pub attempts: u32,
    pub enqueued_at: DateTime<Utc>,
}

impl RecomputeJob {
    pub fn new(entity_id: impl Into<String>, trigger: Trigger) -> Self {
        Self {
            id: Uuid::now_v7(),
            entity_id: entity_id.into(),
            trigger,
            attempts: 0,
            enqueued_at: Utc::now(),
        }
    }
}

/// Pool health
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy,
    /// The most recently finished job exhausted its attempts
    Degraded,
}

/// Snapshot reported by the status endpoint and the heartbeat
#[derive(Debug, Clone, Serialize)]
pub struct WorkerStatus {
    pub name: String,
    pub status: HealthState,
    pub queue_depth: usize,
    pub avg_latency_ms: f64,
    pub last_heartbeat: DateTime<Utc>,
    pub processed: u64,
    pub failed: u64,
    pub retried: u64,
    pub error_rate: f64,
}

/// Counters shared between the pool and its handles
#[derive(Debug)]
pub struct WorkerStats {
    processed: AtomicU64,
    failed: AtomicU64,
    retried: AtomicU64,
    total_latency_ms: AtomicU64,
    degraded: AtomicBool,
    last_heartbeat: RwLock<DateTime<Utc>>,
}

impl Default for WorkerStats {
    fn default() -> Self {
        Self {
            processed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            retried: AtomicU64::new(0),
            total_latency_ms: AtomicU64::new(0),
            degraded: AtomicBool::new(false),
            last_heartbeat: RwLock::new(Utc::now()),
        }
    }
}

impl WorkerStats {
    pub(crate) fn record_success(&self, latency: Duration) {
        self.processed.fetch_add(1, Ordering::Relaxed);
        self.total_latency_ms
            .fetch_add(latency.as_millis() as u64, Ordering::Relaxed);
        self.degraded.store(false, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.degraded.store(true, Ordering::Relaxed);
    }

    pub(crate) fn record_retry(&self) {
        self.retried.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn heartbeat(&self) {
        *self.last_heartbeat.write() = Utc::now();
    }

    pub fn snapshot(&self, name: &str, queue_depth: usize) -> WorkerStatus {
        let processed = self.processed.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        let total_latency = self.total_latency_ms.load(Ordering::Relaxed);

        let avg_latency_ms = if processed > 0 {
            total_latency as f64 / processed as f64
        } else {
            0.0
        };
        let error_rate = if processed + failed > 0 {
            failed as f64 / (processed + failed) as f64
        } else {
            0.0
        };

        WorkerStatus {
            name: name.to_string(),
            status: if self.degraded.load(Ordering::Relaxed) {
                HealthState::Degraded
            } else {
                HealthState::Healthy
            },
            queue_depth,
            avg_latency_ms,
            last_heartbeat: *self.last_heartbeat.read(),
            processed,
            failed,
            retried: self.retried.load(Ordering::Relaxed),
            error_rate,
        }
    }
}
