//! Bounded recompute pool

use super::{RecomputeJob, WorkerConfig, WorkerStats, WorkerStatus};
use crate::engine::ReputationEngine;
use circulus_common::{ReputationError, Result, Trigger};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, watch, OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Cloneable handle used to enqueue jobs and read pool status
#[derive(Clone)]
pub struct WorkerHandle {
    name: Arc<str>,
    tx: mpsc::Sender<RecomputeJob>,
    stats: Arc<WorkerStats>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl WorkerHandle {
    /// Queue a recomputation; waits while the queue is full
    pub async fn enqueue(&self, entity_id: impl Into<String>, trigger: Trigger) -> Result<Uuid> {
        let job = RecomputeJob::new(entity_id, trigger);
        let id = job.id;
        self.tx
            .send(job)
            .await
            .map_err(|_| ReputationError::Internal("recompute queue closed".into()))?;
        Ok(id)
    }

    /// Jobs waiting in the queue
    pub fn queue_depth(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn status(&self) -> WorkerStatus {
        self.stats.snapshot(&self.name, self.queue_depth())
    }

    /// Stop pulling jobs; in-flight jobs run to completion, undispatched ones are dropped
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}

/// Recompute worker pool
pub struct RecomputeWorker {
    engine: Arc<ReputationEngine>,
    config: WorkerConfig,
    stats: Arc<WorkerStats>,
}

impl RecomputeWorker {
    /// Start the pool on the current runtime
    pub fn spawn(engine: Arc<ReputationEngine>, config: WorkerConfig) -> (WorkerHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let stats = Arc::new(WorkerStats::default());

        let handle = WorkerHandle {
            name: Arc::from(config.name.as_str()),
            tx,
            stats: stats.clone(),
            shutdown: Arc::new(shutdown_tx),
        };

        let worker = Self {
            engine,
            config,
            stats,
        };
        let join = tokio::spawn(worker.run(rx, shutdown_rx));

        (handle, join)
    }

    async fn run(self, mut rx: mpsc::Receiver<RecomputeJob>, mut shutdown: watch::Receiver<bool>) {
        let permits = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let batch_size = self.config.batch_size.max(1);
        let mut in_flight = JoinSet::new();

        let mut heartbeat = tokio::time::interval(self.config.heartbeat_interval);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            worker = %self.config.name,
            batch_size,
            concurrency = self.config.concurrency,
            "Recompute worker started"
        );

        // Jobs pulled from the queue but not yet holding a permit
        let mut pending: VecDeque<RecomputeJob> = VecDeque::with_capacity(batch_size);

        loop {
            tokio::select! {
                job = rx.recv(), if pending.is_empty() => {
                    let Some(first) = job else {
                        info!(worker = %self.config.name, "Recompute queue closed");
                        break;
                    };

                    pending.push_back(first);
                    while pending.len() < batch_size {
                        match rx.try_recv() {
                            Ok(job) => pending.push_back(job),
                            Err(_) => break,
                        }
                    }
                    debug!(jobs = pending.len(), "Dispatching recompute batch");
                }

                Ok(permit) = permits.clone().acquire_owned(), if !pending.is_empty() => {
                    if let Some(job) = pending.pop_front() {
                        in_flight.spawn(process_job(
                            self.engine.clone(),
                            job,
                            self.config.clone(),
                            self.stats.clone(),
                            permit,
                        ));
                    }
                }

                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "Recompute task aborted");
                    }
                }

                _ = heartbeat.tick() => {
                    self.stats.heartbeat();
                    let status = self.stats.snapshot(&self.config.name, rx.len());
                    info!(
                        worker = %status.name,
                        status = ?status.status,
                        queue_depth = status.queue_depth,
                        processed = status.processed,
                        failed = status.failed,
                        avg_latency_ms = status.avg_latency_ms,
                        "Worker heartbeat"
                    );
                }

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!(worker = %self.config.name, "Recompute worker stopping");
                        break;
                    }
                }
            }
        }

        if !pending.is_empty() {
            warn!(worker = %self.config.name, jobs = pending.len(), "Dropping undispatched recompute jobs");
        }
        while let Some(joined) = in_flight.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Recompute task aborted");
            }
        }
        info!(worker = %self.config.name, "Recompute worker stopped");
    }
}

#[instrument(skip_all, fields(job_id = %job.id, entity = %job.entity_id, trigger = %job.trigger))]
async fn process_job(
    engine: Arc<ReputationEngine>,
    mut job: RecomputeJob,
    config: WorkerConfig,
    stats: Arc<WorkerStats>,
    _permit: OwnedSemaphorePermit,
) {
    let started = Instant::now();
    loop {
        job.attempts += 1;
        match engine.recompute(&job.entity_id, job.trigger).await {
            Ok(score) => {
                stats.record_success(started.elapsed());
                debug!(
                    score = score.overall_score,
                    version = score.version,
                    attempts = job.attempts,
                    "Recompute job completed"
                );
                return;
            }
            Err(e) if e.is_transient() && job.attempts < config.max_retries => {
                stats.record_retry();
                warn!(
                    attempts = job.attempts,
                    max_retries = config.max_retries,
                    error = %e,
                    "Recompute job failed, retrying"
                );
                tokio::time::sleep(config.retry_delay).await;
            }
            Err(e) => {
                stats.record_failure();
                error!(attempts = job.attempts, error = %e, "Recompute job failed");
                return;
            }
        }
    }
}
