//! Reputation service configuration

use crate::scoring::ScoringParams;
use crate::worker::WorkerConfig;
use circulus_common::ReputationError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Reputation service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReputationServiceConfig {
    /// Service host
    pub host: String,
    /// Service port
    pub port: u16,
    /// Scoring parameter configuration
    pub scoring: ScoringSettings,
    /// Recompute worker configuration
    pub worker: WorkerSettings,
    /// Engine configuration
    pub engine: EngineSettings,
    /// Seeded demo entities registered at startup; 0 disables seeding
    pub demo_entities: usize,
    /// Seed for the demo fixture generator
    pub demo_seed: u64,
}

impl Default for ReputationServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8090,
            scoring: ScoringSettings::default(),
            worker: WorkerSettings::default(),
            engine: EngineSettings::default(),
            demo_entities: 0,
            demo_seed: 42,
        }
    }
}

impl ReputationServiceConfig {
    /// Load configuration from `.env` and the process environment
    pub fn load() -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();
        Ok(Self::from_lookup(|key| std::env::var(key).ok()))
    }

    /// Build a configuration from defaults overridden by `lookup`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        // Platform PORT first, CIRCULUS_PORT wins if both are set
        if let Some(p) = parse_var(&lookup, "PORT") {
            cfg.port = p;
        }
        if let Some(host) = lookup("CIRCULUS_HOST") {
            cfg.host = host;
        }
        if let Some(p) = parse_var(&lookup, "CIRCULUS_PORT") {
            cfg.port = p;
        }

        // Scoring
        if let Some(path) = lookup("CIRCULUS_SCORING_PARAMS_PATH") {
            cfg.scoring.params_path = Some(path);
        }
        if let Some(v) = parse_var(&lookup, "CIRCULUS_SCORING_LOOKBACK_DAYS") {
            cfg.scoring.lookback_days = Some(v);
        }
        if let Some(v) = parse_var(&lookup, "CIRCULUS_SCORING_SUSTAINABLE_COLD_START") {
            cfg.scoring.sustainable_cold_start = Some(v);
        }

        // Worker
        if let Some(v) = parse_var(&lookup, "CIRCULUS_WORKER_BATCH_SIZE") {
            cfg.worker.batch_size = v;
        }
        if let Some(v) = parse_var(&lookup, "CIRCULUS_WORKER_CONCURRENCY") {
            cfg.worker.concurrency = v;
        }
        if let Some(v) = parse_var(&lookup, "CIRCULUS_WORKER_MAX_RETRIES") {
            cfg.worker.max_retries = v;
        }
        if let Some(v) = parse_var(&lookup, "CIRCULUS_WORKER_RETRY_DELAY_MS") {
            cfg.worker.retry_delay_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "CIRCULUS_WORKER_QUEUE_CAPACITY") {
            cfg.worker.queue_capacity = v;
        }

        // Engine
        if let Some(v) = parse_var(&lookup, "CIRCULUS_ENGINE_COMPUTE_TIMEOUT_MS") {
            cfg.engine.compute_timeout_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "CIRCULUS_ENGINE_AUTO_RECOMPUTE") {
            cfg.engine.auto_recompute_on_event = v;
        }
        if let Some(v) = parse_var(&lookup, "CIRCULUS_ENGINE_SWEEP_INTERVAL_SECS") {
            cfg.engine.sweep_interval_secs = v;
        }

        // Demo data
        if let Some(v) = parse_var(&lookup, "CIRCULUS_DEMO_ENTITIES") {
            cfg.demo_entities = v;
        }
        if let Some(v) = parse_var(&lookup, "CIRCULUS_DEMO_SEED") {
            cfg.demo_seed = v;
        }

        cfg
    }

    /// Scoring parameters: the JSON file at `params_path` if set, otherwise
    /// the defaults, with any scalar overrides applied on top
    pub fn scoring_params(&self) -> circulus_common::Result<ScoringParams> {
        let mut params = match &self.scoring.params_path {
            Some(path) => {
                let json = std::fs::read_to_string(path).map_err(|e| {
                    ReputationError::Config(format!("cannot read scoring params {}: {}", path, e))
                })?;
                ScoringParams::from_json(&json)?
            }
            None => ScoringParams::default(),
        };
        if let Some(days) = self.scoring.lookback_days {
            params.lookback_days = days;
        }
        if let Some(value) = self.scoring.sustainable_cold_start {
            params.cold_start.sustainable_ratio = value;
        }
        params.validate()?;
        Ok(params)
    }

    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            batch_size: self.worker.batch_size,
            concurrency: self.worker.concurrency,
            max_retries: self.worker.max_retries,
            retry_delay: Duration::from_millis(self.worker.retry_delay_ms),
            queue_capacity: self.worker.queue_capacity,
            heartbeat_interval: Duration::from_secs(self.worker.heartbeat_secs),
            ..WorkerConfig::default()
        }
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse().ok())
}

/// Scoring parameter settings; unset fields keep the parameter set's value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoringSettings {
    /// Optional JSON file holding a full parameter set
    pub params_path: Option<String>,
    /// Event window length in days
    pub lookback_days: Option<i64>,
    /// Sustainable-ratio component for an entity with no batches
    pub sustainable_cold_start: Option<f64>,
}

/// Recompute worker settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSettings {
    pub batch_size: usize,
    pub concurrency: usize,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub queue_capacity: usize,
    pub heartbeat_secs: u64,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            batch_size: 20,
            concurrency: 5,
            max_retries: 3,
            retry_delay_ms: 5000,
            queue_capacity: 1024,
            heartbeat_secs: 30,
        }
    }
}

/// Engine and scheduling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Deadline for fetching one computation's inputs
    pub compute_timeout_ms: u64,
    /// Queue an event-triggered recompute for every new event
    pub auto_recompute_on_event: bool,
    /// Scheduled sweep period; 0 disables the sweep
    pub sweep_interval_secs: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            compute_timeout_ms: 10_000,
            auto_recompute_on_event: true,
            sweep_interval_secs: 3600,
        }
    }
}
