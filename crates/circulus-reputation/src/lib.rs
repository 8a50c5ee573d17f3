//! # Circulus Reputation
//!
//! Trust scoring for participants of the Circulus waste-to-energy marketplace.
//!
//! Every supplier, collector, processor and buyer carries a 0-100 reputation
//! score built from four behavioral components (on-time delivery, quality
//! consistency, sustainable loop participation, dispute-free rate), adjusted by
//! recency-weighted events and weighted by the entity's role.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                    ReputationService                       │
//! │  ┌────────────┐   ┌──────────────────┐   ┌──────────────┐  │
//! │  │   Ingest   │   │ RecomputeWorker  │   │    Sweep     │  │
//! │  └─────┬──────┘   └────────┬─────────┘   └──────┬───────┘  │
//! │        │                   │                    │          │
//! │  ┌─────┴───────────────────┴────────────────────┴───────┐  │
//! │  │                  ReputationEngine                     │  │
//! │  │   per-entity lock → scoring pipeline → persist →     │  │
//! │  │   change detection → alerts                          │  │
//! │  └─────┬──────────────┬──────────────┬──────────────────┘  │
//! │        │              │              │                     │
//! │  MetricsSource    EventLog     ScoreStore / AlertSink      │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! The scoring pipeline in [`scoring`] is pure and synchronous: the same
//! inputs, parameters and clock always produce the same score.

pub mod alerts;
pub mod config;
pub mod engine;
pub mod http;
pub mod scoring;
pub mod service;
pub mod sources;
pub mod store;
pub mod telemetry;
pub mod worker;

pub use alerts::{assess_change, Alert, AlertSink, AlertType, ChangeAssessment};
pub use config::ReputationServiceConfig;
pub use engine::{EnginePorts, ReputationEngine};
pub use scoring::{compute_score, ScoreInputs, ScoringParams};
pub use service::{IngestReceipt, ReputationService};
pub use sources::{AppendOutcome, EntityDirectory, EventLog, MetricsSource};
pub use store::{HistoryRange, ScoreStore};
pub use telemetry::ReputationMetrics;
pub use worker::{RecomputeWorker, WorkerConfig, WorkerHandle, WorkerStatus};
