//! ReputationScore - entity trust metric (0-100)
//!
//! Each computation produces a complete new record. Records are never patched;
//! the newest persisted record is the entity's latest score and older ones
//! remain as history for trend comparison and audit.

use super::entity::Role;
use crate::{MAX_SCORE, MIN_SCORE};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Clamp a score into [0, 100]
#[inline]
pub fn clamp_score(value: f64) -> f64 {
    value.clamp(MIN_SCORE, MAX_SCORE)
}

/// Score breakdown by behavioral dimension, each in [0, 100]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponents {
    /// Share of deliveries completed on time
    pub on_time_delivery: f64,
    /// Share of quality checks passed
    pub quality_consistency: f64,
    /// Bonus-scaled share of batches on the sustainable protocol
    pub sustainable_ratio: f64,
    /// Share of deliveries without a dispute
    pub dispute_free_rate: f64,
}

impl ScoreComponents {
    pub fn new(
        on_time_delivery: f64,
        quality_consistency: f64,
        sustainable_ratio: f64,
        dispute_free_rate: f64,
    ) -> Self {
        Self {
            on_time_delivery,
            quality_consistency,
            sustainable_ratio,
            dispute_free_rate,
        }
        .clamped()
    }

    /// Copy with every component clamped into [0, 100]
    pub fn clamped(self) -> Self {
        Self {
            on_time_delivery: clamp_score(self.on_time_delivery),
            quality_consistency: clamp_score(self.quality_consistency),
            sustainable_ratio: clamp_score(self.sustainable_ratio),
            dispute_free_rate: clamp_score(self.dispute_free_rate),
        }
    }

    /// Components in profile-table order
    pub fn as_array(&self) -> [f64; 4] {
        [
            self.on_time_delivery,
            self.quality_consistency,
            self.sustainable_ratio,
            self.dispute_free_rate,
        ]
    }

    pub fn in_bounds(&self) -> bool {
        self.as_array()
            .iter()
            .all(|c| (MIN_SCORE..=MAX_SCORE).contains(c))
    }
}

/// What caused a recomputation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Scheduled,
    Event,
    Manual,
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trigger::Scheduled => write!(f, "scheduled"),
            Trigger::Event => write!(f, "event"),
            Trigger::Manual => write!(f, "manual"),
        }
    }
}

/// Entity reputation score with full breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReputationScore {
    pub entity_id: String,

    /// Role whose weight profile produced `overall_score`
    pub entity_type: Role,

    /// Composite score from 0-100
    pub overall_score: u8,

    /// Component breakdown for transparency
    pub components: ScoreComponents,

    /// Ordered rationale strings
    pub explanations: Vec<String>,

    pub updated_at: DateTime<Utc>,

    /// Per-entity sequence number, assigned when the record is persisted
    pub version: u64,

    pub trigger: Trigger,

    /// Version of the scoring parameter set used
    pub params_version: u32,

    /// Number of events in the adjustment window
    pub events_considered: usize,
}

impl ReputationScore {
    /// Signed movement relative to an earlier score
    pub fn delta_from(&self, previous: &ReputationScore) -> i16 {
        self.overall_score as i16 - previous.overall_score as i16
    }

    /// Whether the score falls under `threshold`
    pub fn is_below(&self, threshold: u8) -> bool {
        self.overall_score < threshold
    }

    /// Equality of the computed outcome, ignoring audit fields
    /// (`updated_at`, `version`, `trigger`)
    pub fn same_outcome(&self, other: &ReputationScore) -> bool {
        self.entity_id == other.entity_id
            && self.entity_type == other.entity_type
            && self.overall_score == other.overall_score
            && self.components == other.components
            && self.explanations == other.explanations
            && self.params_version == other.params_version
            && self.events_considered == other.events_considered
    }
}

impl std::fmt::Display for ReputationScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ReputationScore({} {}: {}/100, v{})",
            self.entity_type, self.entity_id, self.overall_score, self.version
        )
    }
}
