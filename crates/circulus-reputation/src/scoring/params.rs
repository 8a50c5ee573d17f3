//! Versioned scoring parameters
//!
//! Amplification constants, decay breakpoints, role weight profiles and the
//! cold-start defaults all live in one parameter set. Changing any of them
//! changes historical comparability, so every set carries a `version` that is
//! stamped onto each score computed with it.

use super::weights::WeightProfiles;
use circulus_common::{EventType, ReputationError, Result, DEFAULT_LOOKBACK_DAYS};
use serde::{Deserialize, Serialize};

/// Version of [`ScoringParams::default`]
pub const DEFAULT_PARAMS_VERSION: u32 = 1;

/// One step of the recency decay: events younger than `max_age_days`
/// are scaled by `multiplier`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecayStep {
    pub max_age_days: f64,
    pub multiplier: f64,
}

/// Per-event-type amplification onto the matching component
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Amplification {
    pub delivery: f64,
    pub quality: f64,
    pub sustainable_batch: f64,
    pub dispute: f64,
}

impl Default for Amplification {
    fn default() -> Self {
        Self {
            delivery: 10.0,
            quality: 15.0,
            sustainable_batch: 20.0,
            dispute: 25.0,
        }
    }
}

impl Amplification {
    /// Amplification for an event type, `None` for types without a component
    pub fn for_event(&self, event_type: EventType) -> Option<f64> {
        match event_type {
            EventType::Delivery => Some(self.delivery),
            EventType::Quality => Some(self.quality),
            EventType::SustainableBatch => Some(self.sustainable_batch),
            EventType::Dispute => Some(self.dispute),
            EventType::Payment => None,
        }
    }
}

/// Component defaults when the underlying counter has no observations
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColdStartDefaults {
    pub on_time_delivery: f64,
    pub quality_consistency: f64,
    pub sustainable_ratio: f64,
    pub dispute_free_rate: f64,
}

impl Default for ColdStartDefaults {
    fn default() -> Self {
        Self {
            on_time_delivery: 50.0,
            quality_consistency: 50.0,
            sustainable_ratio: 0.0,
            dispute_free_rate: 100.0,
        }
    }
}

/// Complete scoring parameter set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringParams {
    pub version: u32,
    /// Event window length in days
    pub lookback_days: i64,
    /// Decay steps in ascending age order
    pub decay_steps: Vec<DecayStep>,
    /// Multiplier for events older than every step
    pub decay_floor: f64,
    pub amplification: Amplification,
    /// Bonus applied to the sustainable batch ratio before capping
    pub sustainable_bonus: f64,
    pub cold_start: ColdStartDefaults,
    pub weights: WeightProfiles,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            version: DEFAULT_PARAMS_VERSION,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            decay_steps: vec![
                DecayStep { max_age_days: 7.0, multiplier: 1.0 },
                DecayStep { max_age_days: 14.0, multiplier: 0.8 },
                DecayStep { max_age_days: 30.0, multiplier: 0.6 },
                DecayStep { max_age_days: 90.0, multiplier: 0.4 },
            ],
            decay_floor: 0.2,
            amplification: Amplification::default(),
            sustainable_bonus: 1.5,
            cold_start: ColdStartDefaults::default(),
            weights: WeightProfiles::default(),
        }
    }
}

impl ScoringParams {
    /// Step-function decay factor for an event of the given age
    pub fn recency_multiplier(&self, age_days: f64) -> f64 {
        self.decay_steps
            .iter()
            .find(|step| age_days < step.max_age_days)
            .map(|step| step.multiplier)
            .unwrap_or(self.decay_floor)
    }

    /// Reject parameter sets that would break score bounds or ordering
    pub fn validate(&self) -> Result<()> {
        if self.lookback_days <= 0 {
            return Err(ReputationError::Config(format!(
                "lookback_days must be positive, got {}",
                self.lookback_days
            )));
        }

        let mut last_age = 0.0;
        let mut last_multiplier = f64::INFINITY;
        for step in &self.decay_steps {
            if step.max_age_days <= last_age {
                return Err(ReputationError::Config(
                    "decay steps must have strictly increasing ages".into(),
                ));
            }
            if !(0.0..=1.0).contains(&step.multiplier) || step.multiplier > last_multiplier {
                return Err(ReputationError::Config(
                    "decay multipliers must lie in [0, 1] and never increase with age".into(),
                ));
            }
            last_age = step.max_age_days;
            last_multiplier = step.multiplier;
        }
        if !(0.0..=last_multiplier.min(1.0)).contains(&self.decay_floor) {
            return Err(ReputationError::Config(
                "decay floor must not exceed the oldest step".into(),
            ));
        }

        if self.sustainable_bonus <= 0.0 {
            return Err(ReputationError::Config("sustainable_bonus must be positive".into()));
        }

        let defaults = [
            self.cold_start.on_time_delivery,
            self.cold_start.quality_consistency,
            self.cold_start.sustainable_ratio,
            self.cold_start.dispute_free_rate,
        ];
        if defaults.iter().any(|d| !(0.0..=100.0).contains(d)) {
            return Err(ReputationError::Config("cold-start defaults must lie in [0, 100]".into()));
        }

        self.weights.validate()
    }

    /// Parse and validate a parameter set from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let params: ScoringParams = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }
}
