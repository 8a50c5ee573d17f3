//! Scoring pipeline
//!
//! Pure, synchronous transform from (role, metrics, event window, now) to a
//! score record:
//!
//! ```text
//! EntityMetrics ──► components ──► adjuster ──► weights ──► overall
//!                                     ▲              │
//!                 event window ───────┴──► explain ◄─┘
//! ```

pub mod adjuster;
pub mod components;
pub mod explain;
pub mod params;
pub mod weights;

pub use params::{Amplification, ColdStartDefaults, DecayStep, ScoringParams};
pub use weights::{RoleWeights, WeightProfiles};

use chrono::{DateTime, Utc};
use circulus_common::{EntityMetrics, ReputationEvent, ReputationScore, Role, Trigger};

/// Everything one computation reads
#[derive(Debug, Clone, Copy)]
pub struct ScoreInputs<'a> {
    pub entity_id: &'a str,
    pub role: Role,
    pub metrics: &'a EntityMetrics,
    pub events: &'a [ReputationEvent],
    pub now: DateTime<Utc>,
}

/// Compute an unpersisted score record (version 0)
pub fn compute_score(
    inputs: ScoreInputs<'_>,
    params: &ScoringParams,
    trigger: Trigger,
) -> ReputationScore {
    let base = components::calculate_components(inputs.metrics, params);
    let adjusted = adjuster::apply_events(base, inputs.events, params, inputs.now);
    let overall = weights::overall_score(&adjusted, params.weights.for_role(inputs.role));
    let explanations = explain::explain(&adjusted, inputs.metrics, inputs.events, inputs.now);

    ReputationScore {
        entity_id: inputs.entity_id.to_string(),
        entity_type: inputs.role,
        overall_score: overall,
        components: adjusted,
        explanations,
        updated_at: inputs.now,
        version: 0,
        trigger,
        params_version: params.version,
        events_considered: inputs.events.len(),
    }
}
