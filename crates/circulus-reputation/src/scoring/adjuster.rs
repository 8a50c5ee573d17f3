//! Recency-weighted event adjuster
//!
//! Each event nudges the component it concerns by
//! `impact_score * weight * recency * amplification`, and the component is
//! re-clamped after every single event. Because of the per-event clamp the
//! fold is not equivalent to adding up deltas first.

use super::params::ScoringParams;
use circulus_common::{clamp_score, EventType, ReputationEvent, ScoreComponents};
use chrono::{DateTime, Utc};

/// Signed change an event applies to its component, before clamping.
/// Zero for event types without a component.
pub fn event_delta(event: &ReputationEvent, params: &ScoringParams, now: DateTime<Utc>) -> f64 {
    let Some(amplification) = params.amplification.for_event(event.event_type) else {
        return 0.0;
    };
    let recency = params.recency_multiplier(event.age_days(now));
    event.impact_score * event.weight * recency * amplification
}

/// Fold the event window into the base components, oldest event first
pub fn apply_events(
    base: ScoreComponents,
    events: &[ReputationEvent],
    params: &ScoringParams,
    now: DateTime<Utc>,
) -> ScoreComponents {
    let mut ordered: Vec<&ReputationEvent> = events.iter().collect();
    ordered.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));

    let mut adjusted = base;
    for event in ordered {
        let delta = event_delta(event, params, now);
        let slot = match event.event_type {
            EventType::Delivery => &mut adjusted.on_time_delivery,
            EventType::Quality => &mut adjusted.quality_consistency,
            EventType::SustainableBatch => &mut adjusted.sustainable_ratio,
            EventType::Dispute => &mut adjusted.dispute_free_rate,
            EventType::Payment => continue,
        };
        *slot = clamp_score(*slot + delta);
    }
    adjusted
}
