//! ReputationEvent - atomic record of an observed outcome
//!
//! Events are append-only. Once recorded an event is never edited or deleted;
//! later events supersede it. Every event carries a fingerprint so a
//! re-submitted event can be recognised as a duplicate: the upstream
//! idempotency key when one is given, otherwise the full event content.

use crate::error::EventError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of outcome an event reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Delivery,
    Quality,
    #[serde(alias = "srl_batch")]
    SustainableBatch,
    Dispute,
    Payment,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Delivery => "delivery",
            EventType::Quality => "quality",
            EventType::SustainableBatch => "sustainable_batch",
            EventType::Dispute => "dispute",
            EventType::Payment => "payment",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventType {
    type Err = EventError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "delivery" => Ok(EventType::Delivery),
            "quality" => Ok(EventType::Quality),
            "sustainable_batch" | "srl_batch" => Ok(EventType::SustainableBatch),
            "dispute" => Ok(EventType::Dispute),
            "payment" => Ok(EventType::Payment),
            other => Err(EventError::UnknownType(other.to_string())),
        }
    }
}

/// Event as submitted by an upstream subsystem, before validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEvent {
    pub entity_id: String,
    pub event_type: EventType,
    /// Outcome quality in [-1, 1]
    pub impact_score: f64,
    /// Importance multiplier, strictly positive
    pub weight: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub details: serde_json::Value,
    /// Upstream id for the outcome; identifies the event instead of its content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
}

impl NewEvent {
    pub fn new(
        entity_id: impl Into<String>,
        event_type: EventType,
        impact_score: f64,
        weight: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            event_type,
            impact_score,
            weight,
            timestamp,
            details: serde_json::Value::Null,
            idempotency_key: None,
        }
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    /// Attach free-form details
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }

    /// Check ingest constraints
    pub fn validate(&self) -> std::result::Result<(), EventError> {
        if self.entity_id.trim().is_empty() {
            return Err(EventError::MissingEntity);
        }
        if !self.impact_score.is_finite() || !(-1.0..=1.0).contains(&self.impact_score) {
            return Err(EventError::ImpactOutOfRange(self.impact_score));
        }
        if !self.weight.is_finite() || self.weight <= 0.0 {
            return Err(EventError::NonPositiveWeight(self.weight));
        }
        Ok(())
    }

    /// Validate and seal into an immutable event
    pub fn seal(self) -> std::result::Result<ReputationEvent, EventError> {
        self.validate()?;
        let id = fingerprint(&self);
        Ok(ReputationEvent {
            id,
            entity_id: self.entity_id,
            event_type: self.event_type,
            impact_score: self.impact_score,
            weight: self.weight,
            timestamp: self.timestamp,
            details: self.details,
            idempotency_key: self.idempotency_key,
        })
    }
}

/// Recorded, validated reputation event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReputationEvent {
    /// Fingerprint of the idempotency key or the content (blake3, hex)
    pub id: String,
    pub entity_id: String,
    pub event_type: EventType,
    pub impact_score: f64,
    pub weight: f64,
    pub timestamp: DateTime<Utc>,
    pub details: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
}

impl ReputationEvent {
    /// Age in fractional days at `now`; events stamped in the future count as age 0
    pub fn age_days(&self, now: DateTime<Utc>) -> f64 {
        (now - self.timestamp).num_milliseconds().max(0) as f64 / 86_400_000.0
    }
}

fn fingerprint(event: &NewEvent) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(event.entity_id.as_bytes());
    hasher.update(b"|");
    if let Some(key) = &event.idempotency_key {
        hasher.update(b"key|");
        hasher.update(key.as_bytes());
        return hasher.finalize().to_hex().to_string();
    }
    hasher.update(event.event_type.as_str().as_bytes());
    hasher.update(b"|");
    hasher.update(&event.timestamp.timestamp().to_le_bytes());
    hasher.update(&event.timestamp.timestamp_subsec_nanos().to_le_bytes());
    hasher.update(&event.impact_score.to_bits().to_le_bytes());
    hasher.update(&event.weight.to_bits().to_le_bytes());
    hasher.update(event.details.to_string().as_bytes());
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample(impact: f64, weight: f64) -> NewEvent {
        NewEvent::new("ent-1", EventType::Delivery, impact, weight, Utc::now())
    }

    #[test]
    fn test_validate_rejects_out_of_range_impact() {
        assert_eq!(
            sample(1.2, 1.0).validate(),
            Err(EventError::ImpactOutOfRange(1.2))
        );
        assert!(sample(f64::NAN, 1.0).validate().is_err());
        assert!(sample(-1.0, 1.0).validate().is_ok());
        assert!(sample(1.0, 1.0).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_non_positive_weight() {
        assert_eq!(
            sample(0.5, 0.0).validate(),
            Err(EventError::NonPositiveWeight(0.0))
        );
        assert!(sample(0.5, -2.0).validate().is_err());
    }

    #[test]
    fn test_validate_requires_entity() {
        let event = NewEvent::new("  ", EventType::Quality, 0.1, 1.0, Utc::now());
        assert_eq!(event.validate(), Err(EventError::MissingEntity));
    }

    #[test]
    fn test_fingerprint_is_content_addressed() {
        let ts = Utc::now();
        let a = NewEvent::new("ent-1", EventType::Quality, 0.5, 1.0, ts).seal().unwrap();
        let b = NewEvent::new("ent-1", EventType::Quality, 0.5, 1.0, ts).seal().unwrap();
        let c = NewEvent::new("ent-1", EventType::Quality, 0.6, 1.0, ts).seal().unwrap();
        assert_eq!(a.id, b.id);
        assert_ne!(a.id, c.id);
    }

    #[test]
    fn test_fingerprint_keeps_sub_millisecond_precision() {
        let ts = Utc::now();
        let a = NewEvent::new("ent-1", EventType::Delivery, 1.0, 1.0, ts).seal().unwrap();
        let b = NewEvent::new("ent-1", EventType::Delivery, 1.0, 1.0, ts + Duration::microseconds(300))
            .seal()
            .unwrap();
        let c = NewEvent::new("ent-1", EventType::Delivery, 1.0, 1.0, ts + Duration::nanoseconds(1))
            .seal()
            .unwrap();
        assert_ne!(a.id, b.id);
        assert_ne!(a.id, c.id);
    }

    #[test]
    fn test_idempotency_key_overrides_content() {
        let ts = Utc::now();
        let a = NewEvent::new("ent-1", EventType::Quality, 0.5, 1.0, ts)
            .with_idempotency_key("qc-7781")
            .seal()
            .unwrap();
        let retried = NewEvent::new("ent-1", EventType::Quality, 0.5, 1.0, ts + Duration::seconds(3))
            .with_idempotency_key("qc-7781")
            .seal()
            .unwrap();
        let other_entity = NewEvent::new("ent-2", EventType::Quality, 0.5, 1.0, ts)
            .with_idempotency_key("qc-7781")
            .seal()
            .unwrap();
        assert_eq!(a.id, retried.id);
        assert_ne!(a.id, other_entity.id);
        assert_eq!(a.idempotency_key.as_deref(), Some("qc-7781"));
    }

    #[test]
    fn test_event_type_accepts_legacy_alias() {
        let parsed: EventType = serde_json::from_str("\"srl_batch\"").unwrap();
        assert_eq!(parsed, EventType::SustainableBatch);
        assert_eq!("sustainable_batch".parse::<EventType>().unwrap(), parsed);
    }

    #[test]
    fn test_future_events_have_zero_age() {
        let now = Utc::now();
        let event = NewEvent::new("ent-1", EventType::Dispute, -0.5, 1.0, now + Duration::days(2))
            .seal()
            .unwrap();
        assert_eq!(event.age_days(now), 0.0);
    }
}
