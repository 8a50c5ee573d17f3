//! Change detection and alerting
//!
//! Compares a freshly persisted score with the one it superseded. The drop,
//! boost and low-score checks are independent; any combination can fire for
//! one computation.

pub mod sink;

pub use sink::{AlertSink, ChannelAlertSink, TracingAlertSink};

use chrono::{DateTime, Utc};
use circulus_common::{ReputationScore, Role, ALERT_CHANGE, LOW_REPUTATION_THRESHOLD, SIGNIFICANT_CHANGE};
use serde::{Deserialize, Serialize};

/// Alert categories published to the notification subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    ReputationDrop,
    ReputationBoost,
    LowReputation,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::ReputationDrop => "reputation_drop",
            AlertType::ReputationBoost => "reputation_boost",
            AlertType::LowReputation => "low_reputation",
        }
    }
}

impl std::fmt::Display for AlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alert payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub alert_type: AlertType,
    pub entity_id: String,
    pub entity_type: Role,
    pub score: u8,
    pub previous_score: Option<u8>,
    pub change: Option<i16>,
    /// Version of the score that raised the alert
    pub score_version: u64,
    pub raised_at: DateTime<Utc>,
}

/// Outcome of comparing a score with its predecessor
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeAssessment {
    /// `None` on an entity's first score
    pub delta: Option<i16>,
    /// `|delta| >= 10`
    pub significant: bool,
    pub alerts: Vec<Alert>,
}

/// Compare `current` against the score it replaces
pub fn assess_change(previous: Option<&ReputationScore>, current: &ReputationScore) -> ChangeAssessment {
    let delta = previous.map(|p| current.delta_from(p));
    let significant = delta.is_some_and(|d| d.abs() >= SIGNIFICANT_CHANGE);

    let alert = |alert_type| Alert {
        alert_type,
        entity_id: current.entity_id.clone(),
        entity_type: current.entity_type,
        score: current.overall_score,
        previous_score: previous.map(|p| p.overall_score),
        change: delta,
        score_version: current.version,
        raised_at: current.updated_at,
    };

    let mut alerts = Vec::new();
    if let Some(d) = delta {
        if d <= -ALERT_CHANGE {
            alerts.push(alert(AlertType::ReputationDrop));
        }
        if d >= ALERT_CHANGE {
            alerts.push(alert(AlertType::ReputationBoost));
        }
    }
    if current.is_below(LOW_REPUTATION_THRESHOLD) {
        alerts.push(alert(AlertType::LowReputation));
    }

    ChangeAssessment {
        delta,
        significant,
        alerts,
    }
}
