//! Explanation generator
//!
//! Produces the ordered rationale shown next to a score: delivery, quality,
//! sustainable participation, recent trend, then activity. A dimension that
//! crosses no threshold contributes nothing.

use circulus_common::{EntityMetrics, ReputationEvent, ScoreComponents};
use chrono::{DateTime, Duration, Utc};

const EXCELLENT_DELIVERY: f64 = 90.0;
const WEAK_DELIVERY: f64 = 70.0;
const OUTSTANDING_QUALITY: f64 = 95.0;
const WEAK_QUALITY: f64 = 80.0;
const STRONG_SUSTAINABLE: f64 = 50.0;
const ACTIVE_SUSTAINABLE: f64 = 25.0;

/// Trend window for positive/negative event counts
const TREND_WINDOW_DAYS: i64 = 7;
const POSITIVE_IMPACT: f64 = 0.5;
const NEGATIVE_IMPACT: f64 = -0.3;
/// More than this many positive events in the trend window reads as a trend
const POSITIVE_TREND_COUNT: usize = 3;
const INACTIVE_AFTER_DAYS: f64 = 30.0;

pub fn explain(
    components: &ScoreComponents,
    metrics: &EntityMetrics,
    events: &[ReputationEvent],
    now: DateTime<Utc>,
) -> Vec<String> {
    let mut explanations = Vec::new();

    if components.on_time_delivery >= EXCELLENT_DELIVERY {
        explanations.push("Excellent delivery performance".to_string());
    } else if components.on_time_delivery < WEAK_DELIVERY {
        explanations.push("Delivery performance needs improvement".to_string());
    }

    if components.quality_consistency >= OUTSTANDING_QUALITY {
        explanations.push("Outstanding quality consistency".to_string());
    } else if components.quality_consistency < WEAK_QUALITY {
        explanations.push("Quality metrics below target".to_string());
    }

    if components.sustainable_ratio >= STRONG_SUSTAINABLE {
        explanations.push("Strong commitment to sustainable loops".to_string());
    } else if components.sustainable_ratio >= ACTIVE_SUSTAINABLE {
        explanations.push("Active in sustainable loop participation".to_string());
    } else if components.sustainable_ratio > 0.0 {
        explanations.push("Limited sustainable loop participation".to_string());
    }

    let trend_start = now - Duration::days(TREND_WINDOW_DAYS);
    let recent = events.iter().filter(|e| e.timestamp > trend_start);
    let (positive, negative) = recent.fold((0usize, 0usize), |(pos, neg), e| {
        if e.impact_score > POSITIVE_IMPACT {
            (pos + 1, neg)
        } else if e.impact_score < NEGATIVE_IMPACT {
            (pos, neg + 1)
        } else {
            (pos, neg)
        }
    });

    if positive > POSITIVE_TREND_COUNT {
        explanations.push("Recent positive trend".to_string());
    }
    if negative > 0 {
        explanations.push(format!("{} recent issues require attention", negative));
    }

    if metrics
        .days_since_active(now)
        .is_some_and(|days| days > INACTIVE_AFTER_DAYS)
    {
        explanations.push("Low recent activity".to_string());
    }

    explanations
}
