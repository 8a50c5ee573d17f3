//! Prometheus metrics for the reputation engine

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};

/// Engine and ingest counters
pub struct ReputationMetrics {
    pub recomputations_total: IntCounterVec,
    pub recompute_failures_total: IntCounter,
    pub recompute_duration_seconds: Histogram,
    pub events_recorded_total: IntCounter,
    pub events_duplicate_total: IntCounter,
    pub events_rejected_total: IntCounter,
    pub alerts_total: IntCounterVec,
    pub alert_publish_failures_total: IntCounter,
}

impl ReputationMetrics {
    pub fn new() -> prometheus::Result<Self> {
        Ok(Self {
            recomputations_total: IntCounterVec::new(
                Opts::new(
                    "circulus_reputation_recomputations_total",
                    "Scores computed and persisted, by trigger",
                ),
                &["trigger"],
            )?,
            recompute_failures_total: IntCounter::new(
                "circulus_reputation_recompute_failures_total",
                "Recomputations that ended in an error",
            )?,
            recompute_duration_seconds: Histogram::with_opts(
                HistogramOpts::new(
                    "circulus_reputation_recompute_duration_seconds",
                    "Wall time of one recomputation including I/O",
                )
                .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
            )?,
            events_recorded_total: IntCounter::new(
                "circulus_reputation_events_recorded_total",
                "Reputation events appended to the log",
            )?,
            events_duplicate_total: IntCounter::new(
                "circulus_reputation_events_duplicate_total",
                "Reputation events dropped as duplicates",
            )?,
            events_rejected_total: IntCounter::new(
                "circulus_reputation_events_rejected_total",
                "Reputation events rejected at ingest",
            )?,
            alerts_total: IntCounterVec::new(
                Opts::new("circulus_reputation_alerts_total", "Alerts raised, by type"),
                &["alert_type"],
            )?,
            alert_publish_failures_total: IntCounter::new(
                "circulus_reputation_alert_publish_failures_total",
                "Alerts the sink failed to accept",
            )?,
        })
    }

    pub fn register(&self, registry: &Registry) -> prometheus::Result<()> {
        registry.register(Box::new(self.recomputations_total.clone()))?;
        registry.register(Box::new(self.recompute_failures_total.clone()))?;
        registry.register(Box::new(self.recompute_duration_seconds.clone()))?;
        registry.register(Box::new(self.events_recorded_total.clone()))?;
        registry.register(Box::new(self.events_duplicate_total.clone()))?;
        registry.register(Box::new(self.events_rejected_total.clone()))?;
        registry.register(Box::new(self.alerts_total.clone()))?;
        registry.register(Box::new(self.alert_publish_failures_total.clone()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_gather() {
        let metrics = ReputationMetrics::new().unwrap();
        let registry = Registry::new();
        metrics.register(&registry).unwrap();

        metrics.recomputations_total.with_label_values(&["manual"]).inc();
        metrics.alerts_total.with_label_values(&["low_reputation"]).inc();

        let names: Vec<String> = registry
            .gather()
            .iter()
            .map(|f| f.get_name().to_string())
            .collect();
        assert!(names.contains(&"circulus_reputation_recomputations_total".to_string()));
        assert!(names.contains(&"circulus_reputation_alerts_total".to_string()));
    }

    #[test]
    fn test_double_registration_fails() {
        let metrics = ReputationMetrics::new().unwrap();
        let registry = Registry::new();
        metrics.register(&registry).unwrap();
        assert!(metrics.register(&registry).is_err());
    }
}
