//! Component score calculator
//!
//! Turns raw counters into four 0-100 sub-scores. Counters with no
//! observations fall back to the cold-start defaults in [`ScoringParams`].

use super::params::ScoringParams;
use circulus_common::{EntityMetrics, ScoreComponents};

/// Rounded percentage of `part` over `whole`, `None` when `whole` is zero
fn ratio_pct(part: u64, whole: u64) -> Option<f64> {
    if whole == 0 {
        return None;
    }
    Some((part as f64 / whole as f64 * 100.0).round())
}

/// Base component scores for a metrics snapshot
pub fn calculate_components(metrics: &EntityMetrics, params: &ScoringParams) -> ScoreComponents {
    let defaults = &params.cold_start;

    let on_time_delivery = ratio_pct(metrics.on_time_deliveries, metrics.total_deliveries)
        .unwrap_or(defaults.on_time_delivery);

    let quality_consistency = ratio_pct(metrics.quality_passes, metrics.quality_checks)
        .unwrap_or(defaults.quality_consistency);

    let sustainable_ratio = if metrics.total_batches > 0 {
        let ratio = metrics.sustainable_batches as f64 / metrics.total_batches as f64;
        ((ratio * params.sustainable_bonus).min(1.0) * 100.0).round()
    } else {
        defaults.sustainable_ratio
    };

    let dispute_free_rate = if metrics.total_deliveries > 0 {
        let rate = 1.0 - metrics.disputes as f64 / metrics.total_deliveries as f64;
        (rate * 100.0).round()
    } else {
        defaults.dispute_free_rate
    };

    ScoreComponents::new(
        on_time_delivery,
        quality_consistency,
        sustainable_ratio,
        dispute_free_rate,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn processor_metrics() -> EntityMetrics {
        EntityMetrics {
            total_deliveries: 100,
            on_time_deliveries: 95,
            quality_checks: 80,
            quality_passes: 76,
            sustainable_batches: 40,
            total_batches: 100,
            disputes: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_worked_example_components() {
        let c = calculate_components(&processor_metrics(), &ScoringParams::default());
        assert_eq!(c, ScoreComponents::new(95.0, 95.0, 60.0, 98.0));
    }

    #[test]
    fn test_zero_activity_defaults() {
        let c = calculate_components(&EntityMetrics::empty(), &ScoringParams::default());
        assert_eq!(c, ScoreComponents::new(50.0, 50.0, 0.0, 100.0));
    }

    #[test]
    fn test_sustainable_cold_start_is_configurable() {
        let mut params = ScoringParams::default();
        params.cold_start.sustainable_ratio = 50.0;
        let c = calculate_components(&EntityMetrics::empty(), &params);
        assert_eq!(c.sustainable_ratio, 50.0);
    }

    #[test]
    fn test_sustainable_bonus_is_capped() {
        let metrics = EntityMetrics {
            sustainable_batches: 80,
            total_batches: 100,
            ..Default::default()
        };
        let c = calculate_components(&metrics, &ScoringParams::default());
        assert_eq!(c.sustainable_ratio, 100.0);
    }

    #[test]
    fn test_disputes_beyond_deliveries_clamp_to_zero() {
        let metrics = EntityMetrics {
            total_deliveries: 2,
            on_time_deliveries: 2,
            disputes: 5,
            ..Default::default()
        };
        let c = calculate_components(&metrics, &ScoringParams::default());
        assert_eq!(c.dispute_free_rate, 0.0);
    }

    proptest! {
        #[test]
        fn prop_components_in_bounds(
            total in 0u64..10_000,
            on_time in 0u64..10_000,
            checks in 0u64..10_000,
            passes in 0u64..10_000,
            batches in 0u64..10_000,
            sustainable in 0u64..10_000,
            disputes in 0u64..10_000,
        ) {
            let metrics = EntityMetrics {
                total_deliveries: total,
                on_time_deliveries: on_time.min(total),
                quality_checks: checks,
                quality_passes: passes.min(checks),
                total_batches: batches,
                sustainable_batches: sustainable.min(batches),
                disputes,
                ..Default::default()
            };
            let c = calculate_components(&metrics, &ScoringParams::default());
            prop_assert!(c.in_bounds());
        }

        #[test]
        fn prop_on_time_is_monotonic(total in 1u64..5_000, a in 0u64..5_000, b in 0u64..5_000) {
            let (lo, hi) = (a.min(b).min(total), a.max(b).min(total));
            let params = ScoringParams::default();
            let low = calculate_components(
                &EntityMetrics { total_deliveries: total, on_time_deliveries: lo, ..Default::default() },
                &params,
            );
            let high = calculate_components(
                &EntityMetrics { total_deliveries: total, on_time_deliveries: hi, ..Default::default() },
                &params,
            );
            prop_assert!(high.on_time_delivery >= low.on_time_delivery);
        }
    }
}
