//! Role-weighted aggregation
//!
//! Each role weighs the four components differently. Weights need not sum to
//! one; the aggregate divides by their total.

use circulus_common::{clamp_score, ReputationError, Result, Role, ScoreComponents};
use serde::{Deserialize, Serialize};

/// Relative importance of each component for one role
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoleWeights {
    pub on_time: f64,
    pub quality: f64,
    pub sustainable: f64,
    pub dispute_free: f64,
}

impl RoleWeights {
    pub const fn new(on_time: f64, quality: f64, sustainable: f64, dispute_free: f64) -> Self {
        Self {
            on_time,
            quality,
            sustainable,
            dispute_free,
        }
    }

    pub fn total(&self) -> f64 {
        self.on_time + self.quality + self.sustainable + self.dispute_free
    }

    fn as_array(&self) -> [f64; 4] {
        [self.on_time, self.quality, self.sustainable, self.dispute_free]
    }
}

/// Weight profile for every role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightProfiles {
    pub supplier: RoleWeights,
    pub collector: RoleWeights,
    pub processor: RoleWeights,
    /// Buyers are judged mostly on payment/dispute reliability
    pub buyer: RoleWeights,
}

impl Default for WeightProfiles {
    fn default() -> Self {
        Self {
            supplier: RoleWeights::new(0.25, 0.35, 0.25, 0.15),
            collector: RoleWeights::new(0.40, 0.20, 0.25, 0.15),
            processor: RoleWeights::new(0.20, 0.40, 0.30, 0.10),
            buyer: RoleWeights::new(0.15, 0.15, 0.20, 0.50),
        }
    }
}

impl WeightProfiles {
    pub fn for_role(&self, role: Role) -> &RoleWeights {
        match role {
            Role::Supplier => &self.supplier,
            Role::Collector => &self.collector,
            Role::Processor => &self.processor,
            Role::Buyer => &self.buyer,
        }
    }

    /// Every weight finite and non-negative, every profile with a positive total
    pub fn validate(&self) -> Result<()> {
        for role in Role::ALL {
            let weights = self.for_role(role);
            let valid = weights
                .as_array()
                .iter()
                .all(|w| w.is_finite() && *w >= 0.0);
            if !valid || weights.total() <= 0.0 {
                return Err(ReputationError::Config(format!(
                    "invalid weight profile for {}",
                    role
                )));
            }
        }
        Ok(())
    }
}

/// Normalized weighted mean of the components, rounded to an integer score
pub fn overall_score(components: &ScoreComponents, weights: &RoleWeights) -> u8 {
    let weighted_sum: f64 = components
        .as_array()
        .iter()
        .zip(weights.as_array())
        .map(|(c, w)| c * w)
        .sum();

    let total = weights.total();
    if total <= 0.0 {
        return 0;
    }

    clamp_score((weighted_sum / total).round()) as u8
}
