//! Walk-the-book ladder settings.

use std::time::Duration;

use serde::Deserialize;

use crate::pricing::{WalkPlan, WalkStep};

use super::{ConfigError, decimal_field};

/// The repeg ladder.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PricingConfig {
    /// Ladder steps, fractions strictly increasing.
    #[serde(default = "default_steps")]
    pub steps: Vec<StepConfig>,
    /// Cancel-and-replace budget per order.
    #[serde(default = "default_max_repegs")]
    pub max_repegs: u32,
}

/// One ladder rung.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepConfig {
    /// Fraction of the spread to cross, in `(0, 1]`.
    pub fraction: f64,
    /// How long to let the order work at this price.
    pub wait_ms: u64,
}

fn default_steps() -> Vec<StepConfig> {
    let wait_ms = 4_000;
    vec![
        StepConfig {
            fraction: 0.75,
            wait_ms,
        },
        StepConfig {
            fraction: 0.85,
            wait_ms,
        },
        StepConfig {
            fraction: 0.95,
            wait_ms,
        },
    ]
}

const fn default_max_repegs() -> u32 {
    3
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            steps: default_steps(),
            max_repegs: default_max_repegs(),
        }
    }
}

impl PricingConfig {
    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        // Full invariant checking lives on the runtime plan
        self.to_plan().map(|_| ())
    }

    /// Runtime walk plan, with ladder invariants enforced.
    pub fn to_plan(&self) -> Result<WalkPlan, ConfigError> {
        let mut steps = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            steps.push(WalkStep {
                fraction: decimal_field("pricing.steps.fraction", step.fraction)?,
                wait: Duration::from_millis(step.wait_ms),
            });
        }
        let plan = WalkPlan {
            steps,
            max_repegs: self.max_repegs,
        };
        plan.validate()
            .map_err(|e| ConfigError::Invalid(format!("pricing: {e}")))?;
        Ok(plan)
    }
}
