//! Batch execution and reconciliation settings.

use std::time::Duration;

use serde::Deserialize;

use crate::execution::ReconcileSettings;

use super::{ConfigError, decimal_field};

/// Concurrency, the notional floor, and post-trade reconciliation.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutionConfig {
    /// Maximum orders in flight per batch phase.
    #[serde(default = "default_max_concurrent_orders")]
    pub max_concurrent_orders: usize,
    /// Minimum order notional in dollars.
    #[serde(default = "default_min_notional")]
    pub min_notional: f64,
    /// Post-trade position reconciliation.
    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

/// Reconciliation tunables.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconcileConfig {
    /// Grace sleep before the authoritative position fetch.
    #[serde(default = "default_grace_ms")]
    pub grace_ms: u64,
    /// Absolute share tolerance for position comparison.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

const fn default_max_concurrent_orders() -> usize {
    10
}

const fn default_min_notional() -> f64 {
    1.0
}

const fn default_grace_ms() -> u64 {
    1_000
}

const fn default_tolerance() -> f64 {
    0.001
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_concurrent_orders: default_max_concurrent_orders(),
            min_notional: default_min_notional(),
            reconcile: ReconcileConfig::default(),
        }
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            grace_ms: default_grace_ms(),
            tolerance: default_tolerance(),
        }
    }
}

impl ExecutionConfig {
    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_orders == 0 {
            return Err(ConfigError::Invalid(
                "execution.max_concurrent_orders must be positive".to_string(),
            ));
        }
        if self.min_notional <= 0.0 {
            return Err(ConfigError::Invalid(
                "execution.min_notional must be positive".to_string(),
            ));
        }
        if self.reconcile.tolerance < 0.0 {
            return Err(ConfigError::Invalid(
                "execution.reconcile.tolerance must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Runtime reconciliation settings.
    pub fn to_reconcile_settings(&self) -> Result<ReconcileSettings, ConfigError> {
        Ok(ReconcileSettings {
            settlement_grace: Duration::from_millis(self.reconcile.grace_ms),
            tolerance: decimal_field("execution.reconcile.tolerance", self.reconcile.tolerance)?,
        })
    }
}
