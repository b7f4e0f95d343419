//! Settlement monitoring, threshold wait, and buying-power backoff.

use std::time::Duration;

use serde::Deserialize;

use crate::settlement::{BuyingPowerSettings, SettlementSettings, ThresholdSettings};

use super::ConfigError;

/// Per-order settlement polling plus the batch-level waits.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettlementConfig {
    /// Order status poll interval.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Per-order settlement deadline.
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,
    /// Sell-settlement threshold wait before the buy phase.
    #[serde(default)]
    pub threshold: ThresholdConfig,
    /// Buying-power re-verification backoff.
    #[serde(default)]
    pub buying_power: BuyingPowerConfig,
}

/// Threshold wait tunables.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThresholdConfig {
    /// Poll interval while accumulating settled sell value.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Deadline for the threshold wait.
    #[serde(default = "default_threshold_max_wait_secs")]
    pub max_wait_secs: u64,
}

/// Buying-power verification backoff tunables.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuyingPowerConfig {
    /// First backoff delay.
    #[serde(default = "default_bp_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Backoff ceiling.
    #[serde(default = "default_bp_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// Backoff growth factor.
    #[serde(default = "default_bp_multiplier")]
    pub multiplier: f64,
    /// Verification attempts before failing the buy phase.
    #[serde(default = "default_bp_max_attempts")]
    pub max_attempts: u32,
}

const fn default_poll_interval_ms() -> u64 {
    500
}

const fn default_max_wait_secs() -> u64 {
    60
}

const fn default_threshold_max_wait_secs() -> u64 {
    120
}

const fn default_bp_initial_backoff_ms() -> u64 {
    1_000
}

const fn default_bp_max_backoff_ms() -> u64 {
    60_000
}

const fn default_bp_multiplier() -> f64 {
    2.0
}

const fn default_bp_max_attempts() -> u32 {
    8
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_wait_secs: default_max_wait_secs(),
            threshold: ThresholdConfig::default(),
            buying_power: BuyingPowerConfig::default(),
        }
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_wait_secs: default_threshold_max_wait_secs(),
        }
    }
}

impl Default for BuyingPowerConfig {
    fn default() -> Self {
        Self {
            initial_backoff_ms: default_bp_initial_backoff_ms(),
            max_backoff_ms: default_bp_max_backoff_ms(),
            multiplier: default_bp_multiplier(),
            max_attempts: default_bp_max_attempts(),
        }
    }
}

impl SettlementConfig {
    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 || self.threshold.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "settlement poll intervals must be positive".to_string(),
            ));
        }
        if self.max_wait_secs == 0 || self.threshold.max_wait_secs == 0 {
            return Err(ConfigError::Invalid(
                "settlement waits must be positive".to_string(),
            ));
        }
        if self.buying_power.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "settlement.buying_power.max_attempts must be positive".to_string(),
            ));
        }
        if self.buying_power.multiplier < 1.0 {
            return Err(ConfigError::Invalid(
                "settlement.buying_power.multiplier must be at least 1.0".to_string(),
            ));
        }
        Ok(())
    }

    /// Per-order monitor settings.
    #[must_use]
    pub const fn to_settlement_settings(&self) -> SettlementSettings {
        SettlementSettings {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            max_wait: Duration::from_secs(self.max_wait_secs),
        }
    }

    /// Threshold wait settings.
    #[must_use]
    pub const fn to_threshold_settings(&self) -> ThresholdSettings {
        ThresholdSettings {
            poll_interval: Duration::from_millis(self.threshold.poll_interval_ms),
            max_wait: Duration::from_secs(self.threshold.max_wait_secs),
        }
    }

    /// Buying-power backoff settings.
    #[must_use]
    pub const fn to_buying_power_settings(&self) -> BuyingPowerSettings {
        BuyingPowerSettings {
            initial_backoff: Duration::from_millis(self.buying_power.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.buying_power.max_backoff_ms),
            multiplier: self.buying_power.multiplier,
            max_attempts: self.buying_power.max_attempts,
        }
    }
}
