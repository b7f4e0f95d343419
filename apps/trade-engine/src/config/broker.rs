//! Broker connection settings.

use std::time::Duration;

use serde::Deserialize;

use crate::broker::RetryPolicy;
use crate::broker::alpaca::{AlpacaConfig, AlpacaEnvironment};

use super::ConfigError;

/// Broker credentials, environment, and HTTP behavior.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BrokerConfig {
    /// API key id.
    #[serde(default)]
    pub api_key: String,
    /// API secret.
    #[serde(default)]
    pub api_secret: String,
    /// `"paper"` or `"live"`.
    #[serde(default = "default_environment")]
    pub environment: String,
    /// Per-request HTTP timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Transient-error retry behavior.
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Retry and backoff tunables for broker requests.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Attempts before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// First backoff delay.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Backoff ceiling.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// Backoff growth factor.
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    /// Jitter as a fraction of the delay.
    #[serde(default = "default_jitter_factor")]
    pub jitter_factor: f64,
}

fn default_environment() -> String {
    "paper".to_string()
}

const fn default_timeout_secs() -> u64 {
    10
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    250
}

const fn default_max_backoff_ms() -> u64 {
    10_000
}

const fn default_multiplier() -> f64 {
    2.0
}

const fn default_jitter_factor() -> f64 {
    0.1
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_secret: String::new(),
            environment: default_environment(),
            timeout_secs: default_timeout_secs(),
            retry: RetryConfig::default(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            multiplier: default_multiplier(),
            jitter_factor: default_jitter_factor(),
        }
    }
}

impl BrokerConfig {
    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        self.parse_environment()?;
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "broker.timeout_secs must be positive".to_string(),
            ));
        }
        self.retry.validate()
    }

    fn parse_environment(&self) -> Result<AlpacaEnvironment, ConfigError> {
        match self.environment.as_str() {
            "paper" => Ok(AlpacaEnvironment::Paper),
            "live" => Ok(AlpacaEnvironment::Live),
            other => Err(ConfigError::Invalid(format!(
                "broker.environment must be \"paper\" or \"live\", got {other:?}"
            ))),
        }
    }

    /// Convert to adapter configuration. Credentials are checked by the
    /// adapter itself so tests can build configs without them.
    pub fn to_alpaca_config(&self) -> Result<AlpacaConfig, ConfigError> {
        let environment = self.parse_environment()?;
        let mut config = AlpacaConfig::new(
            self.api_key.clone(),
            self.api_secret.clone(),
            environment,
        );
        config.timeout = Duration::from_secs(self.timeout_secs);
        config.retry = self.retry.to_policy();
        Ok(config)
    }
}

impl RetryConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "broker.retry.max_attempts must be positive".to_string(),
            ));
        }
        if self.multiplier < 1.0 {
            return Err(ConfigError::Invalid(
                "broker.retry.multiplier must be at least 1.0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err(ConfigError::Invalid(
                "broker.retry.jitter_factor must be within [0, 1]".to_string(),
            ));
        }
        Ok(())
    }

    /// Runtime retry policy.
    #[must_use]
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            multiplier: self.multiplier,
            jitter_factor: self.jitter_factor,
        }
    }
}
