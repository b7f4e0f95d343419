//! YAML configuration with environment-variable interpolation.
//!
//! Values support `${VAR}` and `${VAR:-default}` syntax. Every section
//! has defaults, so an empty file is a valid (paper-trading, no-metrics)
//! configuration; cross-field invariants are checked loudly at load time.

mod broker;
mod engine;
mod observability;
mod pricing;
mod quotes;
mod settlement;

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde::Deserialize;

pub use broker::{BrokerConfig, RetryConfig};
pub use engine::{ExecutionConfig, ReconcileConfig};
pub use observability::{MetricsConfig, ObservabilityConfig};
pub use pricing::{PricingConfig, StepConfig};
pub use quotes::QuotesConfig;
pub use settlement::{BuyingPowerConfig, SettlementConfig, ThresholdConfig};

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path attempted.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// YAML could not be parsed.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml_bw::Error),
    /// A value violates a cross-field invariant.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Broker credentials and connection settings.
    #[serde(default)]
    pub broker: BrokerConfig,
    /// Quote acquisition settings.
    #[serde(default)]
    pub quotes: QuotesConfig,
    /// Walk-the-book ladder.
    #[serde(default)]
    pub pricing: PricingConfig,
    /// Settlement polling, threshold wait, and buying-power backoff.
    #[serde(default)]
    pub settlement: SettlementConfig,
    /// Batch execution and reconciliation settings.
    #[serde(default)]
    pub execution: ExecutionConfig,
    /// Logging and metrics.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Load and validate configuration from a YAML file.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    load_config_from_string(&raw)
}

/// Load and validate configuration from a YAML string.
pub fn load_config_from_string(raw: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(raw);
    let config: Config = serde_yaml_bw::from_str(&interpolated)?;
    validate_config(&config)?;
    Ok(config)
}

/// Replace `${VAR}` and `${VAR:-default}` with environment values.
fn interpolate_env_vars(raw: &str) -> String {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        #[allow(clippy::unwrap_used)] // pattern is a compile-time constant
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}").unwrap()
    });

    pattern
        .replace_all(raw, |caps: &regex::Captures<'_>| {
            let name = &caps[1];
            match std::env::var(name) {
                Ok(value) => value,
                Err(_) => caps.get(2).map_or(String::new(), |m| m.as_str().to_string()),
            }
        })
        .into_owned()
}

/// Exact decimal from a YAML float, named for error messages.
pub(crate) fn decimal_field(name: &str, value: f64) -> Result<Decimal, ConfigError> {
    Decimal::try_from(value)
        .map_err(|e| ConfigError::Invalid(format!("{name}: {value} is not a valid decimal: {e}")))
}

/// Cross-field invariant checks.
fn validate_config(config: &Config) -> Result<(), ConfigError> {
    config.broker.validate()?;
    config.quotes.validate()?;
    config.pricing.validate()?;
    config.settlement.validate()?;
    config.execution.validate()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = match load_config_from_string("{}") {
            Ok(c) => c,
            Err(e) => panic!("defaults rejected: {e}"),
        };
        assert_eq!(config.execution.max_concurrent_orders, 10);
        assert_eq!(config.pricing.max_repegs, 3);
        assert_eq!(config.settlement.buying_power.max_attempts, 8);
    }

    #[test]
    fn env_interpolation_with_default() {
        let raw = "broker:\n  environment: ${TRADE_ENGINE_TEST_UNSET_VAR:-paper}\n";
        let config = match load_config_from_string(raw) {
            Ok(c) => c,
            Err(e) => panic!("config rejected: {e}"),
        };
        assert_eq!(config.broker.environment, "paper");
    }

    #[test]
    fn unset_variable_without_default_becomes_empty() {
        let raw = "broker:\n  api_key: \"${TRADE_ENGINE_TEST_UNSET_VAR}\"\n";
        let config = match load_config_from_string(raw) {
            Ok(c) => c,
            Err(e) => panic!("config rejected: {e}"),
        };
        assert_eq!(config.broker.api_key, "");
    }

    #[test]
    fn invalid_walk_fractions_rejected() {
        let raw = r"
pricing:
  steps:
    - fraction: 0.85
      wait_ms: 1000
    - fraction: 0.75
      wait_ms: 1000
";
        assert!(matches!(
            load_config_from_string(raw),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn unknown_fields_rejected() {
        assert!(load_config_from_string("nonsense: true\n").is_err());
    }

    #[test]
    fn bad_environment_rejected() {
        let raw = "broker:\n  environment: sandbox\n";
        assert!(matches!(
            load_config_from_string(raw),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn zero_concurrency_rejected() {
        let raw = "execution:\n  max_concurrent_orders: 0\n";
        assert!(matches!(
            load_config_from_string(raw),
            Err(ConfigError::Invalid(_))
        ));
    }
}
