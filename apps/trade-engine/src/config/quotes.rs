//! Quote acquisition settings.

use std::time::Duration;

use serde::Deserialize;

use crate::quotes::QuoteServiceSettings;

use super::{ConfigError, decimal_field};

/// Streaming wait, staleness, and the quote validity rule.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuotesConfig {
    /// How long to wait on the streaming feed before REST fallback.
    #[serde(default = "default_streaming_wait_ms")]
    pub streaming_wait_ms: u64,
    /// Maximum age for a cached streaming quote.
    #[serde(default = "default_max_quote_age_ms")]
    pub max_quote_age_ms: u64,
    /// Maximum spread as a fraction of the midpoint.
    #[serde(default = "default_max_spread_fraction")]
    pub max_spread_fraction: f64,
    /// Reject quotes with a zero-size side.
    #[serde(default = "default_require_sizes")]
    pub require_sizes: bool,
}

const fn default_streaming_wait_ms() -> u64 {
    1_500
}

const fn default_max_quote_age_ms() -> u64 {
    2_000
}

const fn default_max_spread_fraction() -> f64 {
    0.05
}

const fn default_require_sizes() -> bool {
    true
}

impl Default for QuotesConfig {
    fn default() -> Self {
        Self {
            streaming_wait_ms: default_streaming_wait_ms(),
            max_quote_age_ms: default_max_quote_age_ms(),
            max_spread_fraction: default_max_spread_fraction(),
            require_sizes: default_require_sizes(),
        }
    }
}

impl QuotesConfig {
    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        if self.max_quote_age_ms == 0 {
            return Err(ConfigError::Invalid(
                "quotes.max_quote_age_ms must be positive".to_string(),
            ));
        }
        if !(self.max_spread_fraction > 0.0 && self.max_spread_fraction < 1.0) {
            return Err(ConfigError::Invalid(
                "quotes.max_spread_fraction must be within (0, 1)".to_string(),
            ));
        }
        Ok(())
    }

    /// Runtime quote service settings.
    pub fn to_settings(&self) -> Result<QuoteServiceSettings, ConfigError> {
        Ok(QuoteServiceSettings {
            streaming_wait: Duration::from_millis(self.streaming_wait_ms),
            max_quote_age: Duration::from_millis(self.max_quote_age_ms),
            max_spread_fraction: decimal_field(
                "quotes.max_spread_fraction",
                self.max_spread_fraction,
            )?,
            require_sizes: self.require_sizes,
        })
    }
}
