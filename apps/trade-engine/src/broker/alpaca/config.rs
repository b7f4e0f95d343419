//! Alpaca adapter configuration.

use std::time::Duration;

use crate::broker::retry::RetryPolicy;

/// Paper or live trading environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlpacaEnvironment {
    /// Paper trading (default).
    Paper,
    /// Live trading with real money.
    Live,
}

impl AlpacaEnvironment {
    /// Trading API base URL for this environment.
    #[must_use]
    pub const fn trading_base_url(self) -> &'static str {
        match self {
            Self::Paper => "https://paper-api.alpaca.markets",
            Self::Live => "https://api.alpaca.markets",
        }
    }

    /// Market data API base URL (shared across environments).
    #[must_use]
    pub const fn data_base_url(self) -> &'static str {
        "https://data.alpaca.markets"
    }

    /// Whether this is the live environment.
    #[must_use]
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Live)
    }
}

/// Configuration for the Alpaca adapter.
#[derive(Debug, Clone)]
pub struct AlpacaConfig {
    /// API key ID.
    pub api_key: String,
    /// API secret key.
    pub api_secret: String,
    /// Trading environment.
    pub environment: AlpacaEnvironment,
    /// Trading API base URL.
    pub trading_base_url: String,
    /// Market data API base URL.
    pub data_base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retry policy for transient failures.
    pub retry: RetryPolicy,
}

impl AlpacaConfig {
    /// Build a config for `environment` with its standard base URLs.
    #[must_use]
    pub fn new(
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        environment: AlpacaEnvironment,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            environment,
            trading_base_url: environment.trading_base_url().to_string(),
            data_base_url: environment.data_base_url().to_string(),
            timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
        }
    }

    /// Override both base URLs (integration tests point these at a local
    /// mock server).
    #[must_use]
    pub fn with_base_urls(
        mut self,
        trading_base_url: impl Into<String>,
        data_base_url: impl Into<String>,
    ) -> Self {
        self.trading_base_url = trading_base_url.into();
        self.data_base_url = data_base_url.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paper_urls() {
        let config = AlpacaConfig::new("key", "secret", AlpacaEnvironment::Paper);
        assert_eq!(config.trading_base_url, "https://paper-api.alpaca.markets");
        assert!(!config.environment.is_live());
    }

    #[test]
    fn base_url_override() {
        let config = AlpacaConfig::new("key", "secret", AlpacaEnvironment::Paper)
            .with_base_urls("http://localhost:9999", "http://localhost:9998");
        assert_eq!(config.trading_base_url, "http://localhost:9999");
        assert_eq!(config.data_base_url, "http://localhost:9998");
    }
}
