//! HTTP client wrapper with retry logic.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::broker::error::BrokerError;
use crate::broker::retry::ExponentialBackoff;

use super::api_types::AlpacaErrorResponse;
use super::config::AlpacaConfig;

/// HTTP client for the Alpaca API with retry logic.
#[derive(Debug, Clone)]
pub struct AlpacaHttpClient {
    client: Client,
    config: AlpacaConfig,
}

impl AlpacaHttpClient {
    /// Create a new HTTP client from config.
    pub fn new(config: AlpacaConfig) -> Result<Self, BrokerError> {
        if config.api_key.is_empty() || config.api_secret.is_empty() {
            return Err(BrokerError::AuthenticationFailed);
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BrokerError::Network(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// GET from the trading API.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, BrokerError> {
        let base = self.config.trading_base_url.clone();
        self.request("GET", &base, path, None::<&()>).await
    }

    /// POST to the trading API.
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, BrokerError> {
        let base = self.config.trading_base_url.clone();
        self.request("POST", &base, path, Some(body)).await
    }

    /// DELETE on the trading API.
    pub async fn delete(&self, path: &str) -> Result<(), BrokerError> {
        let base = self.config.trading_base_url.clone();
        let _: serde_json::Value = self.request("DELETE", &base, path, None::<&()>).await?;
        Ok(())
    }

    /// GET from the market data API.
    pub async fn data_get<T: DeserializeOwned>(&self, path: &str) -> Result<T, BrokerError> {
        let base = self.config.data_base_url.clone();
        self.request("GET", &base, path, None::<&()>).await
    }

    /// Internal request implementation with retry logic.
    async fn request<T: DeserializeOwned, B: Serialize>(
        &self,
        method: &str,
        base_url: &str,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, BrokerError> {
        let url = format!("{base_url}{path}");
        let mut backoff = ExponentialBackoff::new(&self.config.retry);

        loop {
            let mut request = match method {
                "GET" => self.client.get(&url),
                "POST" => self.client.post(&url),
                "DELETE" => self.client.delete(&url),
                _ => {
                    return Err(BrokerError::Network(format!("unsupported method: {method}")));
                }
            };
            request = request
                .header("APCA-API-KEY-ID", &self.config.api_key)
                .header("APCA-API-SECRET-KEY", &self.config.api_secret);
            if let Some(b) = body {
                request = request.json(b);
            }

            let response = match request.send().await {
                Ok(resp) => resp,
                Err(e) => {
                    if let Some(delay) = backoff.next_backoff() {
                        tracing::warn!(
                            error = %e,
                            delay_ms = delay.as_millis(),
                            attempt = backoff.attempt(),
                            "Network error, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    if e.is_timeout() {
                        return Err(BrokerError::Timeout);
                    }
                    return Err(BrokerError::MaxRetriesExceeded {
                        attempts: backoff.attempt(),
                    });
                }
            };

            let status = response.status();

            if status.is_success() {
                let text = response
                    .text()
                    .await
                    .map_err(|e| BrokerError::Network(e.to_string()))?;
                if text.is_empty() {
                    return serde_json::from_str("null")
                        .map_err(|e| BrokerError::Parse(e.to_string()));
                }
                return serde_json::from_str(&text).map_err(|e| BrokerError::Parse(e.to_string()));
            }

            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());

            let error_body = response.text().await.unwrap_or_default();

            let (error_code, error_message) =
                match serde_json::from_str::<AlpacaErrorResponse>(&error_body) {
                    Ok(err) => (
                        err.code.unwrap_or_else(|| status.as_u16().to_string()),
                        err.message,
                    ),
                    Err(_) => (status.as_u16().to_string(), error_body),
                };

            match categorize_status(status) {
                ErrorCategory::RateLimited => {
                    // Prefer the broker's Retry-After hint over our schedule
                    let delay = retry_after
                        .map(Duration::from_secs)
                        .or_else(|| backoff.next_backoff());
                    if let Some(delay) = delay {
                        tracing::warn!(
                            code = %error_code,
                            delay_ms = delay.as_millis(),
                            "Rate limited, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(BrokerError::RateLimited {
                        retry_after_secs: retry_after.unwrap_or(60),
                    });
                }
                ErrorCategory::Retryable => {
                    if let Some(delay) = backoff.next_backoff() {
                        tracing::warn!(
                            code = %error_code,
                            message = %error_message,
                            delay_ms = delay.as_millis(),
                            "Retryable error, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(BrokerError::MaxRetriesExceeded {
                        attempts: backoff.attempt(),
                    });
                }
                ErrorCategory::NonRetryable => {
                    return match status {
                        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                            Err(BrokerError::AuthenticationFailed)
                        }
                        StatusCode::NOT_FOUND => Err(BrokerError::OrderNotFound {
                            order_id: path.to_string(),
                        }),
                        StatusCode::UNPROCESSABLE_ENTITY => {
                            Err(BrokerError::OrderRejected(error_message))
                        }
                        _ => Err(BrokerError::Api {
                            code: error_code,
                            message: error_message,
                        }),
                    };
                }
            }
        }
    }
}

/// Error category for determining retry behavior.
enum ErrorCategory {
    RateLimited,
    Retryable,
    NonRetryable,
}

/// Categorize HTTP status code for retry handling.
const fn categorize_status(status: StatusCode) -> ErrorCategory {
    match status.as_u16() {
        429 => ErrorCategory::RateLimited,
        408 | 500 | 502 | 503 | 504 => ErrorCategory::Retryable,
        _ => ErrorCategory::NonRetryable,
    }
}
