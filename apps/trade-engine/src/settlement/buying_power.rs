//! Post-settlement buying-power re-verification.
//!
//! Settled cash can lag the broker's account endpoint, so insufficient
//! buying power right after the sell phase is retried on an exponential
//! backoff before the buy phase is declared unfundable.

use std::time::Duration;

use rust_decimal::Decimal;

use crate::broker::{BrokerAdapter, BrokerError, ExponentialBackoff, RetryPolicy};
use crate::error::ExecutionError;

/// Backoff schedule for buying-power verification.
#[derive(Debug, Clone)]
pub struct BuyingPowerSettings {
    /// Backoff before the second attempt.
    pub initial_backoff: Duration,
    /// Upper bound on any single backoff.
    pub max_backoff: Duration,
    /// Multiplier applied per attempt.
    pub multiplier: f64,
    /// Total attempts, including the first.
    pub max_attempts: u32,
}

impl Default for BuyingPowerSettings {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            multiplier: 2.0,
            max_attempts: 8,
        }
    }
}

/// Verify the account can fund `required`, retrying on backoff.
///
/// Returns the observed buying power on success. Exhausting every attempt
/// is a typed `InsufficientBuyingPower` error, never a silent zero.
pub async fn verify_buying_power(
    broker: &dyn BrokerAdapter,
    required: Decimal,
    settings: &BuyingPowerSettings,
) -> Result<Decimal, ExecutionError> {
    let policy = RetryPolicy {
        max_attempts: settings.max_attempts,
        initial_backoff: settings.initial_backoff,
        max_backoff: settings.max_backoff,
        multiplier: settings.multiplier,
        jitter_factor: 0.0,
    };
    let mut backoff = ExponentialBackoff::new(&policy);
    let mut last_observed: Option<Decimal> = None;
    let mut last_error: Option<BrokerError> = None;

    loop {
        match broker.get_buying_power().await {
            Ok(available) => {
                if available >= required {
                    tracing::debug!(
                        available = %available,
                        required = %required,
                        "Buying power verified"
                    );
                    return Ok(available);
                }
                last_observed = Some(available);
                tracing::info!(
                    available = %available,
                    required = %required,
                    attempt = backoff.attempt() + 1,
                    "Buying power below requirement, waiting for settlement"
                );
            }
            Err(e) if e.is_transient() => {
                tracing::warn!(error = %e, "Transient error fetching buying power");
                last_error = Some(e);
            }
            Err(e) => {
                return Err(ExecutionError::from_broker("account", None, e));
            }
        }

        let Some(delay) = backoff.next_backoff() else {
            // With no successful observation this is a connectivity
            // failure, not a funding shortfall
            return Err(match (last_observed, last_error) {
                (Some(available), _) => ExecutionError::InsufficientBuyingPower {
                    required,
                    available,
                    attempts: backoff.attempt(),
                },
                (None, Some(error)) => ExecutionError::from_broker("account", None, error),
                (None, None) => ExecutionError::InsufficientBuyingPower {
                    required,
                    available: Decimal::ZERO,
                    attempts: backoff.attempt(),
                },
            });
        };
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::MockBroker;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn fast_settings(attempts: u32) -> BuyingPowerSettings {
        BuyingPowerSettings {
            initial_backoff: Duration::from_millis(2),
            max_backoff: Duration::from_millis(10),
            multiplier: 2.0,
            max_attempts: attempts,
        }
    }

    #[tokio::test]
    async fn sufficient_buying_power_verifies_immediately() {
        let broker = MockBroker::new();
        broker.set_buying_power(dec!(10000));

        let observed = match verify_buying_power(&broker, dec!(5000), &fast_settings(3)).await {
            Ok(bp) => bp,
            Err(e) => panic!("verify failed: {e}"),
        };
        assert_eq!(observed, dec!(10000));
    }

    #[tokio::test]
    async fn exhaustion_is_typed_error_with_attempt_count() {
        let broker = MockBroker::new();
        broker.set_buying_power(dec!(100));

        let result = verify_buying_power(&broker, dec!(5000), &fast_settings(4)).await;
        match result {
            Err(ExecutionError::InsufficientBuyingPower {
                required,
                available,
                attempts,
            }) => {
                assert_eq!(required, dec!(5000));
                assert_eq!(available, dec!(100));
                assert_eq!(attempts, 4);
            }
            other => panic!("expected InsufficientBuyingPower, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_account_surfaces_broker_error_not_shortfall() {
        let broker = MockBroker::new();
        broker.set_buying_power(dec!(10000));
        broker.fail_buying_power("connection reset");

        let result = verify_buying_power(&broker, dec!(5000), &fast_settings(3)).await;
        assert!(matches!(
            result,
            Err(ExecutionError::BrokerTransient { .. })
        ));
    }

    #[tokio::test]
    async fn recovers_when_settlement_lands_mid_wait() {
        let broker = Arc::new(MockBroker::new());
        broker.set_buying_power(dec!(100));

        let delayed = Arc::clone(&broker);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            delayed.set_buying_power(dec!(9000));
        });

        let observed = match verify_buying_power(&*broker, dec!(5000), &fast_settings(8)).await {
            Ok(bp) => bp,
            Err(e) => panic!("verify failed: {e}"),
        };
        assert_eq!(observed, dec!(9000));
    }
}
