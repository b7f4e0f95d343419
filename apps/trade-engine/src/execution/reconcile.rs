//! Post-trade position reconciliation.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::broker::BrokerAdapter;
use crate::error::ExecutionError;

/// Reconciliation tunables.
#[derive(Debug, Clone)]
pub struct ReconcileSettings {
    /// Grace sleep before fetching the authoritative position.
    pub settlement_grace: Duration,
    /// Absolute share tolerance for position comparison.
    pub tolerance: Decimal,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            settlement_grace: Duration::from_secs(1),
            tolerance: dec!(0.001),
        }
    }
}

/// The outcome of one position check.
#[derive(Debug, Clone)]
pub struct PositionCheck {
    /// Symbol reconciled.
    pub symbol: String,
    /// Pre-trade position plus the signed filled delta.
    pub expected: Decimal,
    /// Broker-reported post-trade position.
    pub actual: Decimal,
    /// Whether `actual` matches `expected` within tolerance.
    pub matches_expected: bool,
    /// Whether a full exit actually went flat (always true otherwise).
    pub flat: bool,
}

impl PositionCheck {
    /// No discrepancy of any kind.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.matches_expected && self.flat
    }
}

/// Compares broker positions against post-trade expectations.
///
/// Discrepancies are reported, never fatal: by the time reconciliation
/// runs the trade has already happened, so the only honest move is to
/// surface the mismatch loudly.
pub struct PortfolioValidator {
    broker: Arc<dyn BrokerAdapter>,
    settings: ReconcileSettings,
}

impl PortfolioValidator {
    /// Build a validator over a broker.
    pub fn new(broker: Arc<dyn BrokerAdapter>, settings: ReconcileSettings) -> Self {
        Self { broker, settings }
    }

    /// Check the post-trade position for `symbol`.
    ///
    /// `signed_delta` is the filled quantity signed by side; `full_exit`
    /// additionally requires a flat position.
    pub async fn check(
        &self,
        symbol: &str,
        pre_trade: Decimal,
        signed_delta: Decimal,
        full_exit: bool,
    ) -> Result<PositionCheck, ExecutionError> {
        tokio::time::sleep(self.settings.settlement_grace).await;

        let actual = self
            .broker
            .get_position(symbol)
            .await
            .map_err(|e| ExecutionError::from_broker(symbol, None, e))?
            .unwrap_or(Decimal::ZERO);

        let expected = pre_trade + signed_delta;
        let matches_expected = (actual - expected).abs() <= self.settings.tolerance;
        let flat = !full_exit || actual.abs() <= self.settings.tolerance;

        let check = PositionCheck {
            symbol: symbol.to_string(),
            expected,
            actual,
            matches_expected,
            flat,
        };

        if check.is_clean() {
            tracing::debug!(symbol = %symbol, position = %actual, "Position reconciled");
        } else {
            metrics::counter!("reconciliation_discrepancies_total").increment(1);
            tracing::warn!(
                symbol = %symbol,
                expected = %expected,
                actual = %actual,
                full_exit = full_exit,
                "Post-trade position discrepancy"
            );
        }

        Ok(check)
    }
}
