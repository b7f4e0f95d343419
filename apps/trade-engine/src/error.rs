//! Engine error taxonomy.
//!
//! Broker-layer errors (`BrokerError`) convert into this taxonomy at the
//! orchestrator boundary so callers can distinguish skips from failures
//! without string matching.

use rust_decimal::Decimal;

use crate::broker::BrokerError;
use crate::models::QuoteInvalid;

/// Typed failures surfaced by the execution engine.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    /// Invalid, stale, or missing market data.
    #[error("data quality failure for {symbol}: {detail}")]
    DataQuality {
        /// Symbol being priced.
        symbol: String,
        /// What was wrong with the data.
        detail: String,
    },

    /// A business rule rejected the order before submission.
    #[error("constraint violation for {symbol}: {reason}")]
    ConstraintViolation {
        /// Symbol being validated.
        symbol: String,
        /// The violated rule.
        reason: String,
    },

    /// Retryable broker failure that exhausted its retries.
    #[error("transient broker failure for {symbol}: {source}")]
    BrokerTransient {
        /// Symbol in flight.
        symbol: String,
        /// Underlying broker error.
        #[source]
        source: BrokerError,
    },

    /// Non-retryable broker failure.
    #[error("broker rejected {symbol}: {source}")]
    BrokerTerminal {
        /// Symbol in flight.
        symbol: String,
        /// Broker order ID, when one was assigned.
        order_id: Option<String>,
        /// Underlying broker error.
        #[source]
        source: BrokerError,
    },

    /// An order reached neither a fill nor another terminal state in time.
    #[error("settlement timed out for order {order_id} ({symbol}) after {waited_secs}s")]
    SettlementTimeout {
        /// Symbol in flight.
        symbol: String,
        /// Broker order ID.
        order_id: String,
        /// Seconds waited before giving up.
        waited_secs: u64,
    },

    /// Buying power never reached the required level.
    #[error(
        "insufficient buying power: required {required}, \
         last observed {available} after {attempts} attempts"
    )]
    InsufficientBuyingPower {
        /// Buying power needed for the buy phase.
        required: Decimal,
        /// Last observed buying power.
        available: Decimal,
        /// Verification attempts made.
        attempts: u32,
    },

    /// Post-trade position does not match the expectation.
    #[error("position mismatch for {symbol}: expected {expected}, broker reports {actual}")]
    ReconciliationDiscrepancy {
        /// Symbol reconciled.
        symbol: String,
        /// Expected post-trade position.
        expected: Decimal,
        /// Broker-reported position.
        actual: Decimal,
    },
}

impl ExecutionError {
    /// Classify a broker error against the taxonomy.
    #[must_use]
    pub fn from_broker(symbol: &str, order_id: Option<String>, source: BrokerError) -> Self {
        if source.is_transient() {
            Self::BrokerTransient {
                symbol: symbol.to_string(),
                source,
            }
        } else {
            Self::BrokerTerminal {
                symbol: symbol.to_string(),
                order_id,
                source,
            }
        }
    }

    /// Wrap a quote validity failure.
    #[must_use]
    pub fn invalid_quote(symbol: &str, invalid: &QuoteInvalid) -> Self {
        Self::DataQuality {
            symbol: symbol.to_string(),
            detail: invalid.to_string(),
        }
    }

    /// Errors that make the intent an intentional skip rather than a
    /// placement failure: bad data and rule violations detected before
    /// submission.
    #[must_use]
    pub const fn is_skip(&self) -> bool {
        matches!(
            self,
            Self::DataQuality { .. } | Self::ConstraintViolation { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_broker_errors_classify_as_transient() {
        let err = ExecutionError::from_broker("AAPL", None, BrokerError::Timeout);
        assert!(matches!(err, ExecutionError::BrokerTransient { .. }));
    }

    #[test]
    fn rejections_classify_as_terminal() {
        let err = ExecutionError::from_broker(
            "AAPL",
            Some("o-1".to_string()),
            BrokerError::OrderRejected("insufficient shares".to_string()),
        );
        assert!(matches!(err, ExecutionError::BrokerTerminal { .. }));
    }

    #[test]
    fn skips_are_data_quality_and_constraints_only() {
        let dq = ExecutionError::DataQuality {
            symbol: "AAPL".to_string(),
            detail: "inverted book".to_string(),
        };
        let cv = ExecutionError::ConstraintViolation {
            symbol: "AAPL".to_string(),
            reason: "below notional floor".to_string(),
        };
        let bt = ExecutionError::from_broker("AAPL", None, BrokerError::Timeout);
        assert!(dq.is_skip());
        assert!(cv.is_skip());
        assert!(!bt.is_skip());
    }
}
