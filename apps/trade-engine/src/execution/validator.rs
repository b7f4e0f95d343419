//! Pre-submission order validation.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::ExecutionError;
use crate::models::{OrderIntent, Quote};

/// Validation tunables.
#[derive(Debug, Clone)]
pub struct ValidatorSettings {
    /// Minimum order notional (`price * quantity`) in dollars.
    pub min_notional: Decimal,
    /// Maximum spread fraction accepted on the pricing quote.
    pub max_spread_fraction: Decimal,
    /// Require nonzero sizes on both quote sides.
    pub require_sizes: bool,
}

impl Default for ValidatorSettings {
    fn default() -> Self {
        Self {
            min_notional: Decimal::ONE,
            max_spread_fraction: dec!(0.05),
            require_sizes: true,
        }
    }
}

/// Gates every intent before any broker interaction.
///
/// Never mutates and never clamps: a violation is a typed error the
/// orchestrator turns into a skipped result. There is no silent fallback
/// for bad data.
#[derive(Debug, Clone)]
pub struct OrderValidator {
    settings: ValidatorSettings,
}

impl OrderValidator {
    /// Build a validator.
    #[must_use]
    pub const fn new(settings: ValidatorSettings) -> Self {
        Self { settings }
    }

    /// Validate an intent against the quote that will price it.
    pub fn validate(&self, intent: &OrderIntent, quote: &Quote) -> Result<(), ExecutionError> {
        if intent.quantity <= Decimal::ZERO {
            return Err(ExecutionError::ConstraintViolation {
                symbol: intent.symbol.clone(),
                reason: format!("quantity must be positive, got {}", intent.quantity),
            });
        }

        quote
            .validate(self.settings.max_spread_fraction, self.settings.require_sizes)
            .map_err(|invalid| ExecutionError::invalid_quote(&intent.symbol, &invalid))?;

        let notional = quote.mid() * intent.quantity;
        if notional < self.settings.min_notional {
            return Err(ExecutionError::ConstraintViolation {
                symbol: intent.symbol.clone(),
                reason: format!(
                    "notional {notional} below minimum {}",
                    self.settings.min_notional
                ),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CloseType, OrderSide, QuoteSource, Urgency};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn intent(quantity: Decimal) -> OrderIntent {
        OrderIntent {
            symbol: "AAPL".to_string(),
            side: OrderSide::Buy,
            close_type: CloseType::Partial,
            quantity,
            urgency: Urgency::Medium,
        }
    }

    fn quote(bid: Decimal, ask: Decimal) -> Quote {
        Quote {
            symbol: "AAPL".to_string(),
            bid,
            ask,
            bid_size: 100,
            ask_size: 100,
            timestamp: Utc::now(),
            source: QuoteSource::Rest,
        }
    }

    #[test]
    fn accepts_order_above_notional_floor() {
        let validator = OrderValidator::new(ValidatorSettings::default());
        let result = validator.validate(&intent(dec!(10)), &quote(dec!(100.00), dec!(100.10)));
        assert!(result.is_ok());
    }

    #[test]
    fn rejects_below_notional_floor() {
        let validator = OrderValidator::new(ValidatorSettings::default());
        // 1 share at ~$0.50 mid = $0.50 notional, below the $1 floor
        let result = validator.validate(&intent(dec!(1)), &quote(dec!(0.50), dec!(0.50)));
        assert!(matches!(
            result,
            Err(ExecutionError::ConstraintViolation { .. })
        ));
    }

    #[test]
    fn rejects_invalid_quote_as_data_quality() {
        let validator = OrderValidator::new(ValidatorSettings::default());
        let result = validator.validate(&intent(dec!(10)), &quote(dec!(100.20), dec!(100.10)));
        assert!(matches!(result, Err(ExecutionError::DataQuality { .. })));
    }

    #[test]
    fn rejects_non_positive_quantity() {
        let validator = OrderValidator::new(ValidatorSettings::default());
        let result = validator.validate(&intent(dec!(0)), &quote(dec!(100.00), dec!(100.10)));
        assert!(matches!(
            result,
            Err(ExecutionError::ConstraintViolation { .. })
        ));
    }
}
