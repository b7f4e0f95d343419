//! Order intents produced by the upstream rebalance planner.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::order::OrderSide;

/// Whether the intent trims a position or exits it entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CloseType {
    /// Reduce the position by `quantity` shares.
    Partial,
    /// Close the position completely; the post-trade position must be flat.
    FullExit,
}

/// Execution urgency requested by the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Urgency {
    /// Patient execution, full walk ladder.
    Low,
    /// Standard execution, full walk ladder.
    Medium,
    /// Immediate execution, market order from the start.
    High,
}

/// A single desired trade, before any broker interaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderIntent {
    /// Stock symbol.
    pub symbol: String,
    /// Buy or sell.
    pub side: OrderSide,
    /// Partial trim or full exit.
    pub close_type: CloseType,
    /// Shares to trade. Must be positive.
    pub quantity: Decimal,
    /// Requested urgency.
    pub urgency: Urgency,
}

impl OrderIntent {
    /// Build an intent, rejecting non-positive quantities up front.
    pub fn new(
        symbol: impl Into<String>,
        side: OrderSide,
        close_type: CloseType,
        quantity: Decimal,
        urgency: Urgency,
    ) -> Result<Self, InvalidIntent> {
        let symbol = symbol.into();
        if symbol.is_empty() {
            return Err(InvalidIntent::EmptySymbol);
        }
        if quantity <= Decimal::ZERO {
            return Err(InvalidIntent::NonPositiveQuantity { quantity });
        }
        Ok(Self {
            symbol,
            side,
            close_type,
            quantity,
            urgency,
        })
    }
}

/// Rejection reasons for malformed intents.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InvalidIntent {
    /// Symbol was empty.
    #[error("intent symbol is empty")]
    EmptySymbol,
    /// Quantity was zero or negative.
    #[error("intent quantity must be positive, got {quantity}")]
    NonPositiveQuantity {
        /// The offending quantity.
        quantity: Decimal,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn new_rejects_zero_quantity() {
        let result = OrderIntent::new(
            "AAPL",
            OrderSide::Buy,
            CloseType::Partial,
            Decimal::ZERO,
            Urgency::Medium,
        );
        assert!(matches!(
            result,
            Err(InvalidIntent::NonPositiveQuantity { .. })
        ));
    }

    #[test]
    fn new_rejects_empty_symbol() {
        let result = OrderIntent::new(
            "",
            OrderSide::Sell,
            CloseType::FullExit,
            dec!(5),
            Urgency::High,
        );
        assert!(matches!(result, Err(InvalidIntent::EmptySymbol)));
    }

    #[test]
    fn serde_round_trip() {
        let intent = match OrderIntent::new(
            "MSFT",
            OrderSide::Sell,
            CloseType::FullExit,
            dec!(12.5),
            Urgency::Low,
        ) {
            Ok(i) => i,
            Err(e) => panic!("valid intent rejected: {e}"),
        };
        let json = match serde_json::to_string(&intent) {
            Ok(j) => j,
            Err(e) => panic!("serialize failed: {e}"),
        };
        assert!(json.contains("\"SELL\""));
        assert!(json.contains("\"FULL_EXIT\""));
        let back: OrderIntent = match serde_json::from_str(&json) {
            Ok(i) => i,
            Err(e) => panic!("deserialize failed: {e}"),
        };
        assert_eq!(back.quantity, dec!(12.5));
        assert_eq!(back.urgency, Urgency::Low);
    }
}
