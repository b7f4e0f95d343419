//! Order types shared by the broker boundary and the execution core.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSide {
    /// Buy order.
    Buy,
    /// Sell order.
    Sell,
}

impl OrderSide {
    /// Sign applied to filled quantity when computing position deltas.
    #[must_use]
    pub const fn sign(self) -> i64 {
        match self {
            Self::Buy => 1,
            Self::Sell => -1,
        }
    }
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    /// Market order.
    Market,
    /// Limit order.
    Limit,
}

/// Order lifecycle status as reported by the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Order created, not yet acknowledged.
    New,
    /// Order acknowledged by broker.
    Accepted,
    /// Order partially filled.
    PartiallyFilled,
    /// Order completely filled.
    Filled,
    /// Order canceled.
    Canceled,
    /// Order rejected by broker.
    Rejected,
    /// Order expired.
    Expired,
}

impl OrderStatus {
    /// Terminal statuses never transition again.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Filled | Self::Canceled | Self::Rejected | Self::Expired
        )
    }

    /// Active statuses may still fill.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::New | Self::Accepted | Self::PartiallyFilled)
    }
}

/// An order the broker has acknowledged, with its live state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacedOrder {
    /// Broker-assigned order ID.
    pub order_id: String,
    /// Client-assigned order ID.
    pub client_order_id: String,
    /// Stock symbol.
    pub symbol: String,
    /// Order side.
    pub side: OrderSide,
    /// Order type as submitted.
    pub order_type: OrderType,
    /// Quantity requested at submission.
    pub requested_quantity: Decimal,
    /// Limit price, if a limit order.
    pub limit_price: Option<Decimal>,
    /// Current lifecycle status.
    pub status: OrderStatus,
    /// Cumulative filled quantity.
    pub filled_quantity: Decimal,
    /// Volume-weighted average fill price, once any quantity has filled.
    pub filled_avg_price: Option<Decimal>,
    /// Submission timestamp.
    pub submitted_at: DateTime<Utc>,
}

impl PlacedOrder {
    /// Quantity still unfilled.
    #[must_use]
    pub fn remaining_quantity(&self) -> Decimal {
        (self.requested_quantity - self.filled_quantity).max(Decimal::ZERO)
    }
}
