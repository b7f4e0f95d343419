//! Settlement records emitted when orders reach a fill.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::order::{OrderSide, OrderStatus, PlacedOrder};

/// The realized outcome of a filled (or partially filled) order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementRecord {
    /// Broker order ID.
    pub order_id: String,
    /// Stock symbol.
    pub symbol: String,
    /// Order side.
    pub side: OrderSide,
    /// Shares settled.
    pub settled_quantity: Decimal,
    /// Average settlement price.
    pub settlement_price: Decimal,
    /// `settled_quantity * settlement_price`.
    pub settled_value: Decimal,
    /// Terminal status the order reached.
    pub status: OrderStatus,
    /// When the record was produced.
    pub recorded_at: DateTime<Utc>,
}

impl SettlementRecord {
    /// Build a record from an order's state, if any quantity has filled.
    #[must_use]
    pub fn from_order(order: &PlacedOrder) -> Option<Self> {
        if order.filled_quantity <= Decimal::ZERO {
            return None;
        }
        let price = order.filled_avg_price?;
        Some(Self {
            order_id: order.order_id.clone(),
            symbol: order.symbol.clone(),
            side: order.side,
            settled_quantity: order.filled_quantity,
            settlement_price: price,
            settled_value: order.filled_quantity * price,
            status: order.status,
            recorded_at: Utc::now(),
        })
    }
}
