//! The broker adapter trait.

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{OrderSide, OrderType, PlacedOrder, Quote};

use super::error::BrokerError;

/// An order submission request, before the broker has seen it.
#[derive(Debug, Clone)]
pub struct SubmitOrder {
    /// Client-assigned order ID, unique per submission.
    pub client_order_id: String,
    /// Stock symbol.
    pub symbol: String,
    /// Order side.
    pub side: OrderSide,
    /// Order type.
    pub order_type: OrderType,
    /// Shares to trade.
    pub quantity: Decimal,
    /// Limit price, required for limit orders.
    pub limit_price: Option<Decimal>,
}

impl SubmitOrder {
    /// Build a market order request with a fresh client order ID.
    #[must_use]
    pub fn market(symbol: impl Into<String>, side: OrderSide, quantity: Decimal) -> Self {
        Self {
            client_order_id: Uuid::new_v4().to_string(),
            symbol: symbol.into(),
            side,
            order_type: OrderType::Market,
            quantity,
            limit_price: None,
        }
    }

    /// Build a limit order request with a fresh client order ID.
    #[must_use]
    pub fn limit(
        symbol: impl Into<String>,
        side: OrderSide,
        quantity: Decimal,
        limit_price: Decimal,
    ) -> Self {
        Self {
            client_order_id: Uuid::new_v4().to_string(),
            symbol: symbol.into(),
            side,
            order_type: OrderType::Limit,
            quantity,
            limit_price: Some(limit_price),
        }
    }
}

/// The typed boundary to an execution venue.
///
/// Everything the engine needs from a broker goes through this trait, so
/// tests run against [`super::MockBroker`] and production runs against the
/// Alpaca implementation.
#[async_trait]
pub trait BrokerAdapter: Send + Sync {
    /// Fetch the latest top-of-book quote for a symbol.
    async fn get_quote(&self, symbol: &str) -> Result<Quote, BrokerError>;

    /// Submit an order.
    async fn submit_order(&self, request: &SubmitOrder) -> Result<PlacedOrder, BrokerError>;

    /// Fetch the current state of an order by broker ID.
    async fn get_order_status(&self, order_id: &str) -> Result<PlacedOrder, BrokerError>;

    /// Cancel an order by broker ID.
    async fn cancel_order(&self, order_id: &str) -> Result<(), BrokerError>;

    /// Fetch the current position for a symbol. `None` when flat.
    async fn get_position(&self, symbol: &str) -> Result<Option<Decimal>, BrokerError>;

    /// Fetch current account buying power.
    async fn get_buying_power(&self) -> Result<Decimal, BrokerError>;

    /// Human-readable adapter name for logs.
    fn broker_name(&self) -> &'static str;

    /// Verify connectivity and credentials.
    async fn health_check(&self) -> Result<(), BrokerError>;
}
