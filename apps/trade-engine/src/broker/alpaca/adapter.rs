//! Alpaca broker adapter implementing `BrokerAdapter`.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::broker::adapter::{BrokerAdapter, SubmitOrder};
use crate::broker::error::BrokerError;
use crate::models::{OrderSide, OrderType, PlacedOrder, Quote};

use super::api_types::{
    AlpacaAccountResponse, AlpacaLatestQuoteResponse, AlpacaOrderRequest, AlpacaOrderResponse,
    AlpacaPositionResponse,
};
use super::config::{AlpacaConfig, AlpacaEnvironment};
use super::http_client::AlpacaHttpClient;

/// Alpaca Markets broker adapter.
#[derive(Debug, Clone)]
pub struct AlpacaBrokerAdapter {
    client: AlpacaHttpClient,
    environment: AlpacaEnvironment,
}

impl AlpacaBrokerAdapter {
    /// Create a new Alpaca broker adapter.
    pub fn new(config: AlpacaConfig) -> Result<Self, BrokerError> {
        let environment = config.environment;
        let client = AlpacaHttpClient::new(config)?;
        Ok(Self {
            client,
            environment,
        })
    }

    /// Check if we're in live trading mode.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        self.environment.is_live()
    }

    /// Convert a `SubmitOrder` to Alpaca API format.
    fn to_alpaca_order_request(request: &SubmitOrder) -> AlpacaOrderRequest {
        let side = match request.side {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        };
        let order_type = match request.order_type {
            OrderType::Market => "market",
            OrderType::Limit => "limit",
        };

        AlpacaOrderRequest {
            symbol: request.symbol.clone(),
            qty: request.quantity.to_string(),
            side: side.to_string(),
            order_type: order_type.to_string(),
            time_in_force: "day".to_string(),
            limit_price: request.limit_price.map(|p| p.to_string()),
            client_order_id: request.client_order_id.clone(),
        }
    }
}

#[async_trait]
impl BrokerAdapter for AlpacaBrokerAdapter {
    async fn get_quote(&self, symbol: &str) -> Result<Quote, BrokerError> {
        let response: AlpacaLatestQuoteResponse = self
            .client
            .data_get(&format!("/v2/stocks/{symbol}/quotes/latest"))
            .await?;
        response.to_quote()
    }

    async fn submit_order(&self, request: &SubmitOrder) -> Result<PlacedOrder, BrokerError> {
        if self.is_live() {
            tracing::warn!(
                client_order_id = %request.client_order_id,
                symbol = %request.symbol,
                "Submitting LIVE order - this will execute real trades"
            );
        }

        let alpaca_request = Self::to_alpaca_order_request(request);

        tracing::info!(
            client_order_id = %request.client_order_id,
            symbol = %request.symbol,
            side = %alpaca_request.side,
            order_type = %alpaca_request.order_type,
            qty = %alpaca_request.qty,
            limit_price = ?alpaca_request.limit_price,
            "Submitting order to Alpaca"
        );

        let response: AlpacaOrderResponse = self.client.post("/v2/orders", &alpaca_request).await?;

        tracing::info!(
            client_order_id = %request.client_order_id,
            order_id = %response.id,
            status = %response.status,
            "Order submitted"
        );

        response.to_placed_order()
    }

    async fn get_order_status(&self, order_id: &str) -> Result<PlacedOrder, BrokerError> {
        let response: AlpacaOrderResponse =
            self.client.get(&format!("/v2/orders/{order_id}")).await?;
        response.to_placed_order()
    }

    async fn cancel_order(&self, order_id: &str) -> Result<(), BrokerError> {
        tracing::info!(order_id = %order_id, "Canceling order");
        match self.client.delete(&format!("/v2/orders/{order_id}")).await {
            Ok(()) => Ok(()),
            // Alpaca answers 422 when the order is already terminal
            Err(BrokerError::OrderRejected(_)) => Err(BrokerError::OrderNotCancelable {
                order_id: order_id.to_string(),
            }),
            Err(e) => Err(e),
        }
    }

    async fn get_position(&self, symbol: &str) -> Result<Option<Decimal>, BrokerError> {
        let result: Result<AlpacaPositionResponse, BrokerError> =
            self.client.get(&format!("/v2/positions/{symbol}")).await;

        match result {
            Ok(position) => {
                let qty: Decimal = position
                    .qty
                    .parse()
                    .map_err(|e| BrokerError::Parse(format!("position qty: {e}")))?;
                Ok(Some(qty))
            }
            Err(BrokerError::OrderNotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn get_buying_power(&self) -> Result<Decimal, BrokerError> {
        let account: AlpacaAccountResponse = self.client.get("/v2/account").await?;
        account
            .buying_power
            .parse()
            .map_err(|e| BrokerError::Parse(format!("buying power: {e}")))
    }

    fn broker_name(&self) -> &'static str {
        "alpaca"
    }

    async fn health_check(&self) -> Result<(), BrokerError> {
        let _: AlpacaAccountResponse = self.client.get("/v2/account").await?;
        Ok(())
    }
}
