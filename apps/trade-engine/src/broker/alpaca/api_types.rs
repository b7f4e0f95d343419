//! Alpaca API request and response types.
//!
//! These types map directly to Alpaca's REST API format. Prices and
//! quantities travel as strings on the trading API and as numbers on the
//! market data API; both parse into `Decimal` before leaving this module.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::broker::error::BrokerError;
use crate::models::{OrderSide, OrderStatus, OrderType, PlacedOrder, Quote, QuoteSource};

/// Order request for the Alpaca trading API.
#[derive(Debug, Clone, Serialize)]
pub struct AlpacaOrderRequest {
    /// Stock symbol.
    pub symbol: String,
    /// Quantity (shares, as string).
    pub qty: String,
    /// Order side.
    pub side: String,
    /// Order type.
    #[serde(rename = "type")]
    pub order_type: String,
    /// Time in force.
    pub time_in_force: String,
    /// Limit price (for limit orders).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_price: Option<String>,
    /// Client order ID.
    pub client_order_id: String,
}

/// Order response from the Alpaca trading API.
#[derive(Debug, Clone, Deserialize)]
pub struct AlpacaOrderResponse {
    /// Broker order ID.
    pub id: String,
    /// Client order ID.
    pub client_order_id: String,
    /// Symbol.
    pub symbol: String,
    /// Quantity (as string).
    pub qty: String,
    /// Filled quantity (as string).
    pub filled_qty: String,
    /// Average fill price (as string).
    #[serde(default)]
    pub filled_avg_price: Option<String>,
    /// Order status.
    pub status: String,
    /// Order side.
    pub side: String,
    /// Order type.
    #[serde(rename = "type")]
    pub order_type: String,
    /// Limit price.
    #[serde(default)]
    pub limit_price: Option<String>,
    /// Submitted timestamp.
    pub submitted_at: DateTime<Utc>,
}

impl AlpacaOrderResponse {
    /// Convert into the engine's order model, failing loudly on
    /// unparseable numeric fields.
    pub fn to_placed_order(&self) -> Result<PlacedOrder, BrokerError> {
        let side = match self.side.as_str() {
            "buy" => OrderSide::Buy,
            "sell" => OrderSide::Sell,
            other => return Err(BrokerError::Parse(format!("unknown order side: {other}"))),
        };
        let order_type = match self.order_type.as_str() {
            "market" => OrderType::Market,
            "limit" => OrderType::Limit,
            other => return Err(BrokerError::Parse(format!("unknown order type: {other}"))),
        };

        Ok(PlacedOrder {
            order_id: self.id.clone(),
            client_order_id: self.client_order_id.clone(),
            symbol: self.symbol.clone(),
            side,
            order_type,
            requested_quantity: parse_decimal("qty", &self.qty)?,
            limit_price: self
                .limit_price
                .as_deref()
                .map(|p| parse_decimal("limit_price", p))
                .transpose()?,
            status: parse_order_status(&self.status),
            filled_quantity: parse_decimal("filled_qty", &self.filled_qty)?,
            filled_avg_price: self
                .filled_avg_price
                .as_deref()
                .map(|p| parse_decimal("filled_avg_price", p))
                .transpose()?,
            submitted_at: self.submitted_at,
        })
    }
}

/// Account response from the Alpaca trading API.
#[derive(Debug, Clone, Deserialize)]
pub struct AlpacaAccountResponse {
    /// Account ID.
    pub id: String,
    /// Buying power (as string).
    pub buying_power: String,
}

/// Position response from the Alpaca trading API.
#[derive(Debug, Clone, Deserialize)]
pub struct AlpacaPositionResponse {
    /// Symbol.
    pub symbol: String,
    /// Signed quantity (as string).
    pub qty: String,
}

/// Latest-quote response from the Alpaca market data API.
#[derive(Debug, Clone, Deserialize)]
pub struct AlpacaLatestQuoteResponse {
    /// Symbol.
    pub symbol: String,
    /// The quote payload.
    pub quote: AlpacaQuote,
}

/// Quote payload from the market data API (numeric fields).
#[derive(Debug, Clone, Deserialize)]
pub struct AlpacaQuote {
    /// Bid price.
    pub bp: f64,
    /// Bid size.
    pub bs: u64,
    /// Ask price.
    pub ap: f64,
    /// Ask size.
    #[serde(rename = "as")]
    pub ask_size: u64,
    /// Quote timestamp.
    pub t: DateTime<Utc>,
}

impl AlpacaLatestQuoteResponse {
    /// Convert into the engine's quote model.
    pub fn to_quote(&self) -> Result<Quote, BrokerError> {
        let bid = Decimal::try_from(self.quote.bp)
            .map_err(|e| BrokerError::Parse(format!("bid price: {e}")))?;
        let ask = Decimal::try_from(self.quote.ap)
            .map_err(|e| BrokerError::Parse(format!("ask price: {e}")))?;
        Ok(Quote {
            symbol: self.symbol.clone(),
            bid,
            ask,
            bid_size: self.quote.bs,
            ask_size: self.quote.ask_size,
            timestamp: self.quote.t,
            source: QuoteSource::Rest,
        })
    }
}

/// Error response from the Alpaca API.
#[derive(Debug, Clone, Deserialize)]
pub struct AlpacaErrorResponse {
    /// Error code.
    #[serde(default)]
    pub code: Option<String>,
    /// Error message.
    pub message: String,
}

fn parse_decimal(field: &str, raw: &str) -> Result<Decimal, BrokerError> {
    raw.parse()
        .map_err(|e| BrokerError::Parse(format!("{field} {raw:?}: {e}")))
}

/// Parse an Alpaca order status string into the engine's `OrderStatus`.
fn parse_order_status(status: &str) -> OrderStatus {
    match status.to_lowercase().as_str() {
        "accepted" | "accepted_for_bidding" | "replaced" | "pending_replace" => {
            OrderStatus::Accepted
        }
        "partially_filled" => OrderStatus::PartiallyFilled,
        "filled" => OrderStatus::Filled,
        "done_for_day" | "expired" => OrderStatus::Expired,
        "canceled" | "pending_cancel" => OrderStatus::Canceled,
        "rejected" => OrderStatus::Rejected,
        // new, pending_new, stopped, suspended, calculated, and unknown -> New
        _ => OrderStatus::New,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_response() -> AlpacaOrderResponse {
        AlpacaOrderResponse {
            id: "broker-123".to_string(),
            client_order_id: "client-456".to_string(),
            symbol: "AAPL".to_string(),
            qty: "100".to_string(),
            filled_qty: "50".to_string(),
            filled_avg_price: Some("150.25".to_string()),
            status: "partially_filled".to_string(),
            side: "buy".to_string(),
            order_type: "limit".to_string(),
            limit_price: Some("150.00".to_string()),
            submitted_at: Utc::now(),
        }
    }

    #[test]
    fn parse_order_status_terminal_states() {
        assert_eq!(parse_order_status("filled"), OrderStatus::Filled);
        assert_eq!(parse_order_status("canceled"), OrderStatus::Canceled);
        assert_eq!(parse_order_status("pending_cancel"), OrderStatus::Canceled);
        assert_eq!(parse_order_status("rejected"), OrderStatus::Rejected);
        assert_eq!(parse_order_status("expired"), OrderStatus::Expired);
        assert_eq!(parse_order_status("done_for_day"), OrderStatus::Expired);
    }

    #[test]
    fn parse_order_status_active_states() {
        assert_eq!(parse_order_status("new"), OrderStatus::New);
        assert_eq!(parse_order_status("pending_new"), OrderStatus::New);
        assert_eq!(parse_order_status("accepted"), OrderStatus::Accepted);
        assert_eq!(
            parse_order_status("partially_filled"),
            OrderStatus::PartiallyFilled
        );
    }

    #[test]
    fn order_response_converts() {
        let order = match order_response().to_placed_order() {
            Ok(o) => o,
            Err(e) => panic!("conversion failed: {e}"),
        };
        assert_eq!(order.order_id, "broker-123");
        assert_eq!(order.status, OrderStatus::PartiallyFilled);
        assert_eq!(order.filled_quantity, Decimal::new(50, 0));
        assert_eq!(order.filled_avg_price, Some(Decimal::new(15025, 2)));
        assert_eq!(order.remaining_quantity(), Decimal::new(50, 0));
    }

    #[test]
    fn unparseable_quantity_is_loud() {
        let mut response = order_response();
        response.filled_qty = "garbage".to_string();
        assert!(matches!(
            response.to_placed_order(),
            Err(BrokerError::Parse(_))
        ));
    }

    #[test]
    fn quote_response_converts() {
        let response = AlpacaLatestQuoteResponse {
            symbol: "AAPL".to_string(),
            quote: AlpacaQuote {
                bp: 150.10,
                bs: 200,
                ap: 150.20,
                ask_size: 300,
                t: Utc::now(),
            },
        };
        let quote = match response.to_quote() {
            Ok(q) => q,
            Err(e) => panic!("conversion failed: {e}"),
        };
        assert_eq!(quote.source, QuoteSource::Rest);
        assert!(quote.bid < quote.ask);
        assert_eq!(quote.bid_size, 200);
    }
}
