//! Scriptable in-memory broker for tests.
//!
//! Tests program per-symbol fill behavior, quotes, positions, and buying
//! power, then run the engine against this adapter exactly as they would
//! against the real one.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;

use crate::models::{OrderSide, OrderStatus, OrderType, PlacedOrder, Quote, QuoteSource};

use super::adapter::{BrokerAdapter, SubmitOrder};
use super::error::BrokerError;

/// How limit orders on a symbol behave once submitted.
#[derive(Debug, Clone, Copy)]
pub enum FillBehavior {
    /// Fill completely on the first status poll.
    Immediate,
    /// Fill completely on the nth status poll.
    AfterPolls(u32),
    /// Stay working forever (until canceled).
    Never,
    /// Report one partial fill on the first poll, then stall.
    PartialThenStall {
        /// Quantity of the partial fill.
        filled_quantity: Decimal,
    },
    /// Work for n polls, then come back rejected with no fill.
    RejectAfterPolls(u32),
}

struct MockOrder {
    order: PlacedOrder,
    behavior: FillBehavior,
    polls_remaining: u32,
    partial_applied: bool,
}

#[derive(Default)]
struct MockState {
    quotes: HashMap<String, Quote>,
    behaviors: HashMap<String, FillBehavior>,
    rejections: HashMap<String, String>,
    orders: HashMap<String, MockOrder>,
    positions: HashMap<String, Decimal>,
    buying_power: Decimal,
    buying_power_failure: Option<String>,
    submissions: Vec<SubmitOrder>,
}

/// In-memory broker with scriptable behavior.
pub struct MockBroker {
    state: Mutex<MockState>,
    counter: AtomicU64,
}

impl Default for MockBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBroker {
    /// A broker with no quotes, no positions, and zero buying power.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            counter: AtomicU64::new(0),
        }
    }

    /// Install or replace the quote for a symbol.
    pub fn set_quote(&self, quote: Quote) {
        let mut state = self.lock();
        state.quotes.insert(quote.symbol.clone(), quote);
    }

    /// Program how limit orders on `symbol` fill. Market orders fill on
    /// the first poll unless the scripted behavior is a rejection, which
    /// applies to every order type.
    pub fn set_fill_behavior(&self, symbol: &str, behavior: FillBehavior) {
        self.lock().behaviors.insert(symbol.to_string(), behavior);
    }

    /// Reject every submission on `symbol` with `message`.
    pub fn reject_symbol(&self, symbol: &str, message: &str) {
        self.lock()
            .rejections
            .insert(symbol.to_string(), message.to_string());
    }

    /// Set the current position for a symbol.
    pub fn set_position(&self, symbol: &str, quantity: Decimal) {
        self.lock().positions.insert(symbol.to_string(), quantity);
    }

    /// Set account buying power.
    pub fn set_buying_power(&self, buying_power: Decimal) {
        self.lock().buying_power = buying_power;
    }

    /// Fail every buying-power fetch with a network error.
    pub fn fail_buying_power(&self, message: &str) {
        self.lock().buying_power_failure = Some(message.to_string());
    }

    /// Every submission received, in order.
    #[must_use]
    pub fn submissions(&self) -> Vec<SubmitOrder> {
        self.lock().submissions.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn fill_price(state: &MockState, order: &PlacedOrder) -> Decimal {
        if let Some(limit) = order.limit_price {
            return limit;
        }
        // Market orders fill at the far touch
        state.quotes.get(&order.symbol).map_or(Decimal::ZERO, |q| {
            match order.side {
                OrderSide::Buy => q.ask,
                OrderSide::Sell => q.bid,
            }
        })
    }

    fn apply_fill(state: &mut MockState, order_id: &str, quantity: Decimal, price: Decimal) {
        let Some(entry) = state.orders.get_mut(order_id) else {
            return;
        };
        entry.order.filled_quantity += quantity;
        entry.order.filled_avg_price = Some(price);
        if entry.order.filled_quantity >= entry.order.requested_quantity {
            entry.order.status = OrderStatus::Filled;
        } else {
            entry.order.status = OrderStatus::PartiallyFilled;
        }

        let symbol = entry.order.symbol.clone();
        let side = entry.order.side;
        let signed = quantity * Decimal::from(side.sign());
        *state.positions.entry(symbol).or_insert(Decimal::ZERO) += signed;
        let value = quantity * price;
        match side {
            OrderSide::Sell => state.buying_power += value,
            OrderSide::Buy => state.buying_power -= value,
        }
    }
}

/// A plain valid quote for tests.
#[must_use]
pub fn test_quote(symbol: &str, bid: Decimal, ask: Decimal) -> Quote {
    Quote {
        symbol: symbol.to_string(),
        bid,
        ask,
        bid_size: 100,
        ask_size: 100,
        timestamp: Utc::now(),
        source: QuoteSource::Rest,
    }
}

#[async_trait]
impl BrokerAdapter for MockBroker {
    async fn get_quote(&self, symbol: &str) -> Result<Quote, BrokerError> {
        self.lock()
            .quotes
            .get(symbol)
            .cloned()
            .ok_or_else(|| BrokerError::Network(format!("no quote available for {symbol}")))
    }

    async fn submit_order(&self, request: &SubmitOrder) -> Result<PlacedOrder, BrokerError> {
        let mut state = self.lock();
        state.submissions.push(request.clone());

        if let Some(message) = state.rejections.get(&request.symbol) {
            return Err(BrokerError::OrderRejected(message.clone()));
        }

        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let order = PlacedOrder {
            order_id: format!("mock-{n}"),
            client_order_id: request.client_order_id.clone(),
            symbol: request.symbol.clone(),
            side: request.side,
            order_type: request.order_type,
            requested_quantity: request.quantity,
            limit_price: request.limit_price,
            status: OrderStatus::Accepted,
            filled_quantity: Decimal::ZERO,
            filled_avg_price: None,
            submitted_at: Utc::now(),
        };

        let behavior = match state.behaviors.get(&request.symbol).copied() {
            Some(scripted @ FillBehavior::RejectAfterPolls(_)) => scripted,
            Some(scripted) if request.order_type != OrderType::Market => scripted,
            _ => FillBehavior::Immediate,
        };
        let polls_remaining = match behavior {
            FillBehavior::Immediate => 1,
            FillBehavior::AfterPolls(n) | FillBehavior::RejectAfterPolls(n) => n.max(1),
            FillBehavior::Never | FillBehavior::PartialThenStall { .. } => 0,
        };

        state.orders.insert(
            order.order_id.clone(),
            MockOrder {
                order: order.clone(),
                behavior,
                polls_remaining,
                partial_applied: false,
            },
        );
        Ok(order)
    }

    async fn get_order_status(&self, order_id: &str) -> Result<PlacedOrder, BrokerError> {
        let mut state = self.lock();

        let Some((behavior, order, partial_applied, polls_remaining)) =
            state.orders.get(order_id).map(|entry| {
                (
                    entry.behavior,
                    entry.order.clone(),
                    entry.partial_applied,
                    entry.polls_remaining,
                )
            })
        else {
            return Err(BrokerError::OrderNotFound {
                order_id: order_id.to_string(),
            });
        };

        if !order.status.is_terminal() {
            match behavior {
                FillBehavior::Never => {}
                FillBehavior::PartialThenStall { filled_quantity } => {
                    if !partial_applied {
                        let price = Self::fill_price(&state, &order);
                        if let Some(entry) = state.orders.get_mut(order_id) {
                            entry.partial_applied = true;
                        }
                        let qty = filled_quantity.min(order.requested_quantity);
                        Self::apply_fill(&mut state, order_id, qty, price);
                    }
                }
                FillBehavior::Immediate | FillBehavior::AfterPolls(_) => {
                    let remaining_polls = polls_remaining.saturating_sub(1);
                    if let Some(entry) = state.orders.get_mut(order_id) {
                        entry.polls_remaining = remaining_polls;
                    }
                    if remaining_polls == 0 {
                        let price = Self::fill_price(&state, &order);
                        Self::apply_fill(&mut state, order_id, order.remaining_quantity(), price);
                    }
                }
                FillBehavior::RejectAfterPolls(_) => {
                    let remaining_polls = polls_remaining.saturating_sub(1);
                    if let Some(entry) = state.orders.get_mut(order_id) {
                        entry.polls_remaining = remaining_polls;
                        if remaining_polls == 0 {
                            entry.order.status = OrderStatus::Rejected;
                        }
                    }
                }
            }
        }

        state
            .orders
            .get(order_id)
            .map(|entry| entry.order.clone())
            .ok_or_else(|| BrokerError::OrderNotFound {
                order_id: order_id.to_string(),
            })
    }

    async fn cancel_order(&self, order_id: &str) -> Result<(), BrokerError> {
        let mut state = self.lock();
        let Some(entry) = state.orders.get_mut(order_id) else {
            return Err(BrokerError::OrderNotFound {
                order_id: order_id.to_string(),
            });
        };
        if entry.order.status.is_terminal() {
            return Err(BrokerError::OrderNotCancelable {
                order_id: order_id.to_string(),
            });
        }
        entry.order.status = OrderStatus::Canceled;
        Ok(())
    }

    async fn get_position(&self, symbol: &str) -> Result<Option<Decimal>, BrokerError> {
        Ok(self.lock().positions.get(symbol).copied())
    }

    async fn get_buying_power(&self) -> Result<Decimal, BrokerError> {
        let state = self.lock();
        if let Some(message) = &state.buying_power_failure {
            return Err(BrokerError::Network(message.clone()));
        }
        Ok(state.buying_power)
    }

    fn broker_name(&self) -> &'static str {
        "mock"
    }

    async fn health_check(&self) -> Result<(), BrokerError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn limit_order_fills_on_first_poll_by_default() {
        let broker = MockBroker::new();
        let request = SubmitOrder::limit("AAPL", OrderSide::Buy, dec!(10), dec!(150.00));
        let order = match broker.submit_order(&request).await {
            Ok(o) => o,
            Err(e) => panic!("submit failed: {e}"),
        };
        assert_eq!(order.status, OrderStatus::Accepted);

        let polled = match broker.get_order_status(&order.order_id).await {
            Ok(o) => o,
            Err(e) => panic!("poll failed: {e}"),
        };
        assert_eq!(polled.status, OrderStatus::Filled);
        assert_eq!(polled.filled_avg_price, Some(dec!(150.00)));
    }

    #[tokio::test]
    async fn fills_update_position_and_buying_power() {
        let broker = MockBroker::new();
        broker.set_position("AAPL", dec!(10));
        broker.set_buying_power(dec!(1000));

        let request = SubmitOrder::limit("AAPL", OrderSide::Sell, dec!(10), dec!(150.00));
        let order = match broker.submit_order(&request).await {
            Ok(o) => o,
            Err(e) => panic!("submit failed: {e}"),
        };
        let _ = broker.get_order_status(&order.order_id).await;

        let position = match broker.get_position("AAPL").await {
            Ok(p) => p,
            Err(e) => panic!("position failed: {e}"),
        };
        assert_eq!(position, Some(dec!(0)));
        let bp = match broker.get_buying_power().await {
            Ok(b) => b,
            Err(e) => panic!("buying power failed: {e}"),
        };
        assert_eq!(bp, dec!(2500));
    }

    #[tokio::test]
    async fn never_behavior_keeps_order_working_until_cancel() {
        let broker = MockBroker::new();
        broker.set_fill_behavior("AAPL", FillBehavior::Never);

        let request = SubmitOrder::limit("AAPL", OrderSide::Buy, dec!(5), dec!(150.00));
        let order = match broker.submit_order(&request).await {
            Ok(o) => o,
            Err(e) => panic!("submit failed: {e}"),
        };
        for _ in 0..3 {
            let polled = match broker.get_order_status(&order.order_id).await {
                Ok(o) => o,
                Err(e) => panic!("poll failed: {e}"),
            };
            assert_eq!(polled.status, OrderStatus::Accepted);
        }
        assert!(broker.cancel_order(&order.order_id).await.is_ok());
        let polled = match broker.get_order_status(&order.order_id).await {
            Ok(o) => o,
            Err(e) => panic!("poll failed: {e}"),
        };
        assert_eq!(polled.status, OrderStatus::Canceled);
        assert!(matches!(
            broker.cancel_order(&order.order_id).await,
            Err(BrokerError::OrderNotCancelable { .. })
        ));
    }

    #[tokio::test]
    async fn partial_then_stall_reports_one_partial() {
        let broker = MockBroker::new();
        broker.set_fill_behavior(
            "AAPL",
            FillBehavior::PartialThenStall {
                filled_quantity: dec!(4),
            },
        );

        let request = SubmitOrder::limit("AAPL", OrderSide::Buy, dec!(10), dec!(150.00));
        let order = match broker.submit_order(&request).await {
            Ok(o) => o,
            Err(e) => panic!("submit failed: {e}"),
        };
        let first = match broker.get_order_status(&order.order_id).await {
            Ok(o) => o,
            Err(e) => panic!("poll failed: {e}"),
        };
        assert_eq!(first.status, OrderStatus::PartiallyFilled);
        assert_eq!(first.filled_quantity, dec!(4));

        let second = match broker.get_order_status(&order.order_id).await {
            Ok(o) => o,
            Err(e) => panic!("poll failed: {e}"),
        };
        assert_eq!(second.filled_quantity, dec!(4));
    }

    #[tokio::test]
    async fn reject_after_polls_goes_terminal_with_no_fill() {
        let broker = MockBroker::new();
        broker.set_fill_behavior("AAPL", FillBehavior::RejectAfterPolls(2));

        let request = SubmitOrder::limit("AAPL", OrderSide::Buy, dec!(10), dec!(150.00));
        let order = match broker.submit_order(&request).await {
            Ok(o) => o,
            Err(e) => panic!("submit failed: {e}"),
        };
        let first = match broker.get_order_status(&order.order_id).await {
            Ok(o) => o,
            Err(e) => panic!("poll failed: {e}"),
        };
        assert_eq!(first.status, OrderStatus::Accepted);

        let second = match broker.get_order_status(&order.order_id).await {
            Ok(o) => o,
            Err(e) => panic!("poll failed: {e}"),
        };
        assert_eq!(second.status, OrderStatus::Rejected);
        assert_eq!(second.filled_quantity, dec!(0));
        assert!(matches!(
            broker.cancel_order(&order.order_id).await,
            Err(BrokerError::OrderNotCancelable { .. })
        ));
    }

    #[tokio::test]
    async fn scripted_rejection_applies_to_market_orders() {
        let broker = MockBroker::new();
        broker.set_quote(test_quote("AAPL", dec!(150.00), dec!(150.10)));
        broker.set_fill_behavior("AAPL", FillBehavior::RejectAfterPolls(1));

        let request = SubmitOrder::market("AAPL", OrderSide::Buy, dec!(10));
        let order = match broker.submit_order(&request).await {
            Ok(o) => o,
            Err(e) => panic!("submit failed: {e}"),
        };
        let polled = match broker.get_order_status(&order.order_id).await {
            Ok(o) => o,
            Err(e) => panic!("poll failed: {e}"),
        };
        assert_eq!(polled.status, OrderStatus::Rejected);
        assert_eq!(polled.filled_quantity, dec!(0));
    }

    #[tokio::test]
    async fn scripted_buying_power_failure_errors() {
        let broker = MockBroker::new();
        broker.set_buying_power(dec!(1000));
        broker.fail_buying_power("connection reset");
        assert!(matches!(
            broker.get_buying_power().await,
            Err(BrokerError::Network(_))
        ));
    }

    #[tokio::test]
    async fn market_orders_fill_at_far_touch() {
        let broker = MockBroker::new();
        broker.set_quote(test_quote("AAPL", dec!(150.00), dec!(150.10)));
        broker.set_fill_behavior("AAPL", FillBehavior::Never);

        let request = SubmitOrder::market("AAPL", OrderSide::Buy, dec!(10));
        let order = match broker.submit_order(&request).await {
            Ok(o) => o,
            Err(e) => panic!("submit failed: {e}"),
        };
        let polled = match broker.get_order_status(&order.order_id).await {
            Ok(o) => o,
            Err(e) => panic!("poll failed: {e}"),
        };
        assert_eq!(polled.status, OrderStatus::Filled);
        assert_eq!(polled.filled_avg_price, Some(dec!(150.10)));
    }
}
