//! The placement orchestrator.
//!
//! One intent goes in, one `OrderResult` comes out, always: every failure
//! mode is folded into the result rather than propagated, so a bad symbol
//! can never take down the batch.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::broker::{BrokerAdapter, BrokerError, ExponentialBackoff, RetryPolicy, SubmitOrder};
use crate::error::ExecutionError;
use crate::models::{
    CloseType, OrderIntent, OrderOutcome, OrderResult, OrderStatus, PlacedOrder, Quote, Urgency,
};
use crate::pricing::{WalkPlan, next_price};
use crate::quotes::QuoteService;
use crate::settlement::SettlementMonitor;

use super::reconcile::PortfolioValidator;
use super::validator::OrderValidator;

/// Cumulative fills across the limit ladder and any market escalation.
#[derive(Debug, Default, Clone, Copy)]
struct Fills {
    quantity: Decimal,
    notional: Decimal,
}

impl Fills {
    /// Fold in one order's terminal fill state. Each order is absorbed
    /// exactly once, at its terminal observation.
    fn absorb(&mut self, order: &PlacedOrder) {
        if order.filled_quantity > Decimal::ZERO {
            if let Some(price) = order.filled_avg_price {
                self.quantity += order.filled_quantity;
                self.notional += order.filled_quantity * price;
            }
        }
    }

    fn average(&self) -> Option<Decimal> {
        if self.quantity > Decimal::ZERO {
            Some(self.notional / self.quantity)
        } else {
            None
        }
    }
}

/// Executes one order intent end to end.
pub struct OrderPlacer {
    broker: Arc<dyn BrokerAdapter>,
    quotes: Arc<QuoteService>,
    validator: OrderValidator,
    monitor: SettlementMonitor,
    reconciler: PortfolioValidator,
    walk: WalkPlan,
    submit_retry: RetryPolicy,
}

impl OrderPlacer {
    /// Wire up a placer from its collaborators.
    pub fn new(
        broker: Arc<dyn BrokerAdapter>,
        quotes: Arc<QuoteService>,
        validator: OrderValidator,
        monitor: SettlementMonitor,
        reconciler: PortfolioValidator,
        walk: WalkPlan,
        submit_retry: RetryPolicy,
    ) -> Self {
        Self {
            broker,
            quotes,
            validator,
            monitor,
            reconciler,
            walk,
            submit_retry,
        }
    }

    /// Execute one intent: quote, validate, walk or market, settle,
    /// reconcile.
    pub async fn place(&self, intent: &OrderIntent) -> OrderResult {
        let quote = match self.quotes.get_quote(&intent.symbol).await {
            Ok(quote) => quote,
            Err(error) => {
                tracing::warn!(
                    symbol = %intent.symbol,
                    error = %error,
                    "Skipping intent: no usable quote"
                );
                return OrderResult::skipped(
                    &intent.symbol,
                    intent.side,
                    intent.quantity,
                    error.to_string(),
                );
            }
        };

        if let Err(error) = self.validator.validate(intent, &quote) {
            tracing::warn!(
                symbol = %intent.symbol,
                error = %error,
                "Skipping intent: validation failed"
            );
            metrics::counter!("orders_skipped_total").increment(1);
            return OrderResult::skipped(
                &intent.symbol,
                intent.side,
                intent.quantity,
                error.to_string(),
            );
        }

        let pre_trade = match self.broker.get_position(&intent.symbol).await {
            Ok(position) => Some(position.unwrap_or(Decimal::ZERO)),
            Err(error) => {
                tracing::warn!(
                    symbol = %intent.symbol,
                    error = %error,
                    "Pre-trade position unavailable, reconciliation will be skipped"
                );
                None
            }
        };

        let result = if intent.urgency == Urgency::High {
            self.execute_market(intent, intent.quantity, Fills::default(), 0, false)
                .await
        } else {
            self.execute_walk(intent, quote).await
        };

        if result.placed() {
            if let Some(pre_trade) = pre_trade {
                self.reconcile(intent, pre_trade, &result).await;
            }
        }
        result
    }

    /// Walk the book: submit at each ladder step against a fresh quote,
    /// cancel-and-replace the remaining quantity, escalate to market once
    /// the repeg budget is spent.
    async fn execute_walk(&self, intent: &OrderIntent, first_quote: Quote) -> OrderResult {
        let mut fills = Fills::default();
        let mut repegs: u32 = 0;
        let mut quote = first_quote;
        let mut remaining = intent.quantity;
        let mut last_order_id: Option<String> = None;

        for step in &self.walk.steps {
            if repegs >= self.walk.max_repegs {
                break;
            }

            let price = next_price(&quote, intent.side, step.fraction);
            let request = SubmitOrder::limit(&intent.symbol, intent.side, remaining, price);
            tracing::info!(
                symbol = %intent.symbol,
                side = %intent.side,
                quantity = %remaining,
                limit_price = %price,
                fraction = %step.fraction,
                "Submitting walk step"
            );
            let order = match self.submit_with_retry(&request).await {
                Ok(order) => order,
                Err(error) => {
                    return Self::error_result(intent, fills, repegs, last_order_id, &error);
                }
            };
            last_order_id = Some(order.order_id.clone());

            let state = match self.monitor.wait_for_fill(&order, step.wait).await {
                Ok(state) => state,
                Err(error) => {
                    return Self::error_result(intent, fills, repegs, last_order_id, &error);
                }
            };
            if state.status == OrderStatus::Filled {
                fills.absorb(&state);
                return Self::build_result(
                    intent,
                    fills,
                    repegs,
                    last_order_id,
                    OrderOutcome::Filled,
                    None,
                );
            }
            // A broker-terminal rejection is not "unfilled": it must not
            // be repegged or escalated
            if matches!(state.status, OrderStatus::Rejected | OrderStatus::Expired) {
                fills.absorb(&state);
                return Self::broker_ended_result(intent, fills, repegs, last_order_id, state.status);
            }

            let terminal = match self.cancel_and_confirm(&state).await {
                Ok(terminal) => terminal,
                Err(error) => {
                    return Self::error_result(intent, fills, repegs, last_order_id, &error);
                }
            };
            fills.absorb(&terminal);
            remaining = intent.quantity - fills.quantity;
            if terminal.status == OrderStatus::Filled || remaining <= Decimal::ZERO {
                return Self::build_result(
                    intent,
                    fills,
                    repegs,
                    last_order_id,
                    OrderOutcome::Filled,
                    None,
                );
            }
            if matches!(terminal.status, OrderStatus::Rejected | OrderStatus::Expired) {
                return Self::broker_ended_result(
                    intent,
                    fills,
                    repegs,
                    last_order_id,
                    terminal.status,
                );
            }

            repegs += 1;
            metrics::counter!("repegs_total").increment(1);
            tracing::info!(
                symbol = %intent.symbol,
                repegs = repegs,
                filled = %fills.quantity,
                remaining = %remaining,
                "Walk step unfilled, repegging"
            );

            // Every pricing decision re-queries; a dead quote source at
            // this point escalates rather than pricing on stale data
            match self.quotes.get_quote(&intent.symbol).await {
                Ok(fresh) => quote = fresh,
                Err(error) => {
                    tracing::warn!(
                        symbol = %intent.symbol,
                        error = %error,
                        "Quote unavailable mid-walk, escalating to market"
                    );
                    break;
                }
            }
        }

        self.execute_market(intent, remaining, fills, repegs, true)
            .await
    }

    /// Submit a market order for the remaining quantity and wait for it
    /// to settle.
    async fn execute_market(
        &self,
        intent: &OrderIntent,
        remaining: Decimal,
        mut fills: Fills,
        repegs: u32,
        escalated: bool,
    ) -> OrderResult {
        if remaining <= Decimal::ZERO {
            return Self::build_result(intent, fills, repegs, None, OrderOutcome::Filled, None);
        }
        if escalated {
            metrics::counter!("market_escalations_total").increment(1);
            tracing::info!(
                symbol = %intent.symbol,
                remaining = %remaining,
                repegs = repegs,
                "Escalating to market order"
            );
        }

        let request = SubmitOrder::market(&intent.symbol, intent.side, remaining);
        let order = match self.submit_with_retry(&request).await {
            Ok(order) => order,
            Err(error) => return Self::error_result(intent, fills, repegs, None, &error),
        };

        match self.monitor.await_terminal(&order).await {
            Ok(state) => {
                fills.absorb(&state);
                let (outcome, reason) = if fills.quantity >= intent.quantity {
                    (OrderOutcome::FilledViaMarket, None)
                } else if fills.quantity > Decimal::ZERO {
                    (
                        OrderOutcome::PartiallyFilled,
                        Some(format!("market order ended {:?} short of request", state.status)),
                    )
                } else {
                    (
                        OrderOutcome::Failed,
                        Some(format!("market order ended {:?} with no fill", state.status)),
                    )
                };
                Self::build_result(
                    intent,
                    fills,
                    repegs,
                    Some(order.order_id),
                    outcome,
                    reason,
                )
            }
            Err(error) => {
                Self::error_result(intent, fills, repegs, Some(order.order_id), &error)
            }
        }
    }

    /// Cancel a working order and wait for its terminal state, tolerating
    /// the fill-during-cancel race.
    async fn cancel_and_confirm(
        &self,
        order: &PlacedOrder,
    ) -> Result<PlacedOrder, ExecutionError> {
        match self.broker.cancel_order(&order.order_id).await {
            Ok(()) => {}
            // The order went terminal while we were deciding to cancel;
            // the status poll below picks up whatever it became
            Err(BrokerError::OrderNotCancelable { .. }) => {}
            Err(error) => {
                return Err(ExecutionError::from_broker(
                    &order.symbol,
                    Some(order.order_id.clone()),
                    error,
                ));
            }
        }
        self.monitor.await_terminal(order).await
    }

    /// Submit with bounded backoff on transient failures only.
    async fn submit_with_retry(
        &self,
        request: &SubmitOrder,
    ) -> Result<PlacedOrder, ExecutionError> {
        let mut backoff = ExponentialBackoff::new(&self.submit_retry);
        loop {
            match self.broker.submit_order(request).await {
                Ok(order) => {
                    metrics::counter!("orders_submitted_total").increment(1);
                    return Ok(order);
                }
                Err(error) if error.is_transient() => {
                    if let Some(delay) = backoff.next_backoff() {
                        tracing::warn!(
                            symbol = %request.symbol,
                            error = %error,
                            delay_ms = delay.as_millis(),
                            "Transient submit failure, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(ExecutionError::from_broker(&request.symbol, None, error));
                }
                Err(error) => {
                    return Err(ExecutionError::from_broker(&request.symbol, None, error));
                }
            }
        }
    }

    async fn reconcile(&self, intent: &OrderIntent, pre_trade: Decimal, result: &OrderResult) {
        let signed_delta = result.filled_shares * Decimal::from(intent.side.sign());
        let full_exit = intent.close_type == CloseType::FullExit;
        match self
            .reconciler
            .check(&intent.symbol, pre_trade, signed_delta, full_exit)
            .await
        {
            Ok(_check) => {}
            Err(error) => {
                tracing::warn!(
                    symbol = %intent.symbol,
                    error = %error,
                    "Reconciliation could not run"
                );
            }
        }
    }

    fn build_result(
        intent: &OrderIntent,
        fills: Fills,
        repegs: u32,
        order_id: Option<String>,
        outcome: OrderOutcome,
        reason: Option<String>,
    ) -> OrderResult {
        OrderResult {
            symbol: intent.symbol.clone(),
            side: intent.side,
            requested_shares: intent.quantity,
            filled_shares: fills.quantity,
            average_price: fills.average(),
            outcome,
            skipped: false,
            reason,
            order_id,
            repegs,
        }
    }

    /// Result for an order the broker ended (rejected or expired) while
    /// it was working. Prior partial fills are preserved; with no fill at
    /// all the order is a failure.
    fn broker_ended_result(
        intent: &OrderIntent,
        fills: Fills,
        repegs: u32,
        order_id: Option<String>,
        status: OrderStatus,
    ) -> OrderResult {
        let outcome = if fills.quantity > Decimal::ZERO {
            OrderOutcome::PartiallyFilled
        } else {
            OrderOutcome::Failed
        };
        tracing::error!(
            symbol = %intent.symbol,
            status = ?status,
            filled = %fills.quantity,
            "Broker ended working order"
        );
        Self::build_result(
            intent,
            fills,
            repegs,
            order_id,
            outcome,
            Some(format!("broker ended order {status:?}")),
        )
    }

    fn error_result(
        intent: &OrderIntent,
        fills: Fills,
        repegs: u32,
        order_id: Option<String>,
        error: &ExecutionError,
    ) -> OrderResult {
        let outcome = if fills.quantity > Decimal::ZERO {
            OrderOutcome::PartiallyFilled
        } else if matches!(error, ExecutionError::SettlementTimeout { .. }) {
            OrderOutcome::SettlementTimeout
        } else {
            OrderOutcome::Failed
        };
        tracing::error!(
            symbol = %intent.symbol,
            error = %error,
            filled = %fills.quantity,
            "Order ended in failure"
        );
        Self::build_result(intent, fills, repegs, order_id, outcome, Some(error.to_string()))
    }
}
