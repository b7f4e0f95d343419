//! Per-order and batch-level execution results.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::order::OrderSide;

/// How a single order ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderOutcome {
    /// Fully filled via limit orders.
    Filled,
    /// Fully filled after escalating to a market order.
    FilledViaMarket,
    /// Some quantity filled, remainder never completed.
    PartiallyFilled,
    /// Skipped before submission (validation or data-quality failure).
    Skipped,
    /// Submitted (or attempted) and failed.
    Failed,
    /// Buy aborted by a failed funding barrier, never submitted.
    Aborted,
    /// Reached neither a fill nor another terminal state before the deadline.
    SettlementTimeout,
}

/// The outcome of one order intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResult {
    /// Stock symbol.
    pub symbol: String,
    /// Buy or sell.
    pub side: OrderSide,
    /// Shares requested.
    pub requested_shares: Decimal,
    /// Shares filled.
    pub filled_shares: Decimal,
    /// Volume-weighted average fill price across all fills.
    pub average_price: Option<Decimal>,
    /// How the order ended.
    pub outcome: OrderOutcome,
    /// True when the order was intentionally skipped before submission.
    pub skipped: bool,
    /// Reason for a skip or failure.
    pub reason: Option<String>,
    /// Broker order ID of the final order, when one was submitted.
    pub order_id: Option<String>,
    /// Repeg (cancel-and-replace) count during the walk.
    pub repegs: u32,
}

impl OrderResult {
    /// A result for an intent skipped before any broker interaction.
    #[must_use]
    pub fn skipped(
        symbol: impl Into<String>,
        side: OrderSide,
        requested: Decimal,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            requested_shares: requested,
            filled_shares: Decimal::ZERO,
            average_price: None,
            outcome: OrderOutcome::Skipped,
            skipped: true,
            reason: Some(reason.into()),
            order_id: None,
            repegs: 0,
        }
    }

    /// A result for an intent that failed before or during submission.
    #[must_use]
    pub fn failed(
        symbol: impl Into<String>,
        side: OrderSide,
        requested: Decimal,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            requested_shares: requested,
            filled_shares: Decimal::ZERO,
            average_price: None,
            outcome: OrderOutcome::Failed,
            skipped: false,
            reason: Some(reason.into()),
            order_id: None,
            repegs: 0,
        }
    }

    /// A result for a buy intent aborted by a failed funding barrier.
    ///
    /// Aborted buys count as placed, not skipped: a barrier failure is an
    /// execution failure and must never classify as a clean success.
    #[must_use]
    pub fn aborted(
        symbol: impl Into<String>,
        side: OrderSide,
        requested: Decimal,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            outcome: OrderOutcome::Aborted,
            ..Self::failed(symbol, side, requested, reason)
        }
    }

    /// Whether this order counts toward batch success: a complete fill.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        matches!(
            self.outcome,
            OrderOutcome::Filled | OrderOutcome::FilledViaMarket
        )
    }

    /// Whether the engine committed this order to the broker path
    /// (everything that was not an intentional pre-submission skip).
    #[must_use]
    pub const fn placed(&self) -> bool {
        !self.skipped
    }
}

/// Batch-level status, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    /// Every placed order succeeded, nothing skipped.
    Success,
    /// Every placed order succeeded, some intents skipped.
    SuccessWithSkips,
    /// Some placed orders succeeded, some failed.
    PartialSuccess,
    /// No placed order succeeded (or nothing was placed at all).
    Failure,
}

/// The outcome of one batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Per-order results, in completion order.
    pub orders: Vec<OrderResult>,
    /// Orders committed to the broker path.
    pub orders_placed: usize,
    /// Orders that fully filled.
    pub orders_succeeded: usize,
    /// Intents skipped before submission.
    pub orders_skipped: usize,
    /// Batch classification.
    pub status: ExecutionStatus,
    /// True only for `Success` and `SuccessWithSkips`.
    pub success: bool,
}
