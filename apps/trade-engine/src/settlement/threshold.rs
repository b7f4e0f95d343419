//! Settlement-threshold wait for the sell phase.
//!
//! The buy phase must not start until enough sell value has settled. This
//! polls the given sell orders and accumulates their settled value; a
//! seen-orders set guarantees each order contributes at most once no
//! matter how many polling passes observe it.

use std::collections::HashSet;
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::time::Instant;

use crate::broker::BrokerAdapter;
use crate::models::SettlementRecord;

/// Threshold-wait tunables.
#[derive(Debug, Clone)]
pub struct ThresholdSettings {
    /// Sleep between polling passes.
    pub poll_interval: Duration,
    /// Deadline for reaching the target.
    pub max_wait: Duration,
}

impl Default for ThresholdSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            max_wait: Duration::from_secs(120),
        }
    }
}

/// What the wait observed.
#[derive(Debug)]
pub struct ThresholdOutcome {
    /// Total settled value accumulated (each order counted once).
    pub settled_value: Decimal,
    /// Records for every counted order.
    pub records: Vec<SettlementRecord>,
    /// Whether the target was reached before the deadline.
    pub reached: bool,
}

/// Poll `order_ids` until their cumulative settled value reaches
/// `target`, every order is terminal, or the deadline passes.
pub async fn wait_for_settlement_threshold(
    broker: &dyn BrokerAdapter,
    order_ids: &[String],
    target: Decimal,
    settings: &ThresholdSettings,
) -> ThresholdOutcome {
    let deadline = Instant::now() + settings.max_wait;
    let mut seen: HashSet<String> = HashSet::new();
    let mut settled_value = Decimal::ZERO;
    let mut records = Vec::new();

    loop {
        for order_id in order_ids {
            if seen.contains(order_id) {
                continue;
            }
            match broker.get_order_status(order_id).await {
                Ok(state) => {
                    if !state.status.is_terminal() {
                        continue;
                    }
                    // Terminal: count once and never poll again
                    seen.insert(order_id.clone());
                    if let Some(record) = SettlementRecord::from_order(&state) {
                        settled_value += record.settled_value;
                        records.push(record);
                    }
                }
                Err(e) if e.is_transient() => {
                    tracing::warn!(
                        order_id = %order_id,
                        error = %e,
                        "Transient error polling settlement"
                    );
                }
                Err(e) => {
                    tracing::error!(
                        order_id = %order_id,
                        error = %e,
                        "Order dropped from settlement wait"
                    );
                    seen.insert(order_id.clone());
                }
            }
        }

        if settled_value >= target {
            return ThresholdOutcome {
                settled_value,
                records,
                reached: true,
            };
        }
        // Every order is terminal: the total can never grow
        if seen.len() == order_ids.len() {
            return ThresholdOutcome {
                settled_value,
                records,
                reached: settled_value >= target,
            };
        }
        if Instant::now() >= deadline {
            tracing::warn!(
                settled_value = %settled_value,
                target = %target,
                "Settlement threshold wait timed out"
            );
            return ThresholdOutcome {
                settled_value,
                records,
                reached: false,
            };
        }
        tokio::time::sleep(settings.poll_interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::mock::{FillBehavior, MockBroker, test_quote};
    use crate::broker::{BrokerAdapter as _, SubmitOrder};
    use crate::models::OrderSide;
    use rust_decimal_macros::dec;

    fn fast_settings() -> ThresholdSettings {
        ThresholdSettings {
            poll_interval: Duration::from_millis(5),
            max_wait: Duration::from_millis(200),
        }
    }

    async fn submit_sell(broker: &MockBroker, symbol: &str, qty: Decimal, price: Decimal) -> String {
        broker.set_quote(test_quote(symbol, price - dec!(0.05), price + dec!(0.05)));
        let request = SubmitOrder::limit(symbol, OrderSide::Sell, qty, price);
        match broker.submit_order(&request).await {
            Ok(o) => o.order_id,
            Err(e) => panic!("submit failed: {e}"),
        }
    }

    #[tokio::test]
    async fn reaches_target_once_sells_settle() {
        let broker = MockBroker::new();
        broker.set_fill_behavior("AAPL", FillBehavior::AfterPolls(2));
        broker.set_fill_behavior("MSFT", FillBehavior::AfterPolls(3));
        let ids = vec![
            submit_sell(&broker, "AAPL", dec!(10), dec!(100.00)).await,
            submit_sell(&broker, "MSFT", dec!(5), dec!(200.00)).await,
        ];

        let outcome =
            wait_for_settlement_threshold(&broker, &ids, dec!(1900), &fast_settings()).await;
        assert!(outcome.reached);
        assert_eq!(outcome.settled_value, dec!(2000.00));
        assert_eq!(outcome.records.len(), 2);
    }

    #[tokio::test]
    async fn each_order_counts_at_most_once() {
        let broker = MockBroker::new();
        let ids = vec![submit_sell(&broker, "AAPL", dec!(10), dec!(100.00)).await];

        // Target is unreachable, so the loop keeps polling until every
        // order is terminal. The settled value must equal one fill.
        let outcome =
            wait_for_settlement_threshold(&broker, &ids, dec!(1_000_000), &fast_settings()).await;
        assert!(!outcome.reached);
        assert_eq!(outcome.settled_value, dec!(1000.00));
        assert_eq!(outcome.records.len(), 1);
    }

    #[tokio::test]
    async fn deadline_ends_wait_with_reached_false() {
        let broker = MockBroker::new();
        broker.set_fill_behavior("AAPL", FillBehavior::Never);
        let ids = vec![submit_sell(&broker, "AAPL", dec!(10), dec!(100.00)).await];

        let outcome = wait_for_settlement_threshold(&broker, &ids, dec!(500), &fast_settings()).await;
        assert!(!outcome.reached);
        assert_eq!(outcome.settled_value, Decimal::ZERO);
    }

    #[tokio::test]
    async fn zero_target_is_immediately_reached() {
        let broker = MockBroker::new();
        let outcome =
            wait_for_settlement_threshold(&broker, &[], Decimal::ZERO, &fast_settings()).await;
        assert!(outcome.reached);
    }
}
