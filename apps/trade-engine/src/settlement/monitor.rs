//! Per-order settlement polling.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::broker::BrokerAdapter;
use crate::error::ExecutionError;
use crate::models::{PlacedOrder, SettlementRecord};

/// Polling tunables.
#[derive(Debug, Clone)]
pub struct SettlementSettings {
    /// Sleep between status polls.
    pub poll_interval: Duration,
    /// Deadline for reaching a terminal state.
    pub max_wait: Duration,
}

impl Default for SettlementSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            max_wait: Duration::from_secs(60),
        }
    }
}

/// Polls orders until they settle, emitting settlement records as events.
pub struct SettlementMonitor {
    broker: Arc<dyn BrokerAdapter>,
    settings: SettlementSettings,
    events: Option<mpsc::UnboundedSender<SettlementRecord>>,
}

impl SettlementMonitor {
    /// Build a monitor over a broker.
    pub fn new(broker: Arc<dyn BrokerAdapter>, settings: SettlementSettings) -> Self {
        Self {
            broker,
            settings,
            events: None,
        }
    }

    /// Emit a `SettlementRecord` on this channel for every observed fill.
    #[must_use]
    pub fn with_events(mut self, events: mpsc::UnboundedSender<SettlementRecord>) -> Self {
        self.events = Some(events);
        self
    }

    /// Poll until the order reaches a terminal state.
    ///
    /// Transient broker failures during polling are absorbed until the
    /// deadline; passing `max_wait` without a terminal state is a
    /// `SettlementTimeout`.
    pub async fn await_terminal(&self, order: &PlacedOrder) -> Result<PlacedOrder, ExecutionError> {
        let deadline = Instant::now() + self.settings.max_wait;

        loop {
            match self.broker.get_order_status(&order.order_id).await {
                Ok(state) => {
                    if state.status.is_terminal() {
                        self.emit(&state);
                        return Ok(state);
                    }
                    tracing::debug!(
                        order_id = %state.order_id,
                        symbol = %state.symbol,
                        status = ?state.status,
                        filled = %state.filled_quantity,
                        "Order not yet terminal"
                    );
                }
                Err(e) if e.is_transient() => {
                    tracing::warn!(
                        order_id = %order.order_id,
                        error = %e,
                        "Transient error polling order status"
                    );
                }
                Err(e) => {
                    return Err(ExecutionError::from_broker(
                        &order.symbol,
                        Some(order.order_id.clone()),
                        e,
                    ));
                }
            }

            if Instant::now() >= deadline {
                metrics::counter!("settlement_timeouts_total").increment(1);
                return Err(ExecutionError::SettlementTimeout {
                    symbol: order.symbol.clone(),
                    order_id: order.order_id.clone(),
                    waited_secs: self.settings.max_wait.as_secs(),
                });
            }
            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }

    /// Let an order work for `window`, polling at the configured interval.
    ///
    /// Returns the last observed state whether or not the order finished;
    /// the caller (the walk loop) decides whether to repeg.
    pub async fn wait_for_fill(
        &self,
        order: &PlacedOrder,
        window: Duration,
    ) -> Result<PlacedOrder, ExecutionError> {
        let deadline = Instant::now() + window;
        let mut last = order.clone();

        loop {
            match self.broker.get_order_status(&order.order_id).await {
                Ok(state) => {
                    if state.status.is_terminal() {
                        self.emit(&state);
                        return Ok(state);
                    }
                    last = state;
                }
                Err(e) if e.is_transient() => {
                    tracing::warn!(
                        order_id = %order.order_id,
                        error = %e,
                        "Transient error polling order status"
                    );
                }
                Err(e) => {
                    return Err(ExecutionError::from_broker(
                        &order.symbol,
                        Some(order.order_id.clone()),
                        e,
                    ));
                }
            }

            if Instant::now() >= deadline {
                return Ok(last);
            }
            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }

    fn emit(&self, order: &PlacedOrder) {
        let Some(events) = &self.events else {
            return;
        };
        if let Some(record) = SettlementRecord::from_order(order) {
            // Receiver may already be gone during shutdown
            let _ = events.send(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::mock::{FillBehavior, MockBroker, test_quote};
    use crate::broker::{BrokerAdapter, SubmitOrder};
    use crate::models::{OrderSide, OrderStatus};
    use rust_decimal_macros::dec;

    fn fast_settings() -> SettlementSettings {
        SettlementSettings {
            poll_interval: Duration::from_millis(5),
            max_wait: Duration::from_millis(100),
        }
    }

    async fn submit(broker: &MockBroker) -> PlacedOrder {
        broker.set_quote(test_quote("AAPL", dec!(100.00), dec!(100.10)));
        let request = SubmitOrder::limit("AAPL", OrderSide::Sell, dec!(10), dec!(100.05));
        match broker.submit_order(&request).await {
            Ok(o) => o,
            Err(e) => panic!("submit failed: {e}"),
        }
    }

    #[tokio::test]
    async fn await_terminal_returns_filled_order() {
        let broker = Arc::new(MockBroker::new());
        broker.set_fill_behavior("AAPL", FillBehavior::AfterPolls(3));
        let order = submit(&broker).await;

        let monitor = SettlementMonitor::new(broker, fast_settings());
        let settled = match monitor.await_terminal(&order).await {
            Ok(o) => o,
            Err(e) => panic!("await_terminal failed: {e}"),
        };
        assert_eq!(settled.status, OrderStatus::Filled);
        assert_eq!(settled.filled_quantity, dec!(10));
    }

    #[tokio::test]
    async fn await_terminal_times_out_on_working_order() {
        let broker = Arc::new(MockBroker::new());
        broker.set_fill_behavior("AAPL", FillBehavior::Never);
        let order = submit(&broker).await;

        let monitor = SettlementMonitor::new(broker, fast_settings());
        let result = monitor.await_terminal(&order).await;
        assert!(matches!(
            result,
            Err(ExecutionError::SettlementTimeout { .. })
        ));
    }

    #[tokio::test]
    async fn fill_emits_settlement_record() {
        let broker = Arc::new(MockBroker::new());
        let order = submit(&broker).await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let monitor = SettlementMonitor::new(broker, fast_settings()).with_events(tx);
        let settled = match monitor.await_terminal(&order).await {
            Ok(o) => o,
            Err(e) => panic!("await_terminal failed: {e}"),
        };

        let record = match rx.recv().await {
            Some(r) => r,
            None => panic!("expected settlement record"),
        };
        assert_eq!(record.order_id, settled.order_id);
        assert_eq!(record.settled_value, dec!(10) * dec!(100.05));
    }

    #[tokio::test]
    async fn wait_for_fill_returns_last_state_without_error() {
        let broker = Arc::new(MockBroker::new());
        broker.set_fill_behavior("AAPL", FillBehavior::Never);
        let order = submit(&broker).await;

        let monitor = SettlementMonitor::new(broker, fast_settings());
        let state = match monitor.wait_for_fill(&order, Duration::from_millis(20)).await {
            Ok(o) => o,
            Err(e) => panic!("wait_for_fill failed: {e}"),
        };
        assert_eq!(state.status, OrderStatus::Accepted);
    }
}
