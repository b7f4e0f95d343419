//! End-to-end batch execution against the in-process mock broker.

use std::sync::Arc;

use rust_decimal_macros::dec;

use trade_engine::broker::mock::test_quote;
use trade_engine::models::{CloseType, ExecutionStatus, OrderOutcome, Urgency};
use trade_engine::{
    BrokerAdapter, Engine, MockBroker, OrderIntent, OrderSide, load_config_from_string,
};

const FAST_CONFIG: &str = r"
quotes:
  streaming_wait_ms: 1
  max_quote_age_ms: 2000
pricing:
  steps:
    - { fraction: 0.75, wait_ms: 20 }
    - { fraction: 0.85, wait_ms: 20 }
    - { fraction: 0.95, wait_ms: 20 }
  max_repegs: 3
settlement:
  poll_interval_ms: 2
  max_wait_secs: 1
  threshold:
    poll_interval_ms: 2
    max_wait_secs: 1
  buying_power:
    initial_backoff_ms: 2
    max_backoff_ms: 10
    max_attempts: 3
execution:
  max_concurrent_orders: 4
  reconcile:
    grace_ms: 1
    tolerance: 0.001
";

fn engine(broker: &Arc<MockBroker>) -> Engine {
    let config = match load_config_from_string(FAST_CONFIG) {
        Ok(c) => c,
        Err(e) => panic!("test config rejected: {e}"),
    };
    match Engine::from_config(
        &config,
        Arc::clone(broker) as Arc<dyn BrokerAdapter>,
        None,
    ) {
        Ok(engine) => engine,
        Err(e) => panic!("engine assembly failed: {e}"),
    }
}

fn intent(symbol: &str, side: OrderSide, quantity: rust_decimal::Decimal) -> OrderIntent {
    OrderIntent {
        symbol: symbol.to_string(),
        side,
        close_type: CloseType::Partial,
        quantity,
        urgency: Urgency::Medium,
    }
}

#[tokio::test]
async fn mixed_batch_runs_sells_before_buys_and_reports_skips() {
    let broker = Arc::new(MockBroker::new());
    broker.set_quote(test_quote("AAPL", dec!(100.00), dec!(100.10)));
    broker.set_quote(test_quote("MSFT", dec!(200.00), dec!(200.10)));
    // Inverted quote, fails validation on both acquisition paths
    broker.set_quote(test_quote("BADQ", dec!(50.20), dec!(50.10)));
    broker.set_position("AAPL", dec!(10));
    broker.set_position("BADQ", dec!(3));
    // No spare cash: the buy is funded entirely by the sell proceeds
    broker.set_buying_power(dec!(0));

    let result = engine(&broker)
        .execute_batch(vec![
            intent("MSFT", OrderSide::Buy, dec!(4)),
            intent("AAPL", OrderSide::Sell, dec!(10)),
            intent("BADQ", OrderSide::Sell, dec!(3)),
        ])
        .await;

    assert_eq!(result.status, ExecutionStatus::SuccessWithSkips);
    assert_eq!(result.orders_placed, 2);
    assert_eq!(result.orders_succeeded, 2);
    assert_eq!(result.orders_skipped, 1);

    let skipped = result
        .orders
        .iter()
        .find(|o| o.symbol == "BADQ")
        .map(|o| o.outcome);
    assert_eq!(skipped, Some(OrderOutcome::Skipped));

    // Every sell reaches the broker before any buy does
    let submissions = broker.submissions();
    let first_buy = submissions
        .iter()
        .position(|s| s.side == OrderSide::Buy)
        .unwrap_or(submissions.len());
    assert!(
        submissions[..first_buy]
            .iter()
            .all(|s| s.side == OrderSide::Sell)
    );
    assert!(
        submissions[first_buy..]
            .iter()
            .all(|s| s.side == OrderSide::Buy)
    );
}

#[tokio::test]
async fn sell_proceeds_fund_the_buy_phase() {
    let broker = Arc::new(MockBroker::new());
    broker.set_quote(test_quote("AAPL", dec!(100.00), dec!(100.10)));
    broker.set_quote(test_quote("MSFT", dec!(200.00), dec!(200.10)));
    broker.set_position("AAPL", dec!(10));
    broker.set_buying_power(dec!(0));

    let result = engine(&broker)
        .execute_batch(vec![
            intent("AAPL", OrderSide::Sell, dec!(10)),
            intent("MSFT", OrderSide::Buy, dec!(4)),
        ])
        .await;

    assert_eq!(result.status, ExecutionStatus::Success);
    assert_eq!(result.orders_succeeded, 2);
    assert!(result.success);

    let buy = result
        .orders
        .iter()
        .find(|o| o.side == OrderSide::Buy)
        .map(|o| o.outcome);
    assert_eq!(buy, Some(OrderOutcome::Filled));
}

#[tokio::test]
async fn high_urgency_goes_straight_to_market() {
    let broker = Arc::new(MockBroker::new());
    broker.set_quote(test_quote("AAPL", dec!(100.00), dec!(100.10)));
    broker.set_position("AAPL", dec!(5));

    let mut sell = intent("AAPL", OrderSide::Sell, dec!(5));
    sell.urgency = Urgency::High;

    let result = engine(&broker).execute_batch(vec![sell]).await;

    assert_eq!(result.status, ExecutionStatus::Success);
    let outcome = result.orders.first().map(|o| o.outcome);
    assert_eq!(outcome, Some(OrderOutcome::FilledViaMarket));

    let submissions = broker.submissions();
    assert_eq!(submissions.len(), 1);
    assert!(submissions[0].limit_price.is_none());
}

#[tokio::test]
async fn full_exit_sell_reconciles_flat() {
    let broker = Arc::new(MockBroker::new());
    broker.set_quote(test_quote("AAPL", dec!(100.00), dec!(100.10)));
    broker.set_position("AAPL", dec!(7));

    let mut sell = intent("AAPL", OrderSide::Sell, dec!(7));
    sell.close_type = CloseType::FullExit;

    let result = engine(&broker).execute_batch(vec![sell]).await;

    assert_eq!(result.status, ExecutionStatus::Success);
    // The mock applied the fill, so the position is flat afterward
    let position = match broker.get_position("AAPL").await {
        Ok(p) => p,
        Err(e) => panic!("position fetch failed: {e}"),
    };
    assert_eq!(position.unwrap_or(rust_decimal::Decimal::ZERO), dec!(0));
}
