//! Engine assembly.
//!
//! Wires configuration, a broker adapter, and an optional streaming feed
//! into the executing pipeline. The broker stays behind its trait so the
//! whole engine runs against the in-process mock in tests.

use std::sync::Arc;

use crate::broker::{BrokerAdapter, RetryPolicy};
use crate::config::{Config, ConfigError};
use crate::execution::{
    BatchExecutor, BatchSettings, InMemoryIntentStore, IntentStore, OrderPlacer,
    OrderValidator, PortfolioValidator, ValidatorSettings,
};
use crate::models::{ExecutionResult, OrderIntent};
use crate::quotes::{QuoteFeed, QuoteService};
use crate::settlement::SettlementMonitor;

/// The fully wired execution engine.
pub struct Engine {
    executor: BatchExecutor,
}

impl Engine {
    /// Assemble an engine from configuration.
    ///
    /// Pass `None` for `feed` to run REST-only. Buy intents are staged in
    /// memory; [`Engine::with_staging`] swaps in a durable store.
    pub fn from_config(
        config: &Config,
        broker: Arc<dyn BrokerAdapter>,
        feed: Option<Arc<QuoteFeed>>,
    ) -> Result<Self, ConfigError> {
        Self::with_staging(config, broker, feed, Arc::new(InMemoryIntentStore::new()))
    }

    /// Assemble an engine with an explicit staging store.
    pub fn with_staging(
        config: &Config,
        broker: Arc<dyn BrokerAdapter>,
        feed: Option<Arc<QuoteFeed>>,
        staging: Arc<dyn IntentStore>,
    ) -> Result<Self, ConfigError> {
        let quote_settings = config.quotes.to_settings()?;
        let quotes = Arc::new(QuoteService::new(
            feed,
            Arc::clone(&broker),
            quote_settings.clone(),
        ));

        let validator = OrderValidator::new(ValidatorSettings {
            min_notional: crate::config::decimal_field(
                "execution.min_notional",
                config.execution.min_notional,
            )?,
            max_spread_fraction: quote_settings.max_spread_fraction,
            require_sizes: quote_settings.require_sizes,
        });

        let monitor = SettlementMonitor::new(
            Arc::clone(&broker),
            config.settlement.to_settlement_settings(),
        );

        let reconciler = PortfolioValidator::new(
            Arc::clone(&broker),
            config.execution.to_reconcile_settings()?,
        );

        let submit_retry: RetryPolicy = config.broker.retry.to_policy();

        let placer = Arc::new(OrderPlacer::new(
            Arc::clone(&broker),
            Arc::clone(&quotes),
            validator,
            monitor,
            reconciler,
            config.pricing.to_plan()?,
            submit_retry,
        ));

        let executor = BatchExecutor::new(
            placer,
            broker,
            quotes,
            staging,
            BatchSettings {
                max_concurrent_orders: config.execution.max_concurrent_orders,
                threshold: config.settlement.to_threshold_settings(),
                buying_power: config.settlement.to_buying_power_settings(),
            },
        );

        Ok(Self { executor })
    }

    /// Execute one batch of intents.
    pub async fn execute_batch(&self, intents: Vec<OrderIntent>) -> ExecutionResult {
        self.executor.execute(intents).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::MockBroker;
    use crate::broker::mock::test_quote;
    use crate::models::{CloseType, ExecutionStatus, OrderSide, Urgency};
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn engine_assembles_and_executes_from_default_config() {
        let config = Config::default();
        let broker = Arc::new(MockBroker::new());
        broker.set_quote(test_quote("AAPL", dec!(100.00), dec!(100.10)));
        broker.set_position("AAPL", dec!(5));

        let engine = match Engine::from_config(
            &config,
            Arc::clone(&broker) as Arc<dyn BrokerAdapter>,
            None,
        ) {
            Ok(engine) => engine,
            Err(e) => panic!("assembly failed: {e}"),
        };

        let result = engine
            .execute_batch(vec![OrderIntent {
                symbol: "AAPL".to_string(),
                side: OrderSide::Sell,
                close_type: CloseType::Partial,
                quantity: dec!(5),
                urgency: Urgency::Medium,
            }])
            .await;
        assert_eq!(result.status, ExecutionStatus::Success);
    }
}
