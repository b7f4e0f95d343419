//! Two-phase batch execution.
//!
//! Sells run first under bounded concurrency. The buy phase starts only
//! after enough sell value has settled and the account's buying power has
//! been re-verified; a barrier failure fails the buy phase as a unit while
//! leaving the sell results intact.

use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::{Semaphore, mpsc};

use crate::broker::BrokerAdapter;
use crate::models::{ExecutionResult, OrderIntent, OrderResult, OrderSide};
use crate::quotes::QuoteService;
use crate::settlement::{
    BuyingPowerSettings, ThresholdSettings, verify_buying_power, wait_for_settlement_threshold,
};

use super::classify::summarize;
use super::placer::OrderPlacer;
use super::staging::IntentStore;

/// Batch-level tunables.
#[derive(Debug, Clone)]
pub struct BatchSettings {
    /// Maximum orders in flight per phase.
    pub max_concurrent_orders: usize,
    /// Sell-settlement threshold wait.
    pub threshold: ThresholdSettings,
    /// Buying-power re-verification backoff.
    pub buying_power: BuyingPowerSettings,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            max_concurrent_orders: 10,
            threshold: ThresholdSettings::default(),
            buying_power: BuyingPowerSettings::default(),
        }
    }
}

/// Runs a batch of intents through the sell-then-buy pipeline.
pub struct BatchExecutor {
    placer: Arc<OrderPlacer>,
    broker: Arc<dyn BrokerAdapter>,
    quotes: Arc<QuoteService>,
    staging: Arc<dyn IntentStore>,
    settings: BatchSettings,
}

impl BatchExecutor {
    /// Wire up an executor.
    pub fn new(
        placer: Arc<OrderPlacer>,
        broker: Arc<dyn BrokerAdapter>,
        quotes: Arc<QuoteService>,
        staging: Arc<dyn IntentStore>,
        settings: BatchSettings,
    ) -> Self {
        Self {
            placer,
            broker,
            quotes,
            staging,
            settings,
        }
    }

    /// Execute one batch and classify the outcome.
    pub async fn execute(&self, intents: Vec<OrderIntent>) -> ExecutionResult {
        let (sells, buys): (Vec<_>, Vec<_>) = intents
            .into_iter()
            .partition(|intent| intent.side == OrderSide::Sell);

        tracing::info!(
            sells = sells.len(),
            buys = buys.len(),
            "Starting batch execution"
        );

        let mut results = self.run_phase(sells).await;

        if !buys.is_empty() {
            match self.clear_buy_barrier(&results, &buys).await {
                Ok(()) => {
                    let staged = self.stage_and_drain(buys).await;
                    results.extend(self.run_phase(staged).await);
                }
                Err(reason) => {
                    tracing::error!(reason = %reason, "Buy phase aborted");
                    for intent in buys {
                        results.push(OrderResult::aborted(
                            &intent.symbol,
                            intent.side,
                            intent.quantity,
                            format!("buy phase aborted: {reason}"),
                        ));
                    }
                }
            }
        }

        let summary = summarize(results);
        tracing::info!(
            status = ?summary.status,
            placed = summary.orders_placed,
            succeeded = summary.orders_succeeded,
            skipped = summary.orders_skipped,
            "Batch complete"
        );
        summary
    }

    /// Run one phase with semaphore-bounded workers reporting over a
    /// channel. The counters and result vector stay owned by this task.
    async fn run_phase(&self, intents: Vec<OrderIntent>) -> Vec<OrderResult> {
        if intents.is_empty() {
            return Vec::new();
        }

        let semaphore = Arc::new(Semaphore::new(self.settings.max_concurrent_orders));
        let (tx, mut rx) = mpsc::channel(intents.len());

        let expected = intents.len();
        for intent in intents {
            let semaphore = Arc::clone(&semaphore);
            let placer = Arc::clone(&self.placer);
            let tx = tx.clone();
            tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let result = placer.place(&intent).await;
                // Channel capacity equals the phase size, so send only
                // fails if the batch task is gone
                let _ = tx.send(result).await;
            });
        }
        drop(tx);

        let mut results = Vec::with_capacity(expected);
        while let Some(result) = rx.recv().await {
            results.push(result);
        }
        results
    }

    /// The hard two-phase barrier: wait for sell settlement to clear the
    /// estimated buy funding, then re-verify buying power.
    async fn clear_buy_barrier(
        &self,
        sell_results: &[OrderResult],
        buys: &[OrderIntent],
    ) -> Result<(), String> {
        let required = self.estimate_funding(buys).await;
        let sell_ids: Vec<String> = sell_results
            .iter()
            .filter_map(|result| result.order_id.clone())
            .collect();

        let outcome = wait_for_settlement_threshold(
            &*self.broker,
            &sell_ids,
            required,
            &self.settings.threshold,
        )
        .await;
        if !outcome.reached {
            // Settled sells may still be under target while spare cash
            // covers the buys; buying power is the final word
            tracing::warn!(
                settled_value = %outcome.settled_value,
                required = %required,
                "Sell settlement below target, deferring to buying power check"
            );
        }

        match verify_buying_power(&*self.broker, required, &self.settings.buying_power).await {
            Ok(available) => {
                tracing::info!(
                    available = %available,
                    required = %required,
                    "Buy phase funded"
                );
                Ok(())
            }
            Err(error) => Err(error.to_string()),
        }
    }

    /// Estimated cost of the buy phase from fresh quote midpoints.
    /// Unquotable symbols are excluded; they will be skipped by the
    /// placer anyway.
    async fn estimate_funding(&self, buys: &[OrderIntent]) -> Decimal {
        let mut required = Decimal::ZERO;
        for intent in buys {
            match self.quotes.get_quote(&intent.symbol).await {
                Ok(quote) => required += quote.mid() * intent.quantity,
                Err(error) => {
                    tracing::warn!(
                        symbol = %intent.symbol,
                        error = %error,
                        "Excluding unquotable buy from funding estimate"
                    );
                }
            }
        }
        required
    }

    /// Park buys in the durable store, then pull them back for
    /// execution. A broken store degrades to the in-memory list rather
    /// than dropping the phase.
    async fn stage_and_drain(&self, buys: Vec<OrderIntent>) -> Vec<OrderIntent> {
        if let Err(error) = self.staging.stage(&buys).await {
            tracing::warn!(error = %error, "Staging unavailable, executing buys directly");
            return buys;
        }
        match self.staging.drain().await {
            Ok(staged) if !staged.is_empty() => staged,
            Ok(_) => buys,
            Err(error) => {
                tracing::warn!(error = %error, "Drain failed, executing buys directly");
                buys
            }
        }
    }
}
