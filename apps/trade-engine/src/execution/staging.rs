//! The buy-intent staging contract.
//!
//! Buy intents are parked in a store between the sell phase and the buy
//! phase, so a restart mid-batch can recover what was about to be bought.
//! The engine only depends on the trait; durability is the store's
//! concern.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::models::OrderIntent;

/// Errors from a staging backend.
#[derive(Debug, thiserror::Error)]
pub enum StagingError {
    /// The backend is unreachable or failed the operation.
    #[error("staging backend unavailable: {0}")]
    Unavailable(String),
}

/// Durable queue of buy intents between batch phases.
#[async_trait]
pub trait IntentStore: Send + Sync {
    /// Enqueue intents for the buy phase.
    async fn stage(&self, intents: &[OrderIntent]) -> Result<(), StagingError>;

    /// Remove and return everything staged.
    async fn drain(&self) -> Result<Vec<OrderIntent>, StagingError>;
}

/// In-memory store used by default and in tests.
#[derive(Default)]
pub struct InMemoryIntentStore {
    queue: Mutex<Vec<OrderIntent>>,
}

impl InMemoryIntentStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IntentStore for InMemoryIntentStore {
    async fn stage(&self, intents: &[OrderIntent]) -> Result<(), StagingError> {
        self.queue.lock().await.extend_from_slice(intents);
        Ok(())
    }

    async fn drain(&self) -> Result<Vec<OrderIntent>, StagingError> {
        Ok(std::mem::take(&mut *self.queue.lock().await))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CloseType, OrderSide, Urgency};
    use rust_decimal_macros::dec;

    fn buy(symbol: &str) -> OrderIntent {
        OrderIntent {
            symbol: symbol.to_string(),
            side: OrderSide::Buy,
            close_type: CloseType::Partial,
            quantity: dec!(5),
            urgency: Urgency::Medium,
        }
    }

    #[tokio::test]
    async fn drain_returns_staged_intents_once() {
        let store = InMemoryIntentStore::new();
        match store.stage(&[buy("AAPL"), buy("MSFT")]).await {
            Ok(()) => {}
            Err(e) => panic!("stage failed: {e}"),
        }

        let drained = match store.drain().await {
            Ok(v) => v,
            Err(e) => panic!("drain failed: {e}"),
        };
        assert_eq!(drained.len(), 2);

        let empty = match store.drain().await {
            Ok(v) => v,
            Err(e) => panic!("drain failed: {e}"),
        };
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn stage_appends_across_calls() {
        let store = InMemoryIntentStore::new();
        let _ = store.stage(&[buy("AAPL")]).await;
        let _ = store.stage(&[buy("MSFT")]).await;
        let drained = match store.drain().await {
            Ok(v) => v,
            Err(e) => panic!("drain failed: {e}"),
        };
        assert_eq!(drained.len(), 2);
    }
}
