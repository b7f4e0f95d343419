//! Broadcast-fed in-process quote cache.
//!
//! A stream consumer (websocket task, replay harness, test) publishes
//! quotes into the feed; consumers read the freshest cached quote or wait
//! briefly for the next update.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;

use crate::models::Quote;

/// In-process streaming quote source.
pub struct QuoteFeed {
    latest: RwLock<HashMap<String, Quote>>,
    tx: broadcast::Sender<Quote>,
}

impl QuoteFeed {
    /// Create a feed whose broadcast channel buffers `capacity` updates.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            latest: RwLock::new(HashMap::new()),
            tx,
        }
    }

    /// Publish a quote update into the cache and to live subscribers.
    pub fn publish(&self, quote: Quote) {
        if let Ok(mut cache) = self.latest.write() {
            cache.insert(quote.symbol.clone(), quote.clone());
        }
        // Send fails only when nobody is subscribed, which is fine
        let _ = self.tx.send(quote);
    }

    /// Subscribe to live quote updates.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Quote> {
        self.tx.subscribe()
    }

    /// The cached quote for `symbol` when no older than `max_age`.
    #[must_use]
    pub fn cached(&self, symbol: &str, max_age: Duration) -> Option<Quote> {
        let cache = self.latest.read().ok()?;
        let quote = cache.get(symbol)?;
        let age = Utc::now().signed_duration_since(quote.timestamp);
        let max_age = chrono::Duration::from_std(max_age).ok()?;
        if age <= max_age { Some(quote.clone()) } else { None }
    }

    /// The freshest quote for `symbol`: the cache when fresh enough,
    /// otherwise the next update within `wait`.
    pub async fn latest(&self, symbol: &str, max_age: Duration, wait: Duration) -> Option<Quote> {
        if let Some(quote) = self.cached(symbol, max_age) {
            return Some(quote);
        }

        let mut rx = self.subscribe();
        let waited = tokio::time::timeout(wait, async move {
            loop {
                match rx.recv().await {
                    Ok(quote) if quote.symbol == symbol => return Some(quote),
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        })
        .await;
        waited.unwrap_or(None)
    }
}
