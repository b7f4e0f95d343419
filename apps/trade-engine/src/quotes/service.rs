//! Streaming-first quote acquisition with REST fallback.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use rust_decimal::Decimal;

use crate::broker::BrokerAdapter;
use crate::error::ExecutionError;
use crate::models::{Quote, QuoteInvalid};

use super::feed::QuoteFeed;

/// Tunables for quote acquisition and the validity rule.
#[derive(Debug, Clone)]
pub struct QuoteServiceSettings {
    /// How long to wait on the streaming feed before falling back.
    pub streaming_wait: Duration,
    /// Maximum age for a cached streaming quote.
    pub max_quote_age: Duration,
    /// Maximum spread as a fraction of the midpoint.
    pub max_spread_fraction: Decimal,
    /// Require nonzero sizes on both sides (size-aware pricing).
    pub require_sizes: bool,
}

/// Counter snapshot for operational visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteCountersSnapshot {
    /// Quotes served from the streaming feed.
    pub streaming_success: u64,
    /// Quotes served through the REST fallback.
    pub rest_fallback: u64,
    /// Quotes rejected for a zero-size side.
    pub zero_size: u64,
    /// Quotes rejected by any validity check.
    pub invalid: u64,
}

#[derive(Default)]
struct QuoteCounters {
    streaming_success: AtomicU64,
    rest_fallback: AtomicU64,
    zero_size: AtomicU64,
    invalid: AtomicU64,
}

/// Acquires quotes streaming-first, falling back to the broker REST API.
///
/// One validity rule gates both paths. An invalid streaming quote falls
/// back to REST; an invalid REST quote is a hard data-quality failure,
/// never silently repaired.
pub struct QuoteService {
    feed: Option<Arc<QuoteFeed>>,
    broker: Arc<dyn BrokerAdapter>,
    settings: QuoteServiceSettings,
    counters: QuoteCounters,
}

impl QuoteService {
    /// Build a service over an optional streaming feed and a broker.
    pub fn new(
        feed: Option<Arc<QuoteFeed>>,
        broker: Arc<dyn BrokerAdapter>,
        settings: QuoteServiceSettings,
    ) -> Self {
        Self {
            feed,
            broker,
            settings,
            counters: QuoteCounters::default(),
        }
    }

    /// Acquire a fresh, validated quote for `symbol`.
    pub async fn get_quote(&self, symbol: &str) -> Result<Quote, ExecutionError> {
        if let Some(feed) = &self.feed {
            let streamed = feed
                .latest(
                    symbol,
                    self.settings.max_quote_age,
                    self.settings.streaming_wait,
                )
                .await;
            match streamed {
                Some(quote) => match self.check(&quote) {
                    Ok(()) => {
                        self.counters
                            .streaming_success
                            .fetch_add(1, Ordering::Relaxed);
                        metrics::counter!("quotes_streaming_success_total").increment(1);
                        return Ok(quote);
                    }
                    Err(invalid) => {
                        tracing::warn!(
                            symbol = %symbol,
                            reason = %invalid,
                            "Streaming quote failed validation, falling back to REST"
                        );
                    }
                },
                None => {
                    tracing::debug!(
                        symbol = %symbol,
                        "No streaming quote within deadline, falling back to REST"
                    );
                }
            }
        }

        let quote = self.broker.get_quote(symbol).await.map_err(|e| {
            metrics::counter!("quotes_fetch_failure_total").increment(1);
            ExecutionError::DataQuality {
                symbol: symbol.to_string(),
                detail: format!("REST quote fetch failed: {e}"),
            }
        })?;

        self.check(&quote)
            .map_err(|invalid| ExecutionError::invalid_quote(symbol, &invalid))?;

        self.counters.rest_fallback.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("quotes_rest_fallback_total").increment(1);
        Ok(quote)
    }

    /// Counter snapshot.
    #[must_use]
    pub fn counters(&self) -> QuoteCountersSnapshot {
        QuoteCountersSnapshot {
            streaming_success: self.counters.streaming_success.load(Ordering::Relaxed),
            rest_fallback: self.counters.rest_fallback.load(Ordering::Relaxed),
            zero_size: self.counters.zero_size.load(Ordering::Relaxed),
            invalid: self.counters.invalid.load(Ordering::Relaxed),
        }
    }

    fn check(&self, quote: &Quote) -> Result<(), QuoteInvalid> {
        let result = quote.validate(
            self.settings.max_spread_fraction,
            self.settings.require_sizes,
        );
        if let Err(invalid) = &result {
            self.counters.invalid.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("quotes_invalid_total").increment(1);
            if matches!(invalid, QuoteInvalid::ZeroSize { .. }) {
                self.counters.zero_size.fetch_add(1, Ordering::Relaxed);
                metrics::counter!("quotes_zero_size_total").increment(1);
            }
        }
        result
    }
}
