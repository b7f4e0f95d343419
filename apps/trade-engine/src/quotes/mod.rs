//! Quote acquisition: streaming-first with REST fallback.

mod feed;
mod service;

pub use feed::QuoteFeed;
pub use service::{QuoteCountersSnapshot, QuoteService, QuoteServiceSettings};
