//! Market quotes and the single validity rule applied to them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Where a quote came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuoteSource {
    /// Pushed over the streaming feed.
    Streaming,
    /// Fetched through the broker REST API.
    Rest,
}

/// A top-of-book quote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    /// Stock symbol.
    pub symbol: String,
    /// Best bid price.
    pub bid: Decimal,
    /// Best ask price.
    pub ask: Decimal,
    /// Shares at the bid.
    pub bid_size: u64,
    /// Shares at the ask.
    pub ask_size: u64,
    /// Quote timestamp.
    pub timestamp: DateTime<Utc>,
    /// Acquisition source.
    pub source: QuoteSource,
}

impl Quote {
    /// Midpoint of bid and ask.
    #[must_use]
    pub fn mid(&self) -> Decimal {
        (self.bid + self.ask) / Decimal::TWO
    }

    /// Bid/ask spread.
    #[must_use]
    pub fn spread(&self) -> Decimal {
        self.ask - self.bid
    }

    /// Spread as a fraction of the midpoint.
    #[must_use]
    pub fn spread_fraction(&self) -> Decimal {
        let mid = self.mid();
        if mid <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        self.spread() / mid
    }

    /// Apply the validity rule.
    ///
    /// A quote is usable only if both sides are positive, the book is not
    /// inverted, the spread fraction is within `max_spread_fraction`, and
    /// (when `require_sizes` is set for size-aware pricing) both sizes are
    /// nonzero. Invalid quotes are never repaired; the caller decides
    /// whether to fall back to another source or fail.
    pub fn validate(
        &self,
        max_spread_fraction: Decimal,
        require_sizes: bool,
    ) -> Result<(), QuoteInvalid> {
        if self.bid <= Decimal::ZERO {
            return Err(QuoteInvalid::NonPositiveBid { bid: self.bid });
        }
        if self.ask <= Decimal::ZERO {
            return Err(QuoteInvalid::NonPositiveAsk { ask: self.ask });
        }
        if self.bid > self.ask {
            return Err(QuoteInvalid::Inverted {
                bid: self.bid,
                ask: self.ask,
            });
        }
        let fraction = self.spread_fraction();
        if fraction > max_spread_fraction {
            return Err(QuoteInvalid::SpreadTooWide {
                fraction,
                max: max_spread_fraction,
            });
        }
        if require_sizes && (self.bid_size == 0 || self.ask_size == 0) {
            return Err(QuoteInvalid::ZeroSize {
                bid_size: self.bid_size,
                ask_size: self.ask_size,
            });
        }
        Ok(())
    }
}

/// Reasons a quote fails the validity rule.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuoteInvalid {
    /// Bid is zero or negative.
    #[error("bid must be positive, got {bid}")]
    NonPositiveBid {
        /// The offending bid.
        bid: Decimal,
    },
    /// Ask is zero or negative.
    #[error("ask must be positive, got {ask}")]
    NonPositiveAsk {
        /// The offending ask.
        ask: Decimal,
    },
    /// Bid exceeds ask.
    #[error("inverted book: bid {bid} > ask {ask}")]
    Inverted {
        /// Bid price.
        bid: Decimal,
        /// Ask price.
        ask: Decimal,
    },
    /// Spread fraction above the configured maximum.
    #[error("spread fraction {fraction} exceeds max {max}")]
    SpreadTooWide {
        /// Observed spread fraction.
        fraction: Decimal,
        /// Configured maximum.
        max: Decimal,
    },
    /// A side shows zero size while size-aware pricing is on.
    #[error("zero-size quote: bid_size={bid_size} ask_size={ask_size}")]
    ZeroSize {
        /// Shares at the bid.
        bid_size: u64,
        /// Shares at the ask.
        ask_size: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn quote(bid: Decimal, ask: Decimal, bid_size: u64, ask_size: u64) -> Quote {
        Quote {
            symbol: "AAPL".to_string(),
            bid,
            ask,
            bid_size,
            ask_size,
            timestamp: Utc::now(),
            source: QuoteSource::Streaming,
        }
    }

    #[test]
    fn valid_quote_passes() {
        let q = quote(dec!(100.00), dec!(100.10), 200, 300);
        assert!(q.validate(dec!(0.05), true).is_ok());
    }

    #[test]
    fn zero_bid_rejected() {
        let q = quote(dec!(0), dec!(100.10), 200, 300);
        assert!(matches!(
            q.validate(dec!(0.05), true),
            Err(QuoteInvalid::NonPositiveBid { .. })
        ));
    }

    #[test]
    fn inverted_book_rejected() {
        let q = quote(dec!(100.20), dec!(100.10), 200, 300);
        assert!(matches!(
            q.validate(dec!(0.05), true),
            Err(QuoteInvalid::Inverted { .. })
        ));
    }

    #[test]
    fn wide_spread_rejected() {
        let q = quote(dec!(90), dec!(110), 200, 300);
        assert!(matches!(
            q.validate(dec!(0.05), true),
            Err(QuoteInvalid::SpreadTooWide { .. })
        ));
    }

    #[test]
    fn zero_size_rejected_only_when_size_aware() {
        let q = quote(dec!(100.00), dec!(100.10), 0, 300);
        assert!(matches!(
            q.validate(dec!(0.05), true),
            Err(QuoteInvalid::ZeroSize { .. })
        ));
        assert!(q.validate(dec!(0.05), false).is_ok());
    }

    #[test]
    fn mid_is_midpoint() {
        let q = quote(dec!(100.00), dec!(101.00), 1, 1);
        assert_eq!(q.mid(), dec!(100.50));
    }

    proptest! {
        // Any quote that passes validation has positive sides, an
        // uninverted book, and a bounded spread.
        #[test]
        fn validated_quotes_are_sane(
            bid_cents in 1i64..1_000_000,
            spread_cents in 0i64..1_000,
            bid_size in 1u64..10_000,
            ask_size in 1u64..10_000,
        ) {
            let q = quote(
                Decimal::new(bid_cents, 2),
                Decimal::new(bid_cents + spread_cents, 2),
                bid_size,
                ask_size,
            );
            if q.validate(dec!(0.05), true).is_ok() {
                prop_assert!(q.bid > Decimal::ZERO);
                prop_assert!(q.bid <= q.ask);
                prop_assert!(q.spread_fraction() <= dec!(0.05));
            }
        }
    }
}
