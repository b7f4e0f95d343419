//! Walk-the-book pricing.
//!
//! Each step interpolates from the passive side toward the aggressive side
//! of a fresh quote: buys walk up from the bid, sells walk down from the
//! ask. Later steps use larger fractions, so an unfilled order is repegged
//! closer to the touch each time, until the repeg budget is spent and the
//! order escalates to a market order.

use std::time::Duration;

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::models::{OrderSide, Quote};

/// One rung of the walk ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkStep {
    /// Fraction of the spread to cross, in `(0, 1]`.
    pub fraction: Decimal,
    /// How long to let the order work at this price.
    pub wait: Duration,
}

/// The full ladder plus the repeg budget.
#[derive(Debug, Clone)]
pub struct WalkPlan {
    /// Ladder steps, fractions strictly increasing.
    pub steps: Vec<WalkStep>,
    /// Cancel-and-replace budget per order.
    pub max_repegs: u32,
}

impl Default for WalkPlan {
    fn default() -> Self {
        let wait = Duration::from_secs(4);
        Self {
            steps: vec![
                WalkStep {
                    fraction: dec!(0.75),
                    wait,
                },
                WalkStep {
                    fraction: dec!(0.85),
                    wait,
                },
                WalkStep {
                    fraction: dec!(0.95),
                    wait,
                },
            ],
            max_repegs: 3,
        }
    }
}

impl WalkPlan {
    /// Check the ladder invariants.
    pub fn validate(&self) -> Result<(), WalkPlanInvalid> {
        if self.steps.is_empty() {
            return Err(WalkPlanInvalid::NoSteps);
        }
        let mut previous: Option<Decimal> = None;
        for step in &self.steps {
            if step.fraction <= Decimal::ZERO || step.fraction > Decimal::ONE {
                return Err(WalkPlanInvalid::FractionOutOfRange {
                    fraction: step.fraction,
                });
            }
            if let Some(prev) = previous {
                if step.fraction <= prev {
                    return Err(WalkPlanInvalid::NotIncreasing {
                        previous: prev,
                        next: step.fraction,
                    });
                }
            }
            previous = Some(step.fraction);
        }
        Ok(())
    }
}

/// Invalid walk ladder configurations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalkPlanInvalid {
    /// The ladder has no steps.
    #[error("walk plan has no steps")]
    NoSteps,
    /// A fraction is outside `(0, 1]`.
    #[error("walk fraction {fraction} outside (0, 1]")]
    FractionOutOfRange {
        /// The offending fraction.
        fraction: Decimal,
    },
    /// Fractions are not strictly increasing.
    #[error("walk fractions must strictly increase: {previous} then {next}")]
    NotIncreasing {
        /// Preceding fraction.
        previous: Decimal,
        /// Offending fraction.
        next: Decimal,
    },
}

/// Limit price for one walk step against a fresh quote.
///
/// Buys price at `bid + spread * fraction` rounded down to the cent,
/// sells at `ask - spread * fraction` rounded up, so rounding never
/// crosses the touch.
#[must_use]
pub fn next_price(quote: &Quote, side: OrderSide, fraction: Decimal) -> Decimal {
    let crossed = quote.spread() * fraction;
    match side {
        OrderSide::Buy => {
            (quote.bid + crossed).round_dp_with_strategy(2, RoundingStrategy::ToNegativeInfinity)
        }
        OrderSide::Sell => {
            (quote.ask - crossed).round_dp_with_strategy(2, RoundingStrategy::ToPositiveInfinity)
        }
    }
}
