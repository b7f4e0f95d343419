//! Domain models for the trade engine.
//!
//! Everything that crosses a module boundary is a typed struct or enum;
//! monetary values are `rust_decimal::Decimal` end to end.

mod intent;
mod order;
mod quote;
mod result;
mod settlement;

pub use intent::{CloseType, OrderIntent, Urgency};
pub use order::{OrderSide, OrderStatus, OrderType, PlacedOrder};
pub use quote::{Quote, QuoteInvalid, QuoteSource};
pub use result::{ExecutionResult, ExecutionStatus, OrderOutcome, OrderResult};
pub use settlement::SettlementRecord;
