//! Limit-price selection for working orders.

mod walk;

pub use walk::{WalkPlan, WalkPlanInvalid, WalkStep, next_price};
