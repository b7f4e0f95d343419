//! Batch result classification.

use crate::models::{ExecutionResult, ExecutionStatus, OrderResult};

/// Map (placed, succeeded, skipped) counts to a batch status.
///
/// Precedence: genuine failures are never masked by skips, and skips are
/// surfaced whenever everything that was placed succeeded.
#[must_use]
pub const fn classify(placed: usize, succeeded: usize, skipped: usize) -> ExecutionStatus {
    if placed == 0 {
        if skipped > 0 {
            // Nothing was attempted against the broker and nothing failed
            ExecutionStatus::SuccessWithSkips
        } else {
            ExecutionStatus::Failure
        }
    } else if succeeded == placed {
        if skipped > 0 {
            ExecutionStatus::SuccessWithSkips
        } else {
            ExecutionStatus::Success
        }
    } else if succeeded == 0 {
        ExecutionStatus::Failure
    } else {
        ExecutionStatus::PartialSuccess
    }
}

/// Fold per-order results into the batch result.
#[must_use]
pub fn summarize(orders: Vec<OrderResult>) -> ExecutionResult {
    let placed = orders.iter().filter(|o| o.placed()).count();
    let succeeded = orders.iter().filter(|o| o.succeeded()).count();
    let skipped = orders.iter().filter(|o| o.skipped).count();

    let status = classify(placed, succeeded, skipped);
    ExecutionResult {
        orders,
        orders_placed: placed,
        orders_succeeded: succeeded,
        orders_skipped: skipped,
        status,
        success: matches!(
            status,
            ExecutionStatus::Success | ExecutionStatus::SuccessWithSkips
        ),
    }
}
