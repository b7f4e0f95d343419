//! The execution core: validation, placement, batch orchestration,
//! classification, and post-trade reconciliation.

mod batch;
mod classify;
mod placer;
mod reconcile;
mod staging;
mod validator;

pub use batch::{BatchExecutor, BatchSettings};
pub use classify::{classify, summarize};
pub use placer::OrderPlacer;
pub use reconcile::{PortfolioValidator, PositionCheck, ReconcileSettings};
pub use staging::{InMemoryIntentStore, IntentStore, StagingError};
pub use validator::{OrderValidator, ValidatorSettings};
