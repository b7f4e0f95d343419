// Allow unwrap/expect in tests - tests should panic on unexpected errors
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! Order execution and settlement engine.
//!
//! Turns position-close intents into broker orders and supervises them to
//! a terminal state. Sells always execute before buys: the buy phase waits
//! for sell settlement and a buying-power re-check, so the engine never
//! spends proceeds it does not have.
//!
//! # Pipeline
//!
//! - [`quotes`]: streaming-first quote acquisition with REST fallback and
//!   one validity rule for both paths
//! - [`execution`]: validation, walk-the-book placement, two-phase batch
//!   orchestration, result classification, post-trade reconciliation
//! - [`pricing`]: the repeg ladder that walks limit prices toward the
//!   aggressive side of the spread
//! - [`settlement`]: per-order settlement supervision plus the batch-level
//!   threshold and buying-power waits
//! - [`broker`]: the adapter trait, the Alpaca implementation, and the
//!   scriptable in-process mock

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

/// Broker adapter trait, Alpaca implementation, retry machinery, and the
/// test mock.
pub mod broker;

/// YAML configuration with env interpolation.
pub mod config;

/// Engine assembly.
pub mod engine;

/// The execution error taxonomy.
pub mod error;

/// Validation, placement, batch orchestration, and classification.
pub mod execution;

/// Core data model.
pub mod models;

/// Prometheus exporter setup.
pub mod observability;

/// Walk-the-book pricing.
pub mod pricing;

/// Quote acquisition.
pub mod quotes;

/// Settlement supervision.
pub mod settlement;

/// Tracing setup.
pub mod telemetry;

pub use broker::{AlpacaBrokerAdapter, BrokerAdapter, BrokerError, MockBroker};
pub use config::{Config, ConfigError, load_config, load_config_from_string};
pub use engine::Engine;
pub use error::ExecutionError;
pub use execution::{BatchExecutor, OrderPlacer, OrderValidator, PortfolioValidator};
pub use models::{
    CloseType, ExecutionResult, ExecutionStatus, OrderIntent, OrderOutcome, OrderResult,
    OrderSide, OrderStatus, PlacedOrder, Quote, Urgency,
};
pub use quotes::{QuoteFeed, QuoteService};
pub use settlement::SettlementMonitor;
