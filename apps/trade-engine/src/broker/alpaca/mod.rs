//! Alpaca Markets broker adapter.

mod adapter;
mod api_types;
mod config;
mod http_client;

pub use adapter::AlpacaBrokerAdapter;
pub use config::{AlpacaConfig, AlpacaEnvironment};
