//! Broker boundary: the adapter trait, shared retry policy, the Alpaca
//! implementation, and a scriptable mock for tests.

pub mod adapter;
pub mod alpaca;
pub mod error;
pub mod mock;
pub mod retry;

pub use adapter::{BrokerAdapter, SubmitOrder};
pub use alpaca::AlpacaBrokerAdapter;
pub use error::BrokerError;
pub use mock::MockBroker;
pub use retry::{ExponentialBackoff, RetryPolicy};
