//! Settlement monitoring: per-order terminal polling, the sell-phase
//! settlement threshold, and buying-power re-verification.

mod buying_power;
mod monitor;
mod threshold;

pub use buying_power::{BuyingPowerSettings, verify_buying_power};
pub use monitor::{SettlementMonitor, SettlementSettings};
pub use threshold::{ThresholdOutcome, ThresholdSettings, wait_for_settlement_threshold};
