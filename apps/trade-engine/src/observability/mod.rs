//! Operational metrics.

mod metrics;

pub use metrics::{MetricsError, init_metrics};
