//! Tracing setup.
//!
//! `RUST_LOG` wins when set; otherwise the configured level applies to
//! the whole crate.

use tracing_subscriber::EnvFilter;

/// Initialize console tracing.
///
/// Safe to call once per process; later calls are ignored so tests can
/// initialize independently.
pub fn init_telemetry(default_level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.to_string()));

    let is_development = std::env::var("TRADE_ENGINE_ENV")
        .map(|v| v == "development")
        .unwrap_or(false);

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(!is_development)
        .with_ansi(is_development)
        .try_init();
}
