//! Prometheus metrics exporter.
//!
//! Execution code records through the `metrics` facade (counters such as
//! `orders_submitted_total`, `repegs_total`, `market_escalations_total`,
//! `settlement_timeouts_total`, `reconciliation_discrepancies_total`);
//! this module only installs the scrape endpoint. Without it the facade
//! calls are no-ops, which is what tests want.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::config::MetricsConfig;

/// Metrics exporter failures.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// The listen address could not be parsed.
    #[error("invalid metrics listen address {addr}: {source}")]
    Address {
        /// Configured address string.
        addr: String,
        /// Parse failure.
        #[source]
        source: std::net::AddrParseError,
    },
    /// The exporter failed to install (port in use, double install).
    #[error("metrics exporter installation failed: {0}")]
    Installation(String),
}

/// Start the Prometheus scrape endpoint if enabled.
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    if !config.enabled {
        tracing::debug!("Metrics exporter disabled");
        return Ok(());
    }

    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .map_err(|source| MetricsError::Address {
            addr: config.listen_addr.clone(),
            source,
        })?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| MetricsError::Installation(e.to_string()))?;

    tracing::info!(addr = %addr, "Prometheus metrics exporter started");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_config_is_a_no_op() {
        let config = MetricsConfig {
            enabled: false,
            listen_addr: "not an address".to_string(),
        };
        assert!(init_metrics(&config).is_ok());
    }

    #[test]
    fn bad_address_is_rejected() {
        let config = MetricsConfig {
            enabled: true,
            listen_addr: "not an address".to_string(),
        };
        assert!(matches!(
            init_metrics(&config),
            Err(MetricsError::Address { .. })
        ));
    }
}
