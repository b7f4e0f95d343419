//! Batch execution binary.
//!
//! Reads a batch of close intents from a JSON file, runs it through the
//! two-phase engine against Alpaca, and exits nonzero unless every placed
//! order succeeded.
//!
//! ```bash
//! trade-engine --config config.yaml --intents batch.json
//! ```
//!
//! Credentials come through config interpolation, typically
//! `${ALPACA_API_KEY}` and `${ALPACA_API_SECRET}`.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;

use trade_engine::broker::AlpacaBrokerAdapter;
use trade_engine::models::{ExecutionStatus, OrderIntent};
use trade_engine::observability::init_metrics;
use trade_engine::telemetry::init_telemetry;
use trade_engine::{BrokerAdapter, Engine, load_config};

struct CliArgs {
    config_path: String,
    intents_path: String,
}

fn parse_args() -> anyhow::Result<CliArgs> {
    let mut config_path = "config.yaml".to_string();
    let mut intents_path = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                config_path = args.next().context("--config requires a path")?;
            }
            "--intents" => {
                intents_path = Some(args.next().context("--intents requires a path")?);
            }
            "--help" | "-h" => {
                println!("usage: trade-engine --config <config.yaml> --intents <batch.json>");
                std::process::exit(0);
            }
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }

    Ok(CliArgs {
        config_path,
        intents_path: intents_path.context("--intents <batch.json> is required")?,
    })
}

fn load_intents(path: &str) -> anyhow::Result<Vec<OrderIntent>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read intents file {path}"))?;
    let intents: Vec<OrderIntent> =
        serde_json::from_str(&raw).with_context(|| format!("failed to parse intents in {path}"))?;
    Ok(intents)
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = parse_args()?;

    let config = load_config(&args.config_path)
        .with_context(|| format!("failed to load config from {}", args.config_path))?;

    init_telemetry(&config.observability.log_level);
    init_metrics(&config.observability.metrics).context("failed to start metrics exporter")?;

    let intents = load_intents(&args.intents_path)?;
    tracing::info!(
        intents = intents.len(),
        environment = %config.broker.environment,
        "Starting trade engine"
    );

    let alpaca_config = config.broker.to_alpaca_config()?;
    let broker: Arc<dyn BrokerAdapter> =
        Arc::new(AlpacaBrokerAdapter::new(alpaca_config).context("failed to build broker")?);

    broker
        .health_check()
        .await
        .context("broker health check failed")?;

    let engine = Engine::from_config(&config, broker, None)?;
    let result = engine.execute_batch(intents).await;

    for order in &result.orders {
        tracing::info!(
            symbol = %order.symbol,
            side = %order.side,
            outcome = ?order.outcome,
            filled = %order.filled_shares,
            repegs = order.repegs,
            reason = order.reason.as_deref().unwrap_or("-"),
            "Order result"
        );
    }
    tracing::info!(
        status = ?result.status,
        placed = result.orders_placed,
        succeeded = result.orders_succeeded,
        skipped = result.orders_skipped,
        "Batch finished"
    );

    match result.status {
        ExecutionStatus::Success | ExecutionStatus::SuccessWithSkips => Ok(ExitCode::SUCCESS),
        ExecutionStatus::PartialSuccess | ExecutionStatus::Failure => Ok(ExitCode::FAILURE),
    }
}
