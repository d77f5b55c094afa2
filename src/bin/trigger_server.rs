use anyhow::{Context, Result};
use tracing_subscriber::{fmt, EnvFilter};

use kinkong_signals::airtable::AirtableClient;
use kinkong_signals::config::Config;
use kinkong_signals::evaluator::ClosedSignalEvaluator;
use kinkong_signals::prices::BirdeyeClient;
use kinkong_signals::server;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env().context("Failed to load configuration")?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .init();

    let evaluator = ClosedSignalEvaluator::new(
        AirtableClient::new(&cfg),
        BirdeyeClient::new(&cfg),
        cfg.evaluator(),
    );

    server::serve(evaluator, cfg.trigger_port).await
}
