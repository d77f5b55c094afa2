use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use kinkong_signals::airtable::AirtableClient;
use kinkong_signals::config::Config;
use kinkong_signals::evaluator::ClosedSignalEvaluator;
use kinkong_signals::models::TieBreak;
use kinkong_signals::prices::BirdeyeClient;

#[derive(Parser)]
#[command(name = "kinkong-signals")]
#[command(about = "Score expired trading signals against historical prices")]
struct Cli {
    /// Evaluate and report without writing anything back
    #[arg(long)]
    dry_run: bool,

    /// Process at most this many signals
    #[arg(long)]
    limit: Option<usize>,

    /// Which level wins when one bar crosses both (target-first | stop-first)
    #[arg(long, value_parser = parse_tie_break)]
    tie_break: Option<TieBreak>,

    /// Use OHLCV bars instead of plain price history
    #[arg(long)]
    ohlcv: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

fn parse_tie_break(s: &str) -> Result<TieBreak, String> {
    TieBreak::from_str_loose(s).ok_or_else(|| format!("unknown tie break {s:?}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut cfg = Config::from_env().context("Failed to load configuration")?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .init();

    if cli.ohlcv {
        cfg.use_ohlcv = true;
    }
    let mut eval_cfg = cfg.evaluator();
    eval_cfg.dry_run |= cli.dry_run;
    eval_cfg.limit = cli.limit;
    if let Some(tb) = cli.tie_break {
        eval_cfg.tie_break = tb;
    }

    let store = AirtableClient::new(&cfg);
    let prices = BirdeyeClient::new(&cfg);
    let mut evaluator = ClosedSignalEvaluator::new(store, prices, eval_cfg);

    let report = evaluator.run().await.context("Evaluation batch failed")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report.print_summary();
    }

    Ok(())
}
