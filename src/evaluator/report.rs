use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use crate::models::{ExitReason, SignalType, TradeResult};

/// Why a selected signal was left open this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NotEligible,
    Claimed,
    UnknownToken,
    MalformedWindow,
    NoPriceData,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotEligible => write!(f, "not_eligible"),
            SkipReason::Claimed => write!(f, "claimed"),
            SkipReason::UnknownToken => write!(f, "unknown_token"),
            SkipReason::MalformedWindow => write!(f, "malformed_window"),
            SkipReason::NoPriceData => write!(f, "no_price_data"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SignalOutcome {
    pub signal_id: String,
    pub token: String,
    pub signal_type: SignalType,
    pub entry_price: f64,
    pub window_adjusted: bool,
    pub result: TradeResult,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OutcomeStats {
    pub win_rate: f64,
    pub avg_return: f64,
    pub best_return: f64,
    pub worst_return: f64,
}

impl OutcomeStats {
    fn from_outcomes(outcomes: &[SignalOutcome]) -> Self {
        if outcomes.is_empty() {
            return Self::default();
        }
        let n = outcomes.len() as f64;
        let returns = outcomes.iter().map(|o| o.result.actual_return);
        let wins = outcomes.iter().filter(|o| o.result.success).count();

        OutcomeStats {
            win_rate: wins as f64 / n * 100.0,
            avg_return: returns.clone().sum::<f64>() / n,
            best_return: returns.clone().fold(f64::NEG_INFINITY, f64::max),
            worst_return: returns.fold(f64::INFINITY, f64::min),
        }
    }
}

/// Tally of one evaluator batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub dry_run: bool,

    pub selected: usize,
    pub malformed: usize,
    pub closed: usize,
    pub failed: usize,
    pub windows_adjusted: usize,
    pub skipped: HashMap<SkipReason, usize>,
    pub by_exit_reason: HashMap<ExitReason, usize>,

    pub stats: OutcomeStats,
    pub outcomes: Vec<SignalOutcome>,
}

impl BatchReport {
    pub fn new(started_at: DateTime<Utc>, dry_run: bool) -> Self {
        Self {
            started_at,
            finished_at: None,
            dry_run,
            selected: 0,
            malformed: 0,
            closed: 0,
            failed: 0,
            windows_adjusted: 0,
            skipped: HashMap::new(),
            by_exit_reason: HashMap::new(),
            stats: OutcomeStats::default(),
            outcomes: Vec::new(),
        }
    }

    pub fn record_closed(&mut self, outcome: SignalOutcome) {
        self.closed += 1;
        *self
            .by_exit_reason
            .entry(outcome.result.exit_reason)
            .or_default() += 1;
        self.outcomes.push(outcome);
    }

    pub fn record_skip(&mut self, reason: SkipReason) {
        *self.skipped.entry(reason).or_default() += 1;
    }

    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }

    pub fn skipped_for(&self, reason: SkipReason) -> usize {
        self.skipped.get(&reason).copied().unwrap_or(0)
    }

    pub fn exits_for(&self, reason: ExitReason) -> usize {
        self.by_exit_reason.get(&reason).copied().unwrap_or(0)
    }

    pub fn finish(&mut self, finished_at: DateTime<Utc>) {
        self.stats = OutcomeStats::from_outcomes(&self.outcomes);
        self.finished_at = Some(finished_at);
    }

    pub fn print_summary(&self) {
        println!("\n{}", "=".repeat(60));
        println!(
            "  CLOSED SIGNAL EVALUATION{}",
            if self.dry_run { " (dry run)" } else { "" }
        );
        println!("{}", "=".repeat(60));
        println!("  Started:     {}", self.started_at.format("%Y-%m-%d %H:%M:%S UTC"));
        println!();
        println!("  SIGNALS");
        println!("  ───────────────────────────────────");
        println!("  Selected:    {}", self.selected);
        println!("  Closed:      {}", self.closed);
        println!("  Skipped:     {}", self.skipped_total());
        let mut skips: Vec<_> = self.skipped.iter().collect();
        skips.sort_by_key(|(k, _)| k.to_string());
        for (reason, count) in skips {
            println!("    {:<16} {}", reason.to_string(), count);
        }
        println!("  Failed:      {}", self.failed);
        println!("  Malformed:   {}", self.malformed);
        println!("  Windows adj: {}", self.windows_adjusted);

        if self.closed > 0 {
            println!();
            println!("  OUTCOMES");
            println!("  ───────────────────────────────────");
            for reason in [ExitReason::Completed, ExitReason::Stopped, ExitReason::Expired] {
                println!("  {:<11}  {}", reason.to_string(), self.exits_for(reason));
            }
            println!("  Win Rate:    {:.1}%", self.stats.win_rate);
            println!("  Avg Return:  {:+.2}%", self.stats.avg_return);
            println!("  Best:        {:+.2}%", self.stats.best_return);
            println!("  Worst:       {:+.2}%", self.stats.worst_return);
            println!();
            for o in &self.outcomes {
                println!(
                    "  {:<10} {:<4} {:<6} {:<9} exit {:.6} ({:+.2}%)",
                    o.signal_id,
                    o.signal_type.as_str(),
                    o.token,
                    o.result.exit_reason.to_string(),
                    o.result.exit_price,
                    o.result.actual_return
                );
            }
        }
        println!("{}", "=".repeat(60));
    }
}
