use chrono::{DateTime, Duration, SecondsFormat, Utc};
use std::collections::HashMap;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::airtable::{SignalStore, TokenDirectory};
use crate::config::EvaluatorConfig;
use crate::error::{EvaluatorError, PriceError, StoreError};
use crate::evaluator::report::{BatchReport, SignalOutcome, SkipReason};
use crate::evaluator::simulator::simulate_trade;
use crate::evaluator::window::history_window;
use crate::models::Signal;
use crate::prices::PriceHistory;

#[derive(Error, Debug)]
enum SignalFailure {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Price(#[from] PriceError),
}

enum Disposition {
    Closed(SignalOutcome),
    Skipped(SkipReason),
}

/// Scores expired signals against historical prices and writes the
/// outcome back. Signals are handled one at a time; a failure on one is
/// logged and never stops the batch.
pub struct ClosedSignalEvaluator<S, P> {
    store: S,
    prices: P,
    config: EvaluatorConfig,
    owner: String,
    mint_cache: HashMap<String, Option<String>>,
}

impl<S, P> ClosedSignalEvaluator<S, P>
where
    S: SignalStore + TokenDirectory,
    P: PriceHistory,
{
    pub fn new(store: S, prices: P, config: EvaluatorConfig) -> Self {
        let owner = format!(
            "evaluator-{}-{}",
            std::process::id(),
            Utc::now().timestamp_millis()
        );
        Self {
            store,
            prices,
            config,
            owner,
            mint_cache: HashMap::new(),
        }
    }

    /// Tag written next to each lease so a racing evaluator can tell it lost.
    pub fn with_owner(mut self, owner: &str) -> Self {
        self.owner = owner.to_string();
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn prices(&self) -> &P {
        &self.prices
    }

    pub async fn run(&mut self) -> Result<BatchReport, EvaluatorError> {
        self.run_at(Utc::now()).await
    }

    /// Run one batch treating `now` as the current time. The report's
    /// finish time is `now` plus the wall time the batch took.
    pub async fn run_at(&mut self, now: DateTime<Utc>) -> Result<BatchReport, EvaluatorError> {
        let clock = Instant::now();
        let mut report = BatchReport::new(now, self.config.dry_run);
        self.mint_cache.clear();

        let selection = self
            .store
            .pending_signals(now)
            .await
            .map_err(EvaluatorError::Selection)?;

        for bad in &selection.malformed {
            warn!(error = %bad, "skipping malformed signal record");
        }
        report.malformed = selection.malformed.len();

        let mut signals = selection.signals;
        if let Some(limit) = self.config.limit {
            signals.truncate(limit);
        }
        report.selected = signals.len();

        info!(
            selected = report.selected,
            malformed = report.malformed,
            dry_run = self.config.dry_run,
            tie_break = %self.config.tie_break,
            "evaluating expired signals"
        );

        for signal in &signals {
            match self.process(signal, now, &mut report).await {
                Ok(Disposition::Closed(outcome)) => report.record_closed(outcome),
                Ok(Disposition::Skipped(reason)) => {
                    debug!(signal_id = %signal.id, reason = %reason, "signal skipped");
                    report.record_skip(reason);
                }
                Err(e) => {
                    error!(
                        signal_id = %signal.id,
                        token = %signal.token,
                        error = %e,
                        "signal evaluation failed"
                    );
                    report.failed += 1;
                }
            }
        }

        let elapsed = Duration::from_std(clock.elapsed()).unwrap_or_else(|_| Duration::zero());
        report.finish(now + elapsed);
        info!(
            closed = report.closed,
            skipped = report.skipped_total(),
            failed = report.failed,
            windows_adjusted = report.windows_adjusted,
            "evaluation batch finished"
        );
        Ok(report)
    }

    /// Claim, evaluate, and release on anything short of a recorded outcome.
    async fn process(
        &mut self,
        signal: &Signal,
        now: DateTime<Utc>,
        report: &mut BatchReport,
    ) -> Result<Disposition, SignalFailure> {
        // Expiry is left to the store; its clock may run ahead of ours and
        // the history window absorbs that.
        if !signal.is_claimable(now) {
            return Ok(Disposition::Skipped(SkipReason::NotEligible));
        }

        if !self.config.dry_run {
            let lease_until = now + self.config.lease_ttl();
            if !self
                .store
                .claim(&signal.id, &self.owner, lease_until, now)
                .await?
            {
                return Ok(Disposition::Skipped(SkipReason::Claimed));
            }
        }

        let result = self.evaluate(signal, now, report).await;

        let keep_lease = matches!(
            result,
            Ok(Disposition::Closed(_)) | Ok(Disposition::Skipped(SkipReason::Claimed))
        );
        if !self.config.dry_run && !keep_lease {
            if let Err(e) = self.store.release(&signal.id, &self.owner).await {
                warn!(signal_id = %signal.id, error = %e, "could not release lease");
            }
        }

        result
    }

    async fn evaluate(
        &mut self,
        signal: &Signal,
        now: DateTime<Utc>,
        report: &mut BatchReport,
    ) -> Result<Disposition, SignalFailure> {
        let Some(mint) = self.resolve_mint(&signal.token).await? else {
            warn!(signal_id = %signal.id, token = %signal.token, "no token record, leaving signal open");
            return Ok(Disposition::Skipped(SkipReason::UnknownToken));
        };

        let Some(window) = history_window(signal.created_at, signal.expiry_date, now) else {
            warn!(
                signal_id = %signal.id,
                created_at = %signal.created_at,
                expiry_date = %signal.expiry_date,
                "signal window is empty or inverted"
            );
            return Ok(Disposition::Skipped(SkipReason::MalformedWindow));
        };

        if window.adjusted {
            report.windows_adjusted += 1;
            warn!(
                event = "window_adjusted",
                signal_id = %signal.id,
                token = %signal.token,
                original_start = %signal.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
                original_end = %signal.expiry_date.to_rfc3339_opts(SecondsFormat::Secs, true),
                adjusted_start = %window.start.to_rfc3339_opts(SecondsFormat::Secs, true),
                adjusted_end = %window.end.to_rfc3339_opts(SecondsFormat::Secs, true),
                "history window lay in the future, shifted to end now"
            );
        }

        let series = self.prices.fetch_history(&mint, &window).await?;
        debug!(signal_id = %signal.id, mint = %mint, points = series.len(), "price history loaded");

        let Some(result) = simulate_trade(signal, &series, self.config.tie_break) else {
            warn!(signal_id = %signal.id, mint = %mint, "no price data in window, leaving signal open");
            return Ok(Disposition::Skipped(SkipReason::NoPriceData));
        };

        if !self.config.dry_run
            && !self
                .store
                .record_outcome(&signal.id, &self.owner, result.exit_price, result.actual_return)
                .await?
        {
            warn!(signal_id = %signal.id, owner = %self.owner, "lease lost before write, outcome dropped");
            return Ok(Disposition::Skipped(SkipReason::Claimed));
        }

        info!(
            signal_id = %signal.id,
            token = %signal.token,
            signal_type = %signal.signal_type,
            exit_reason = %result.exit_reason,
            exit_price = result.exit_price,
            actual_return = result.actual_return,
            time_to_exit = result.time_to_exit,
            "signal closed"
        );

        Ok(Disposition::Closed(SignalOutcome {
            signal_id: signal.id.clone(),
            token: signal.token.clone(),
            signal_type: signal.signal_type,
            entry_price: signal.entry_price,
            window_adjusted: window.adjusted,
            result,
        }))
    }

    async fn resolve_mint(&mut self, symbol: &str) -> Result<Option<String>, StoreError> {
        if let Some(cached) = self.mint_cache.get(symbol) {
            return Ok(cached.clone());
        }
        let mint = self.store.resolve_mint(symbol).await?;
        self.mint_cache.insert(symbol.to_string(), mint.clone());
        Ok(mint)
    }
}
