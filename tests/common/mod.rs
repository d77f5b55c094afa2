#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use kinkong_signals::airtable::{Selection, SignalStore, TokenDirectory};
use kinkong_signals::error::{PriceError, SignalError, StoreError};
use kinkong_signals::models::{PricePoint, PriceSeries, Signal, SignalType, TimeWindow};
use kinkong_signals::prices::{PriceHistory, ReplayPriceHistory};

pub fn ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

/// Signal active 2024-03-01T10:00Z to 2024-03-02T10:00Z.
pub fn make_signal(
    id: &str,
    token: &str,
    signal_type: SignalType,
    entry: f64,
    target: f64,
    stop: f64,
) -> Signal {
    Signal {
        id: id.to_string(),
        token: token.to_string(),
        signal_type,
        timeframe: "INTRADAY".to_string(),
        entry_price: entry,
        target_price: target,
        stop_loss: stop,
        created_at: ts("2024-03-01T10:00:00Z"),
        expiry_date: ts("2024-03-02T10:00:00Z"),
        exit_price: None,
        actual_return: None,
        evaluation_lease: None,
    }
}

/// One point per minute starting at `start`.
pub fn make_points(start: DateTime<Utc>, values: &[f64]) -> Vec<PricePoint> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| PricePoint::new(start + Duration::minutes(i as i64), v))
        .collect()
}

/// In-memory signal table and token directory. `clock_skew_minutes` moves the
/// store's idea of "now" relative to the evaluator's.
#[derive(Default)]
pub struct MockStore {
    pub signals: Mutex<Vec<Signal>>,
    pub tokens: HashMap<String, String>,
    pub malformed_ids: Vec<String>,
    pub clock_skew_minutes: i64,
    pub fail_selection: bool,
    pub fail_outcome_for: HashSet<String>,
    pub foreign_leases: HashSet<String>,
    /// Signals whose lease is taken over by another runner right after we claim.
    pub stolen_after_claim: HashSet<String>,

    pub holders: Mutex<HashMap<String, String>>,
    pub claims: Mutex<Vec<(String, String, DateTime<Utc>)>>,
    pub outcomes: Mutex<Vec<(String, f64, f64)>>,
    pub releases: Mutex<Vec<String>>,
    pub token_lookups: Mutex<Vec<String>>,
}

impl MockStore {
    pub fn new(signals: Vec<Signal>) -> Self {
        Self {
            signals: Mutex::new(signals),
            ..Default::default()
        }
    }

    pub fn with_token(mut self, symbol: &str, mint: &str) -> Self {
        self.tokens.insert(symbol.to_string(), mint.to_string());
        self
    }

    pub fn signal(&self, id: &str) -> Signal {
        self.signals
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .unwrap()
    }

    pub fn outcome_for(&self, id: &str) -> Option<(f64, f64)> {
        self.outcomes
            .lock()
            .unwrap()
            .iter()
            .find(|(sid, _, _)| sid == id)
            .map(|(_, p, r)| (*p, *r))
    }

    pub fn holder(&self, id: &str) -> Option<String> {
        self.holders.lock().unwrap().get(id).cloned()
    }

    fn api_error() -> StoreError {
        StoreError::Api {
            status: 503,
            body: "service unavailable".to_string(),
        }
    }
}

#[async_trait]
impl SignalStore for MockStore {
    async fn pending_signals(&self, now: DateTime<Utc>) -> Result<Selection, StoreError> {
        if self.fail_selection {
            return Err(Self::api_error());
        }
        let store_now = now + Duration::minutes(self.clock_skew_minutes);
        let signals = self
            .signals
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.is_eligible(store_now))
            .cloned()
            .collect();
        let malformed = self
            .malformed_ids
            .iter()
            .map(|id| SignalError::Malformed {
                id: id.clone(),
                reason: "missing entryPrice".to_string(),
            })
            .collect();
        Ok(Selection { signals, malformed })
    }

    async fn claim(
        &self,
        signal_id: &str,
        owner: &str,
        lease_until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        if self.foreign_leases.contains(signal_id) {
            return Ok(false);
        }
        let mut signals = self.signals.lock().unwrap();
        let Some(signal) = signals.iter_mut().find(|s| s.id == signal_id) else {
            return Ok(false);
        };
        if !signal.is_claimable(now) {
            return Ok(false);
        }
        signal.evaluation_lease = Some(lease_until);
        let holder = if self.stolen_after_claim.contains(signal_id) {
            "other-runner"
        } else {
            owner
        };
        self.holders
            .lock()
            .unwrap()
            .insert(signal_id.to_string(), holder.to_string());
        self.claims
            .lock()
            .unwrap()
            .push((signal_id.to_string(), owner.to_string(), lease_until));
        Ok(true)
    }

    async fn record_outcome(
        &self,
        signal_id: &str,
        owner: &str,
        exit_price: f64,
        actual_return: f64,
    ) -> Result<bool, StoreError> {
        if self.fail_outcome_for.contains(signal_id) {
            return Err(Self::api_error());
        }
        if self.holder(signal_id).as_deref() != Some(owner) {
            return Ok(false);
        }
        let mut signals = self.signals.lock().unwrap();
        let Some(signal) = signals.iter_mut().find(|s| s.id == signal_id) else {
            return Ok(false);
        };
        if signal.is_closed() {
            return Ok(false);
        }
        signal.exit_price = Some(exit_price);
        signal.actual_return = Some(actual_return);
        signal.evaluation_lease = None;
        self.holders.lock().unwrap().remove(signal_id);
        self.outcomes
            .lock()
            .unwrap()
            .push((signal_id.to_string(), exit_price, actual_return));
        Ok(true)
    }

    async fn release(&self, signal_id: &str, owner: &str) -> Result<(), StoreError> {
        if self.holder(signal_id).as_deref() != Some(owner) {
            return Ok(());
        }
        self.holders.lock().unwrap().remove(signal_id);
        let mut signals = self.signals.lock().unwrap();
        if let Some(signal) = signals.iter_mut().find(|s| s.id == signal_id) {
            signal.evaluation_lease = None;
        }
        self.releases.lock().unwrap().push(signal_id.to_string());
        Ok(())
    }
}

#[async_trait]
impl TokenDirectory for MockStore {
    async fn resolve_mint(&self, symbol: &str) -> Result<Option<String>, StoreError> {
        self.token_lookups.lock().unwrap().push(symbol.to_string());
        Ok(self.tokens.get(symbol).cloned())
    }
}

/// Replay history, but mints listed in `failing` answer with an API error.
#[derive(Default)]
pub struct MockPrices {
    pub replay: ReplayPriceHistory,
    pub failing: HashSet<String>,
}

impl MockPrices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_points(mut self, mint: &str, points: Vec<PricePoint>) -> Self {
        self.replay.load(mint, points);
        self
    }

    pub fn failing_for(mut self, mint: &str) -> Self {
        self.failing.insert(mint.to_string());
        self
    }
}

#[async_trait]
impl PriceHistory for MockPrices {
    async fn fetch_history(
        &mut self,
        mint: &str,
        window: &TimeWindow,
    ) -> Result<PriceSeries, PriceError> {
        if self.failing.contains(mint) {
            return Err(PriceError::Api {
                status: 500,
                body: "upstream timeout".to_string(),
            });
        }
        self.replay.fetch_history(mint, window).await
    }
}
