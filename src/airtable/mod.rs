pub mod client;
pub mod formula;

pub use client::AirtableClient;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{SignalError, StoreError};
use crate::models::Signal;

/// Result of one selection query. Rows that fail to parse are reported
/// separately so one bad record never hides the rest.
#[derive(Debug, Default)]
pub struct Selection {
    pub signals: Vec<Signal>,
    pub malformed: Vec<SignalError>,
}

/// Where signals live and where outcomes are written back.
#[async_trait]
pub trait SignalStore: Send + Sync {
    /// Expired, unscored signals. Expiry may be judged by the store's own
    /// clock rather than `now`.
    async fn pending_signals(&self, now: DateTime<Utc>) -> Result<Selection, StoreError>;

    /// Take an exclusive lease on a signal. `Ok(false)` means another
    /// evaluator holds it or it no longer needs scoring.
    async fn claim(
        &self,
        signal_id: &str,
        owner: &str,
        lease_until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Persist the outcome and drop the lease, but only while `owner` still
    /// holds it and the signal is unscored. `Ok(false)` means nothing was
    /// written because the lease moved on.
    async fn record_outcome(
        &self,
        signal_id: &str,
        owner: &str,
        exit_price: f64,
        actual_return: f64,
    ) -> Result<bool, StoreError>;

    /// Drop `owner`'s lease without scoring, leaving the signal open. A
    /// lease held by someone else is left alone.
    async fn release(&self, signal_id: &str, owner: &str) -> Result<(), StoreError>;
}

/// Symbol to on-chain mint lookup.
#[async_trait]
pub trait TokenDirectory: Send + Sync {
    async fn resolve_mint(&self, symbol: &str) -> Result<Option<String>, StoreError>;
}
