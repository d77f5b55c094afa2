use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::airtable::formula::{pending_signals_formula, token_lookup_formula};
use crate::airtable::{Selection, SignalStore, TokenDirectory};
use crate::config::Config;
use crate::error::StoreError;
use crate::models::Signal;

const BASE_URL: &str = "https://api.airtable.com/v0";
const PAGE_SIZE: &str = "100";

#[derive(Debug, Deserialize)]
pub(crate) struct ListResponse {
    #[serde(default)]
    pub records: Vec<RawRecord>,
    #[serde(default)]
    pub offset: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawRecord {
    pub id: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl RawRecord {
    fn owner(&self) -> Option<&str> {
        self.fields.get("evaluationOwner").and_then(Value::as_str)
    }
}

/// Split a page of records into parsed signals and rejects.
pub(crate) fn parse_signals(records: &[RawRecord], selection: &mut Selection) {
    for record in records {
        match Signal::from_fields(&record.id, &record.fields) {
            Ok(signal) => selection.signals.push(signal),
            Err(e) => selection.malformed.push(e),
        }
    }
}

pub struct AirtableClient {
    client: Client,
    api_key: String,
    base_url: String,
    signals_table: String,
    tokens_table: String,
}

impl AirtableClient {
    pub fn new(cfg: &Config) -> Self {
        Self::with_base_url(cfg, BASE_URL)
    }

    /// Point the client at another API root, e.g. a local stand-in.
    pub fn with_base_url(cfg: &Config, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: cfg.airtable_api_key.clone(),
            base_url: format!("{}/{}", base_url.trim_end_matches('/'), cfg.airtable_base_id),
            signals_table: cfg.signals_table.clone(),
            tokens_table: cfg.tokens_table.clone(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.base_url, table)
    }

    fn record_url(&self, table: &str, id: &str) -> String {
        format!("{}/{}/{}", self.base_url, table, id)
    }

    async fn check(resp: Response) -> Result<Response, StoreError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }

    /// Run a filtered list query, following `offset` until the last page.
    async fn list(
        &self,
        table: &str,
        formula: &str,
        max_records: Option<usize>,
    ) -> Result<Vec<RawRecord>, StoreError> {
        let mut records = Vec::new();
        let mut offset: Option<String> = None;

        loop {
            let mut req = self
                .client
                .get(self.table_url(table))
                .bearer_auth(&self.api_key)
                .query(&[("filterByFormula", formula), ("pageSize", PAGE_SIZE)]);
            if let Some(max) = max_records {
                req = req.query(&[("maxRecords", max.to_string())]);
            }
            if let Some(o) = &offset {
                req = req.query(&[("offset", o.as_str())]);
            }

            let resp = Self::check(req.send().await?).await?;
            let page: ListResponse = resp.json().await?;
            debug!(table, count = page.records.len(), "airtable page");
            records.extend(page.records);

            match page.offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        Ok(records)
    }

    async fn get_record(&self, table: &str, id: &str) -> Result<RawRecord, StoreError> {
        let resp = self
            .client
            .get(self.record_url(table, id))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    async fn patch(&self, table: &str, id: &str, fields: Value) -> Result<(), StoreError> {
        let resp = self
            .client
            .patch(self.record_url(table, id))
            .bearer_auth(&self.api_key)
            .json(&json!({ "fields": fields }))
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }
}

#[async_trait]
impl SignalStore for AirtableClient {
    async fn pending_signals(&self, _now: DateTime<Utc>) -> Result<Selection, StoreError> {
        let formula = pending_signals_formula();
        let records = self.list(&self.signals_table, &formula, None).await?;

        let mut selection = Selection::default();
        parse_signals(&records, &mut selection);
        Ok(selection)
    }

    async fn claim(
        &self,
        signal_id: &str,
        owner: &str,
        lease_until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        // Airtable has no conditional update: check, write, then read back
        // and keep the lease only if our owner tag survived.
        let current = self.get_record(&self.signals_table, signal_id).await?;
        let signal = Signal::from_fields(&current.id, &current.fields)?;
        if !signal.is_claimable(now) {
            return Ok(false);
        }

        self.patch(
            &self.signals_table,
            signal_id,
            json!({
                "evaluationLease": lease_until.to_rfc3339_opts(SecondsFormat::Millis, true),
                "evaluationOwner": owner,
            }),
        )
        .await?;

        let confirmed = self.get_record(&self.signals_table, signal_id).await?;
        let held = confirmed.owner() == Some(owner);
        if !held {
            warn!(
                signal_id,
                owner,
                holder = confirmed.owner().unwrap_or("none"),
                "lost lease race"
            );
        }
        Ok(held)
    }

    async fn record_outcome(
        &self,
        signal_id: &str,
        owner: &str,
        exit_price: f64,
        actual_return: f64,
    ) -> Result<bool, StoreError> {
        // Narrows the race with a slow or expired holder but cannot close it;
        // a competing PATCH may still land between this read and our write.
        let current = self.get_record(&self.signals_table, signal_id).await?;
        let unscored = current
            .fields
            .get("actualReturn")
            .map_or(true, Value::is_null);
        if current.owner() != Some(owner) || !unscored {
            warn!(
                signal_id,
                owner,
                holder = current.owner().unwrap_or("none"),
                unscored,
                "lease no longer ours, outcome not written"
            );
            return Ok(false);
        }

        self.patch(
            &self.signals_table,
            signal_id,
            json!({
                "exitPrice": exit_price,
                "actualReturn": actual_return,
                "evaluationLease": Value::Null,
                "evaluationOwner": Value::Null,
            }),
        )
        .await?;
        Ok(true)
    }

    async fn release(&self, signal_id: &str, owner: &str) -> Result<(), StoreError> {
        let current = self.get_record(&self.signals_table, signal_id).await?;
        if current.owner() != Some(owner) {
            debug!(signal_id, owner, "lease already gone, nothing to release");
            return Ok(());
        }

        self.patch(
            &self.signals_table,
            signal_id,
            json!({
                "evaluationLease": Value::Null,
                "evaluationOwner": Value::Null,
            }),
        )
        .await
    }
}

#[async_trait]
impl TokenDirectory for AirtableClient {
    async fn resolve_mint(&self, symbol: &str) -> Result<Option<String>, StoreError> {
        let formula = token_lookup_formula(symbol);
        let records = self.list(&self.tokens_table, &formula, Some(1)).await?;

        Ok(records.into_iter().find_map(|r| {
            r.fields
                .get("mint")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string)
        }))
    }
}
