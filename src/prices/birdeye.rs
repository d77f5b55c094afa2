use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::config::Config;
use crate::error::PriceError;
use crate::models::{PricePoint, PriceSeries, TimeWindow};
use crate::prices::PriceHistory;

const BASE_URL: &str = "https://public-api.birdeye.so";
const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(100);
/// Birdeye caps minute history at 1000 items per call.
const MAX_POINTS_PER_REQUEST: i64 = 1000;
const MINUTE_SECS: i64 = 60;

#[derive(Debug, Deserialize)]
pub(crate) struct ApiResponse<T> {
    #[serde(default)]
    pub success: bool,
    pub data: Option<ItemList<T>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ItemList<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HistoryItem {
    #[serde(rename = "unixTime")]
    pub unix_time: i64,
    pub value: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OhlcvItem {
    #[serde(rename = "unixTime")]
    pub unix_time: i64,
    pub h: f64,
    pub l: f64,
    pub c: f64,
}

pub(crate) trait IntoPoint {
    fn into_point(self) -> Option<PricePoint>;
}

impl IntoPoint for HistoryItem {
    fn into_point(self) -> Option<PricePoint> {
        let ts = DateTime::from_timestamp(self.unix_time, 0)?;
        Some(PricePoint::new(ts, self.value))
    }
}

impl IntoPoint for OhlcvItem {
    fn into_point(self) -> Option<PricePoint> {
        let ts = DateTime::from_timestamp(self.unix_time, 0)?;
        Some(PricePoint::with_range(ts, self.c, self.h, self.l))
    }
}

/// Unwrap the envelope; `success: false` is a rejection.
pub(crate) fn into_points<T>(resp: ApiResponse<T>, mint: &str) -> Result<Vec<PricePoint>, PriceError>
where
    T: IntoPoint,
{
    if !resp.success {
        return Err(PriceError::Rejected {
            mint: mint.to_string(),
        });
    }
    Ok(resp
        .data
        .map(|d| d.items)
        .unwrap_or_default()
        .into_iter()
        .filter_map(IntoPoint::into_point)
        .filter(|p: &PricePoint| p.value.is_finite() && p.value > 0.0)
        .collect())
}

/// Split `[start, end]` (unix seconds) into request-sized chunks.
pub(crate) fn chunk_range(start: i64, end: i64) -> Vec<(i64, i64)> {
    let chunk = MAX_POINTS_PER_REQUEST * MINUTE_SECS;
    let mut out = Vec::new();
    let mut from = start;
    while from < end {
        let to = (from + chunk).min(end);
        out.push((from, to));
        from = to;
    }
    out
}

pub struct BirdeyeClient {
    client: Client,
    api_key: String,
    use_ohlcv: bool,
    base_url: String,
    last_request: Option<Instant>,
}

impl BirdeyeClient {
    pub fn new(cfg: &Config) -> Self {
        Self::with_base_url(cfg, BASE_URL)
    }

    pub fn with_base_url(cfg: &Config, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: cfg.birdeye_api_key.clone(),
            use_ohlcv: cfg.use_ohlcv,
            base_url: base_url.trim_end_matches('/').to_string(),
            last_request: None,
        }
    }

    async fn rate_limit(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < MIN_REQUEST_INTERVAL {
                tokio::time::sleep(MIN_REQUEST_INTERVAL - elapsed).await;
            }
        }
        self.last_request = Some(Instant::now());
    }

    async fn fetch_chunk(
        &mut self,
        mint: &str,
        from: i64,
        to: i64,
    ) -> Result<Vec<PricePoint>, PriceError> {
        self.rate_limit().await;

        let (path, query) = if self.use_ohlcv {
            (
                "/defi/ohlcv",
                vec![
                    ("address", mint.to_string()),
                    ("type", "1m".to_string()),
                    ("time_from", from.to_string()),
                    ("time_to", to.to_string()),
                ],
            )
        } else {
            (
                "/defi/history_price",
                vec![
                    ("address", mint.to_string()),
                    ("address_type", "token".to_string()),
                    ("type", "1m".to_string()),
                    ("time_from", from.to_string()),
                    ("time_to", to.to_string()),
                ],
            )
        };

        let resp = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .query(&query)
            .header("X-API-KEY", &self.api_key)
            .header("x-chain", "solana")
            .header("accept", "application/json")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(PriceError::Api {
                status: status.as_u16(),
                body,
            });
        }

        if self.use_ohlcv {
            let data: ApiResponse<OhlcvItem> = resp.json().await?;
            into_points(data, mint)
        } else {
            let data: ApiResponse<HistoryItem> = resp.json().await?;
            into_points(data, mint)
        }
    }
}

#[async_trait]
impl PriceHistory for BirdeyeClient {
    async fn fetch_history(
        &mut self,
        mint: &str,
        window: &TimeWindow,
    ) -> Result<PriceSeries, PriceError> {
        let chunks = chunk_range(window.start.timestamp(), window.end.timestamp());
        let mut points = Vec::new();

        for (i, (from, to)) in chunks.iter().enumerate() {
            let batch = self.fetch_chunk(mint, *from, *to).await?;
            debug!(
                mint,
                chunk = i + 1,
                of = chunks.len(),
                points = batch.len(),
                "birdeye history chunk"
            );
            points.extend(batch);
        }

        // Chunks share their boundary minute
        Ok(PriceSeries::from_unsorted(points))
    }
}
