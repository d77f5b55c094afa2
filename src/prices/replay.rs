use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::PriceError;
use crate::models::{PricePoint, PriceSeries, TimeWindow};
use crate::prices::PriceHistory;

/// Serves pre-loaded history instead of calling an API. Only points inside
/// the requested window are returned, like a live source would.
#[derive(Debug, Default)]
pub struct ReplayPriceHistory {
    data: HashMap<String, PriceSeries>,
    requests: Vec<(String, TimeWindow)>,
}

impl ReplayPriceHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load points for a mint. Order does not matter.
    pub fn load(&mut self, mint: &str, points: Vec<PricePoint>) {
        self.data
            .insert(mint.to_string(), PriceSeries::from_unsorted(points));
    }

    /// Every `(mint, window)` asked for so far.
    pub fn requests(&self) -> &[(String, TimeWindow)] {
        &self.requests
    }
}

#[async_trait]
impl PriceHistory for ReplayPriceHistory {
    async fn fetch_history(
        &mut self,
        mint: &str,
        window: &TimeWindow,
    ) -> Result<PriceSeries, PriceError> {
        self.requests.push((mint.to_string(), *window));
        Ok(self
            .data
            .get(mint)
            .map(|s| s.between(window.start, window.end))
            .unwrap_or_default())
    }
}
