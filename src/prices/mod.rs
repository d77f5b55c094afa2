pub mod birdeye;
pub mod replay;

pub use birdeye::BirdeyeClient;
pub use replay::ReplayPriceHistory;

use async_trait::async_trait;

use crate::error::PriceError;
use crate::models::{PriceSeries, TimeWindow};

/// Minute-resolution price history keyed by token mint.
#[async_trait]
pub trait PriceHistory: Send + Sync {
    /// Points inside `window`, oldest first. An empty series is not an error.
    async fn fetch_history(
        &mut self,
        mint: &str,
        window: &TimeWindow,
    ) -> Result<PriceSeries, PriceError>;
}
