use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Interval of price history requested for one signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// True when the bounds were slid back because they lay in the future.
    pub adjusted: bool,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end,
            adjusted: false,
        }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}
