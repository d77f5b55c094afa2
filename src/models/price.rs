use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One minute bar. `value` is the close, or the only price the API gave us.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    #[serde(default)]
    pub high: Option<f64>,
    #[serde(default)]
    pub low: Option<f64>,
}

impl PricePoint {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self {
            timestamp,
            value,
            high: None,
            low: None,
        }
    }

    pub fn with_range(timestamp: DateTime<Utc>, value: f64, high: f64, low: f64) -> Self {
        Self {
            timestamp,
            value,
            high: Some(high),
            low: Some(low),
        }
    }

    /// Highest price traded in the bar; the close when no range is known.
    pub fn high(&self) -> f64 {
        self.high.unwrap_or(self.value).max(self.value)
    }

    /// Lowest price traded in the bar; the close when no range is known.
    pub fn low(&self) -> f64 {
        self.low.unwrap_or(self.value).min(self.value)
    }
}

/// Ascending, de-duplicated sequence of price points.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Caller guarantees ascending timestamps.
    pub fn new(points: Vec<PricePoint>) -> Self {
        Self { points }
    }

    pub fn from_unsorted(mut points: Vec<PricePoint>) -> Self {
        points.sort_by_key(|p| p.timestamp);
        points.dedup_by_key(|p| p.timestamp);
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&PricePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PricePoint> {
        self.points.iter()
    }

    /// Points with `start <= timestamp <= end`.
    pub fn between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> PriceSeries {
        let lo = self.points.partition_point(|p| p.timestamp < start);
        let hi = self.points.partition_point(|p| p.timestamp <= end);
        if lo >= hi {
            return PriceSeries::default();
        }
        PriceSeries::new(self.points[lo..hi].to_vec())
    }
}

impl std::ops::Index<usize> for PriceSeries {
    type Output = PricePoint;
    fn index(&self, index: usize) -> &Self::Output {
        &self.points[index]
    }
}

impl IntoIterator for PriceSeries {
    type Item = PricePoint;
    type IntoIter = std::vec::IntoIter<PricePoint>;
    fn into_iter(self) -> Self::IntoIter {
        self.points.into_iter()
    }
}

impl<'a> IntoIterator for &'a PriceSeries {
    type Item = &'a PricePoint;
    type IntoIter = std::slice::Iter<'a, PricePoint>;
    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}
