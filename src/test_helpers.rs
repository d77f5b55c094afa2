use chrono::{DateTime, Duration, Utc};

use crate::models::{PricePoint, PriceSeries, Signal, SignalType};

pub fn ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

/// Series starting at 2024-03-01T10:00Z with one point per minute.
pub fn make_series(values: &[f64]) -> PriceSeries {
    let base = ts("2024-03-01T10:00:00Z");
    let points = values
        .iter()
        .enumerate()
        .map(|(i, &v)| PricePoint::new(base + Duration::minutes(i as i64), v))
        .collect();
    PriceSeries::new(points)
}

/// Like `make_series` but from (close, high, low) tuples.
pub fn make_bars(bars: &[(f64, f64, f64)]) -> PriceSeries {
    let base = ts("2024-03-01T10:00:00Z");
    let points = bars
        .iter()
        .enumerate()
        .map(|(i, &(c, h, l))| PricePoint::with_range(base + Duration::minutes(i as i64), c, h, l))
        .collect();
    PriceSeries::new(points)
}

/// Open signal active 2024-03-01T10:00Z to 2024-03-02T10:00Z.
pub fn make_signal(
    id: &str,
    signal_type: SignalType,
    entry: f64,
    target: f64,
    stop: f64,
) -> Signal {
    Signal {
        id: id.to_string(),
        token: "BONK".to_string(),
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
