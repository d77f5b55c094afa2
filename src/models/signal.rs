use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::SignalError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalType {
    Buy,
    Sell,
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl SignalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalType::Buy => "BUY",
            SignalType::Sell => "SELL",
        }
    }

    pub fn from_str_loose(s: &str) -> Option<SignalType> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Some(SignalType::Buy),
            "SELL" => Some(SignalType::Sell),
            _ => None,
        }
    }
}

/// A BUY/SELL recommendation as stored in the SIGNALS table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub id: String,
    pub token: String,
    pub signal_type: SignalType,
    #[serde(default)]
    pub timeframe: String,
    pub entry_price: f64,
    pub target_price: f64,
    #[serde(default)]
    pub stop_loss: f64,
    pub created_at: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    #[serde(default)]
    pub exit_price: Option<f64>,
    #[serde(default)]
    pub actual_return: Option<f64>,
    #[serde(default)]
    pub evaluation_lease: Option<DateTime<Utc>>,
}

impl Signal {
    pub fn is_closed(&self) -> bool {
        self.actual_return.is_some()
    }

    /// Open for scoring unless another evaluator holds a live lease.
    pub fn is_claimable(&self, now: DateTime<Utc>) -> bool {
        let lease_free = match self.evaluation_lease {
            Some(until) => until < now,
            None => true,
        };

        !self.is_closed() && self.entry_price > 0.0 && self.target_price > 0.0 && lease_free
    }

    /// Client-side mirror of the selection formula.
    pub fn is_eligible(&self, now: DateTime<Utc>) -> bool {
        self.expiry_date < now && self.is_claimable(now)
    }

    /// Parse a record's `fields` object.
    pub fn from_fields(id: &str, fields: &Map<String, Value>) -> Result<Self, SignalError> {
        let malformed = |reason: String| SignalError::Malformed {
            id: id.to_string(),
            reason,
        };

        let token = fields
            .get("token")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| malformed("missing token".into()))?
            .to_string();

        let raw_type = fields
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed("missing type".into()))?;
        let signal_type = SignalType::from_str_loose(raw_type)
            .ok_or_else(|| malformed(format!("unknown signal type {raw_type:?}")))?;

        let entry_price =
            number_field(fields, "entryPrice").ok_or_else(|| malformed("missing entryPrice".into()))?;
        let target_price = number_field(fields, "targetPrice")
            .ok_or_else(|| malformed("missing targetPrice".into()))?;

        let created_at = date_field(fields, "createdAt")
            .map_err(|e| malformed(format!("createdAt: {e}")))?
            .ok_or_else(|| malformed("missing createdAt".into()))?;
        let expiry_date = date_field(fields, "expiryDate")
            .map_err(|e| malformed(format!("expiryDate: {e}")))?
            .ok_or_else(|| malformed("missing expiryDate".into()))?;
        let evaluation_lease = date_field(fields, "evaluationLease")
            .map_err(|e| malformed(format!("evaluationLease: {e}")))?;

        Ok(Signal {
            id: id.to_string(),
            token,
            signal_type,
            timeframe: fields
                .get("timeframe")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            entry_price,
            target_price,
            stop_loss: number_field(fields, "stopLoss").unwrap_or(0.0),
            created_at,
            expiry_date,
            exit_price: number_field(fields, "exitPrice"),
            actual_return: number_field(fields, "actualReturn"),
            evaluation_lease,
        })
    }
}

/// Airtable hands numbers back as JSON numbers, but older rows were
/// written as strings.
fn number_field(fields: &Map<String, Value>, key: &str) -> Option<f64> {
    match fields.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn date_field(
    fields: &Map<String, Value>,
    key: &str,
) -> Result<Option<DateTime<Utc>>, chrono::ParseError> {
    match fields.get(key).and_then(Value::as_str) {
        Some(s) if !s.trim().is_empty() => DateTime::parse_from_rfc3339(s.trim())
            .map(|d| Some(d.with_timezone(&Utc))),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{make_signal, ts};
    use chrono::Duration;
    use serde_json::json;

    fn fields(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn parses_complete_record() {
        let f = fields(json!({
            "token": "BONK",
            "type": "buy",
            "timeframe": "SCALP",
            "entryPrice": 1.0,
            "targetPrice": "1.2",
            "stopLoss": 0.9,
            "createdAt": "2024-03-01T10:00:00.000Z",
            "expiryDate": "2024-03-02T10:00:00Z",
        }));
        let s = Signal::from_fields("rec1", &f).unwrap();
        assert_eq!(s.signal_type, SignalType::Buy);
        assert_eq!(s.token, "BONK");
        assert!((s.target_price - 1.2).abs() < 1e-9);
        assert!(s.actual_return.is_none());
        assert!(s.evaluation_lease.is_none());
        assert_eq!(s.expiry_date - s.created_at, Duration::days(1));
    }

    #[test]
    fn missing_entry_price_is_malformed() {
        let f = fields(json!({
            "token": "BONK",
            "type": "SELL",
            "targetPrice": 1.2,
            "createdAt": "2024-03-01T10:00:00Z",
            "expiryDate": "2024-03-02T10:00:00Z",
        }));
        let err = Signal::from_fields("rec2", &f).unwrap_err();
        assert!(err.to_string().contains("entryPrice"), "{err}");
    }

    #[test]
    fn unknown_type_is_malformed() {
        let f = fields(json!({
            "token": "BONK",
            "type": "HOLD",
            "entryPrice": 1.0,
            "targetPrice": 1.2,
            "createdAt": "2024-03-01T10:00:00Z",
            "expiryDate": "2024-03-02T10:00:00Z",
        }));
        assert!(Signal::from_fields("rec3", &f).is_err());
    }

    #[test]
    fn eligibility_follows_selection_rules() {
        let now = ts("2024-03-05T00:00:00Z");
        let mut s = make_signal("rec", SignalType::Buy, 1.0, 1.2, 0.9);
        assert!(s.is_eligible(now));

        s.actual_return = Some(4.2);
        assert!(!s.is_eligible(now), "closed signals are never re-selected");
        s.actual_return = None;

        s.entry_price = 0.0;
        assert!(!s.is_eligible(now));
        s.entry_price = 1.0;

        s.expiry_date = now + Duration::hours(1);
        assert!(!s.is_eligible(now));
        assert!(s.is_claimable(now), "expiry does not affect claimability");
    }

    #[test]
    fn live_lease_blocks_selection_until_it_expires() {
        let now = ts("2024-03-05T00:00:00Z");
        let mut s = make_signal("rec", SignalType::Sell, 2.0, 1.8, 2.2);
        s.evaluation_lease = Some(now + Duration::minutes(5));
        assert!(!s.is_eligible(now));
        assert!(s.is_eligible(now + Duration::minutes(6)));
    }
}
