use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::models::TieBreak;

/// Settings the evaluator needs, passed in explicitly so tests can build
/// one without touching the process environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluatorConfig {
    pub tie_break: TieBreak,
    pub lease_secs: i64,
    pub dry_run: bool,
    pub limit: Option<usize>,
}

impl EvaluatorConfig {
    pub fn lease_ttl(&self) -> Duration {
        Duration::seconds(self.lease_secs)
    }
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            tie_break: TieBreak::TargetFirst,
            lease_secs: 600,
            dry_run: false,
            limit: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Airtable
    pub airtable_api_key: String,
    pub airtable_base_id: String,
    pub signals_table: String,
    pub tokens_table: String,

    // Price history
    pub birdeye_api_key: String,
    pub use_ohlcv: bool,

    // Evaluator
    pub lease_secs: i64,
    pub tie_break: TieBreak,
    pub dry_run: bool,

    // Trigger server
    pub trigger_port: u16,

    // Logging
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Required keys that are absent or blank fail.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| -> Result<String, ConfigError> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(key))
        };
        let env = |key: &str, default: &str| -> String {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let flag = |key: &'static str, default: &str| -> Result<bool, ConfigError> {
            let value = env(key, default);
            match value.to_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(true),
                "false" | "0" | "no" => Ok(false),
                _ => Err(ConfigError::Invalid { key, value }),
            }
        };

        let lease_raw = env("EVALUATOR_LEASE_SECS", "600");
        let lease_secs = lease_raw
            .parse::<i64>()
            .ok()
            .filter(|s| *s > 0)
            .ok_or(ConfigError::Invalid {
                key: "EVALUATOR_LEASE_SECS",
                value: lease_raw,
            })?;

        let tie_raw = env("EVALUATOR_TIE_BREAK", "target_first");
        let tie_break = TieBreak::from_str_loose(&tie_raw).ok_or(ConfigError::Invalid {
            key: "EVALUATOR_TIE_BREAK",
            value: tie_raw,
        })?;

        let port_raw = env("TRIGGER_PORT", "3000");
        let trigger_port = port_raw.parse::<u16>().map_err(|_| ConfigError::Invalid {
            key: "TRIGGER_PORT",
            value: port_raw,
        })?;

        Ok(Config {
            airtable_api_key: required("KINKONG_AIRTABLE_API_KEY")?,
            airtable_base_id: required("KINKONG_AIRTABLE_BASE_ID")?,
            signals_table: env("SIGNALS_TABLE", "SIGNALS"),
            tokens_table: env("TOKENS_TABLE", "TOKENS"),
            birdeye_api_key: required("BIRDEYE_API_KEY")?,
            use_ohlcv: flag("EVALUATOR_USE_OHLCV", "false")?,
            lease_secs,
            tie_break,
            dry_run: flag("EVALUATOR_DRY_RUN", "false")?,
            trigger_port,
            log_level: env("LOG_LEVEL", "info"),
        })
    }

    pub fn evaluator(&self) -> EvaluatorConfig {
        EvaluatorConfig {
            tie_break: self.tie_break,
            lease_secs: self.lease_secs,
            dry_run: self.dry_run,
            limit: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("KINKONG_AIRTABLE_API_KEY", "pat123"),
        ("KINKONG_AIRTABLE_BASE_ID", "app456"),
        ("BIRDEYE_API_KEY", "be789"),
    ];

    #[test]
    fn defaults_apply_when_optional_keys_absent() {
        let cfg = Config::from_lookup(lookup(REQUIRED)).unwrap();
        assert_eq!(cfg.signals_table, "SIGNALS");
        assert_eq!(cfg.tokens_table, "TOKENS");
        assert_eq!(cfg.lease_secs, 600);
        assert_eq!(cfg.tie_break, TieBreak::TargetFirst);
        assert!(!cfg.dry_run);
        assert!(!cfg.use_ohlcv);
        assert_eq!(cfg.trigger_port, 3000);
    }

    #[test]
    fn missing_required_key_is_fatal() {
        let err = Config::from_lookup(lookup(&REQUIRED[..2])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("BIRDEYE_API_KEY")));
    }

    #[test]
    fn blank_required_key_counts_as_missing() {
        let mut pairs = REQUIRED.to_vec();
        pairs[0] = ("KINKONG_AIRTABLE_API_KEY", "   ");
        let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("KINKONG_AIRTABLE_API_KEY")));
    }

    #[test]
    fn overrides_are_parsed() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("EVALUATOR_TIE_BREAK", "stop-first"));
        pairs.push(("EVALUATOR_LEASE_SECS", "120"));
        pairs.push(("EVALUATOR_DRY_RUN", "true"));
        let cfg = Config::from_lookup(lookup(&pairs)).unwrap();
        let eval = cfg.evaluator();
        assert_eq!(eval.tie_break, TieBreak::StopFirst);
        assert_eq!(eval.lease_ttl(), Duration::minutes(2));
        assert!(eval.dry_run);
    }

    #[test]
    fn bad_number_is_invalid() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("EVALUATOR_LEASE_SECS", "soon"));
        let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "EVALUATOR_LEASE_SECS",
                ..
            }
        ));
    }
}
