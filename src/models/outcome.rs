use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExitReason {
    Completed,
    Stopped,
    Expired,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::Completed => write!(f, "COMPLETED"),
            ExitReason::Stopped => write!(f, "STOPPED"),
            ExitReason::Expired => write!(f, "EXPIRED"),
        }
    }
}

/// Which threshold wins when one bar crosses both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    #[default]
    TargetFirst,
    StopFirst,
}

impl TieBreak {
    pub fn from_str_loose(s: &str) -> Option<TieBreak> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "target_first" | "target" => Some(TieBreak::TargetFirst),
            "stop_first" | "stop" => Some(TieBreak::StopFirst),
            _ => None,
        }
    }
}

impl fmt::Display for TieBreak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TieBreak::TargetFirst => write!(f, "target_first"),
            TieBreak::StopFirst => write!(f, "stop_first"),
        }
    }
}

/// How a signal would have played out. Derived, never stored on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeResult {
    pub exit_price: f64,
    pub exit_reason: ExitReason,
    /// Index of the exiting bar, or the series length on expiry.
    pub time_to_exit: usize,
    pub actual_return: f64,
    pub success: bool,
}
