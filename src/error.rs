//! Error types for the evaluator and its I/O seams.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Error, Debug)]
pub enum SignalError {
    #[error("signal {id} is malformed: {reason}")]
    Malformed { id: String, reason: String },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("airtable returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Signal(#[from] SignalError),
}

#[derive(Error, Debug)]
pub enum PriceError {
    #[error("price api returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("price api rejected request for {mint}")]
    Rejected { mint: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Failures that abort a whole batch. Per-signal failures never surface here.
#[derive(Error, Debug)]
pub enum EvaluatorError {
    #[error("could not load pending signals: {0}")]
    Selection(#[source] StoreError),
}
