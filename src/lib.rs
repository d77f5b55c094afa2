pub mod airtable;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod models;
pub mod prices;
pub mod server;
#[cfg(test)]
pub mod test_helpers;
