/// Escape a value for use inside a single-quoted formula string.
pub fn escape_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Signals past expiry, not yet scored, with usable prices and no live lease.
/// Expiry is judged by Airtable's clock, which may drift from ours.
pub fn pending_signals_formula() -> String {
    "AND(\
IS_BEFORE({expiryDate}, NOW()), \
{actualReturn} = BLANK(), \
{entryPrice} > 0, \
{targetPrice} > 0, \
OR({evaluationLease} = BLANK(), IS_BEFORE({evaluationLease}, NOW())))"
        .to_string()
}

pub fn token_lookup_formula(symbol: &str) -> String {
    format!("{{token}} = '{}'", escape_string(symbol))
}
