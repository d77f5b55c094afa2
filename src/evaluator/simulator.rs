use crate::models::{ExitReason, PricePoint, PriceSeries, Signal, SignalType, TieBreak, TradeResult};

/// Round to two decimal places, the precision `actualReturn` is stored with.
/// Halves round away from zero, so -0.125 becomes -0.13 (JavaScript's
/// `Math.round` would give -0.12).
pub fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Percentage return and success flag for a trade closed at `exit`.
pub fn compute_return(signal_type: SignalType, entry: f64, exit: f64) -> (f64, bool) {
    match signal_type {
        SignalType::Buy => (round_to_cents((exit - entry) / entry * 100.0), exit > entry),
        SignalType::Sell => (round_to_cents((entry - exit) / entry * 100.0), exit < entry),
    }
}

/// Threshold crossings inside one bar, with the price each would fill at.
struct BarHits {
    target: Option<f64>,
    stop: Option<f64>,
}

fn bar_hits(signal: &Signal, bar: &PricePoint) -> BarHits {
    let close = bar.value;
    let target = signal.target_price;
    let stop = signal.stop_loss;
    let has_stop = stop > 0.0;

    match signal.signal_type {
        SignalType::Buy => BarHits {
            target: if close >= target {
                Some(close)
            } else if bar.high() >= target {
                Some(target)
            } else {
                None
            },
            stop: if !has_stop {
                None
            } else if close <= stop {
                Some(close)
            } else if bar.low() <= stop {
                Some(stop)
            } else {
                None
            },
        },
        SignalType::Sell => BarHits {
            target: if close <= target {
                Some(close)
            } else if bar.low() <= target {
                Some(target)
            } else {
                None
            },
            stop: if !has_stop {
                None
            } else if close >= stop {
                Some(close)
            } else if bar.high() >= stop {
                Some(stop)
            } else {
                None
            },
        },
    }
}

/// Replay `series` against the signal's target and stop.
///
/// Bars are visited in order and the first one crossing a threshold closes
/// the trade. With value-only points a crossing fills at that value. When a
/// bar carries a high/low range and only an extreme crossed, the fill is the
/// threshold itself. If a single bar crosses both, `tie_break` picks.
///
/// Returns `None` for an empty series.
pub fn simulate_trade(
    signal: &Signal,
    series: &PriceSeries,
    tie_break: TieBreak,
) -> Option<TradeResult> {
    let last = series.last()?;

    let mut exit = None;
    for (i, bar) in series.iter().enumerate() {
        let hits = bar_hits(signal, bar);
        let fired = match (hits.target, hits.stop, tie_break) {
            (Some(t), None, _) | (Some(t), Some(_), TieBreak::TargetFirst) => {
                Some((t, ExitReason::Completed))
            }
            (None, Some(s), _) | (Some(_), Some(s), TieBreak::StopFirst) => {
                Some((s, ExitReason::Stopped))
            }
            (None, None, _) => None,
        };
        if let Some((price, reason)) = fired {
            exit = Some((price, reason, i));
            break;
        }
    }

    let (exit_price, exit_reason, time_to_exit) =
        exit.unwrap_or((last.value, ExitReason::Expired, series.len()));
    let (actual_return, success) =
        compute_return(signal.signal_type, signal.entry_price, exit_price);

    Some(TradeResult {
        exit_price,
        exit_reason,
        time_to_exit,
        actual_return,
        success,
    })
}
