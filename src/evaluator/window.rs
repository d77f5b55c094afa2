use chrono::{DateTime, Utc};

use crate::models::TimeWindow;

/// History window for a signal active over `[created_at, expiry_date]`.
///
/// A bound in the future slides the whole window back so it ends at `now`,
/// keeping its length. Returns `None` when the window is empty or inverted.
pub fn history_window(
    created_at: DateTime<Utc>,
    expiry_date: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Option<TimeWindow> {
    if expiry_date <= created_at {
        return None;
    }

    if created_at <= now && expiry_date <= now {
        return Some(TimeWindow::new(created_at, expiry_date));
    }

    let duration = expiry_date - created_at;
    Some(TimeWindow {
        start: now - duration,
        end: now,
        adjusted: true,
    })
}
