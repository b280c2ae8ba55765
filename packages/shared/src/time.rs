//! Time-related utilities.

use chrono::{DateTime, Utc};

/// Get current Unix timestamp in UTC (milliseconds)
pub fn get_utc_timestamp() -> i64 {
    Utc::now().timestamp_millis()
}

/// Convert Unix timestamp (milliseconds) to a human readable UTC date,
/// e.g. `Sun Jan  1 2023 at 00:00:00 UTC`.
///
/// Out-of-range timestamps fall back to the Unix epoch.
pub fn timestamp_to_utc_display(timestamp_millis: i64) -> String {
    let datetime = DateTime::<Utc>::from_timestamp_millis(timestamp_millis).unwrap_or_default();
    datetime.format("%a %b %e %Y at %H:%M:%S UTC").to_string()
}
