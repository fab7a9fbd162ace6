//! Timestamp helpers.
//!
//! Mesh timestamps are ISO-8601 UTC strings with second precision
//! (`2026-08-07T12:00:00Z`). The fixed format makes lexicographic
//! comparison equivalent to chronological comparison, which the
//! `since`-filtered log reads rely on.

use chrono::{DateTime, Utc};

/// Current UTC time in mesh timestamp format.
pub fn now_iso() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Parse a mesh timestamp. Returns `None` for malformed input.
pub fn parse_iso(timestamp: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(timestamp)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Age of a timestamp in seconds relative to now.
///
/// Returns `None` for malformed input; negative ages (future
/// timestamps) are returned as-is so callers can treat skew explicitly.
pub fn age_seconds(timestamp: &str) -> Option<f64> {
    let ts = parse_iso(timestamp)?;
    Some((Utc::now() - ts).num_milliseconds() as f64 / 1000.0)
}
