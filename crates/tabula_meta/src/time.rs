//! Timestamp profile shared across the engine.
//!
//! Mirrored timestamp columns store TEXT in one fixed ISO-8601 profile so
//! that lexicographic ordering in the local store matches chronological
//! ordering.

use chrono::{DateTime, NaiveDateTime, Utc};

/// The fixed ISO-8601 profile: UTC with millisecond precision.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Formats a timestamp in the fixed profile.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parses a timestamp in the fixed profile.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}
