//! Time helpers
//!
//! All persisted timestamps are UTC, serialized as RFC3339 strings.

use chrono::{DateTime, SecondsFormat, Utc};

/// Current UTC time as an RFC3339 string (millisecond precision)
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored RFC3339 timestamp, tolerating missing/invalid values
pub fn parse_rfc3339(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
