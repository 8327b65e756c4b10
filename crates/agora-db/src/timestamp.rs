//! Timestamps are stored as fixed-width UTC text so that string order in
//! SQLite equals chronological order.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::DbError;

const STORE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

pub(crate) fn to_sql(ts: &DateTime<Utc>) -> String {
    ts.format(STORE_FORMAT).to_string()
}

/// Parse a stored timestamp. Also accepts SQLite's own `datetime('now')`
/// output (no fraction), which is a prefix of the stored form and so sorts
/// consistently with it. Other layouts (RFC 3339's `T` separator) would
/// break text ordering and are rejected.
pub(crate) fn from_sql(value: &str) -> Result<DateTime<Utc>, DbError> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S"))
        .map(|ndt| ndt.and_utc())
        .map_err(|_| DbError::CorruptTimestamp {
            value: value.to_string(),
        })
}
