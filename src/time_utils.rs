// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde_json::Value;

use crate::services::normalizer::path::lookup;

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse the calendar day out of an RFC3339 timestamp or a `YYYY-MM-DD` string.
///
/// For full timestamps the day is taken in the timestamp's own offset, so a
/// night's sleep ending at 07:00+02:00 belongs to that local morning.
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    raw.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

/// Pick the day a data item belongs to.
///
/// Tries each field path in order and falls back to `fallback`.
pub fn measurement_date(item: &Value, fields: &[&str], fallback: DateTime<Utc>) -> String {
    fields
        .iter()
        .find_map(|field| {
            lookup(item, field)
                .and_then(Value::as_str)
                .and_then(parse_calendar_date)
        })
        .unwrap_or_else(|| fallback.date_naive())
        .format("%Y-%m-%d")
        .to_string()
}
