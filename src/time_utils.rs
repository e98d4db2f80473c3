// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time handling.

use chrono::{DateTime, FixedOffset, SecondsFormat, TimeZone, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a Strava ISO-8601 timestamp (`2025-02-10T14:30:00Z`).
pub fn parse_strava_timestamp(value: &str) -> Result<DateTime<FixedOffset>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value)
}

/// Convert an instant into the given zone, exactly once.
pub fn to_zone<Tz: TimeZone>(instant: DateTime<FixedOffset>, zone: &Tz) -> DateTime<Tz> {
    instant.with_timezone(zone)
}
