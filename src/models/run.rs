// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Canonical run record, shaped like the Taji100 "log a run" form.

use chrono::{Local, TimeZone};

use crate::time_utils::{parse_strava_timestamp, to_zone};

/// Meters to statute miles.
const MILES_PER_METER: f64 = 0.000621371;

/// One run activity, normalized from Strava into the sink's form fields.
///
/// Every time field is derived from the same instant, converted to the
/// local zone once. Field names match the form inputs they are posted as.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRun {
    /// Calendar date (`2025-02-10`)
    pub date: String,
    /// Combined 12-hour time as the sink renders it (`02:30:PM`)
    pub time: String,
    /// Zero-padded 12-hour hour (`02`)
    pub time_hours: String,
    /// Zero-padded minute (`30`)
    pub time_minutes: String,
    /// `AM` or `PM`
    pub time_ampm: String,
    /// Miles with two decimals (`3.11`)
    pub distance: String,
    /// `H:M:S` where M is the total number of minutes (`1:61:05`)
    pub duration: String,
    pub duration_hours: String,
    pub duration_minutes: String,
    pub duration_seconds: String,
    /// Not provided by the activity list, always empty.
    pub elevation_gain: String,
    /// Raw distance in meters, for totals.
    pub distance_meters: f64,
    /// Raw elapsed time in seconds, for totals.
    pub elapsed_seconds: i64,
}

impl CanonicalRun {
    /// Form fields in submission order, without the anti-forgery token.
    pub fn form_fields(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("activity", "run"),
            ("date", self.date.as_str()),
            ("time", self.time.as_str()),
            ("time_hours", self.time_hours.as_str()),
            ("time_minutes", self.time_minutes.as_str()),
            ("time_ampm", self.time_ampm.as_str()),
            ("distance", self.distance.as_str()),
            ("duration", self.duration.as_str()),
            ("duration_hours", self.duration_hours.as_str()),
            ("duration_minutes", self.duration_minutes.as_str()),
            ("duration_seconds", self.duration_seconds.as_str()),
            ("elevation_gain", self.elevation_gain.as_str()),
        ]
    }
}

/// Build a run from a Strava start timestamp, elapsed seconds and meters,
/// rendered in the machine's local time zone.
pub fn build_run(
    start_date: &str,
    elapsed_seconds: i64,
    meters: f64,
) -> Result<CanonicalRun, chrono::ParseError> {
    build_run_in(start_date, elapsed_seconds, meters, &Local)
}

/// Same as [`build_run`], in an explicit time zone.
pub fn build_run_in<Tz>(
    start_date: &str,
    elapsed_seconds: i64,
    meters: f64,
    zone: &Tz,
) -> Result<CanonicalRun, chrono::ParseError>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let start = to_zone(parse_strava_timestamp(start_date)?, zone);

    // Minutes are the total minutes, not minutes within the hour; the sink
    // has always been fed this shape.
    let seconds = elapsed_seconds % 60;
    let minutes = elapsed_seconds / 60;
    let hours = minutes / 60;

    Ok(CanonicalRun {
        date: start.format("%Y-%m-%d").to_string(),
        time: start.format("%I:%M:%p").to_string(),
        time_hours: start.format("%I").to_string(),
        time_minutes: start.format("%M").to_string(),
        time_ampm: start.format("%p").to_string(),
        distance: format!("{:.2}", meter2mile(meters)),
        duration: format!("{}:{}:{:02}", hours, minutes, seconds),
        duration_hours: hours.to_string(),
        duration_minutes: minutes.to_string(),
        duration_seconds: format!("{:02}", seconds),
        elevation_gain: String::new(),
        distance_meters: meters,
        elapsed_seconds,
    })
}

/// Convert meters to miles.
pub fn meter2mile(meters: f64) -> f64 {
    meters * MILES_PER_METER
}
