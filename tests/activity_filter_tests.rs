// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity normalization tests against a recorded activity list.

use chrono::FixedOffset;
use std::fs;
use taju_uploader::models::run::build_run_in;
use taju_uploader::models::SinkEvent;
use taju_uploader::services::reconcile;
use taju_uploader::services::strava::{runs_from_activities, StravaActivitySummary};

fn load_fixture() -> Vec<StravaActivitySummary> {
    let content =
        fs::read_to_string("tests/fixtures/activities.json").expect("Failed to read fixture");
    serde_json::from_str(&content).expect("Failed to parse fixture")
}

#[test]
fn test_only_runs_are_kept_in_order() {
    let activities = load_fixture();
    assert_eq!(activities.len(), 5);

    let runs = runs_from_activities(&activities);

    // Ride and Walk are dropped, the run with a broken timestamp is skipped.
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].elapsed_seconds, 2712);
    assert_eq!(runs[1].elapsed_seconds, 5425);
    assert_eq!(runs[0].distance, "5.00");
    assert_eq!(runs[1].distance, "10.00");
    assert_eq!(runs[1].duration, "1:90:25");
}

#[test]
fn test_runs_rendered_in_zone() {
    let pacific = FixedOffset::west_opt(8 * 3600).unwrap();
    let run = build_run_in("2025-02-03T15:02:11Z", 2712, 8046.7, &pacific).unwrap();

    assert_eq!(run.date, "2025-02-03");
    assert_eq!(run.time, "07:02:AM");
    assert_eq!(run.time_hours, "07");
    assert_eq!(run.time_minutes, "02");
    assert_eq!(run.time_ampm, "AM");
    assert_eq!(run.duration, "0:45:12");
}

#[test]
fn test_reconcile_against_logged_entries() {
    let pacific = FixedOffset::west_opt(8 * 3600).unwrap();
    let runs = vec![
        build_run_in("2025-02-03T15:02:11Z", 2712, 8046.7, &pacific).unwrap(),
        build_run_in("2025-02-08T16:30:00Z", 5425, 16093.4, &pacific).unwrap(),
    ];
    let events = vec![
        SinkEvent::new("2025-02-03", "07:02:AM"),
        // Same time, other day: not a match.
        SinkEvent::new("2025-02-07", "08:30:AM"),
    ];

    let missing = reconcile::missing(&runs, &events);
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].date, "2025-02-08");
    assert_eq!(missing[0].time, "08:30:AM");
}
