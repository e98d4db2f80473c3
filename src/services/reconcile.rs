// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Decide which runs still need to be logged.

use crate::models::{CanonicalRun, SinkEvent};

/// Whether `event` is the sink's record of `run`.
///
/// Strava and Taji100 share no identifier, so an entry counts as the same
/// run when date and start time (to the minute) match. Two runs started in
/// the same minute are indistinguishable.
pub fn is_logged(run: &CanonicalRun, event: &SinkEvent) -> bool {
    run.date == event.date && run.time == event.time
}

/// Runs with no matching event, in their original order.
pub fn missing<'a>(runs: &'a [CanonicalRun], events: &[SinkEvent]) -> Vec<&'a CanonicalRun> {
    runs.iter()
        .filter(|run| !events.iter().any(|event| is_logged(run, event)))
        .collect()
}
