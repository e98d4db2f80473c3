//! Per-cycle progress summary shown to the operator.
//!
//! Totals are recomputed from the fetched runs every cycle; nothing is
//! carried over between cycles.

use chrono::{DateTime, Local};
use std::fmt;

use crate::models::{meter2mile, CanonicalRun};

/// Progress summary for one sync cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleSummary {
    // ─── Timing ──────────────────────────────────────────────────
    /// When the cycle finished
    pub synced_at: DateTime<Local>,
    /// When the next cycle starts
    pub next_sync_at: DateTime<Local>,

    // ─── Sink ────────────────────────────────────────────────────
    /// Entries visible on Taji100 at the start of the cycle
    pub logged_events: usize,

    // ─── Source ──────────────────────────────────────────────────
    /// Total distance of the fetched runs (miles)
    pub total_miles: f64,
    /// Total elapsed time of the fetched runs (seconds)
    pub total_seconds: i64,
    /// Share of the challenge distance covered (percent)
    pub goal_percent: f64,
}

impl CycleSummary {
    /// Aggregate the fetched runs against the challenge goal.
    pub fn new(
        runs: &[CanonicalRun],
        logged_events: usize,
        goal_miles: f64,
        synced_at: DateTime<Local>,
        next_sync_at: DateTime<Local>,
    ) -> Self {
        let meters: f64 = runs.iter().map(|r| r.distance_meters).sum();
        let total_seconds: i64 = runs.iter().map(|r| r.elapsed_seconds).sum();
        let total_miles = meter2mile(meters);
        let goal_percent = if goal_miles > 0.0 {
            total_miles / goal_miles * 100.0
        } else {
            0.0
        };

        Self {
            synced_at,
            next_sync_at,
            logged_events,
            total_miles,
            total_seconds,
            goal_percent,
        }
    }

    pub fn total_minutes(&self) -> i64 {
        self.total_seconds / 60
    }
}

impl fmt::Display for CycleSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Synced at {}", self.synced_at.format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(f, "You have logged {} events", self.logged_events)?;
        writeln!(f, "totaling {:.2} miles", self.total_miles)?;
        writeln!(f, "over {} minutes.", self.total_minutes())?;
        writeln!(
            f,
            "You are {:.2}% of the way to completing Taji100. Great Job!",
            self.goal_percent
        )?;
        write!(
            f,
            "Resyncing at {}.",
            self.next_sync_at.format("%Y-%m-%d %H:%M:%S")
        )
    }
}
