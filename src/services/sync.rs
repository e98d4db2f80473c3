// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sync loop.
//!
//! Handles the core workflow, once per cycle:
//! 1. Fetch runs from Strava
//! 2. Scrape the entries already logged on Taji100
//! 3. Work out which runs are missing
//! 4. Submit the missing runs, one at a time
//! 5. Report progress, then sleep until the next cycle

use chrono::Local;

use crate::config::{Config, CredentialStore, SOURCE_TOKEN};
use crate::console::Console;
use crate::error::{AppError, Phase, Result};
use crate::models::{CycleSummary, SinkEvent};
use crate::services::reconcile;
use crate::services::{SinkSession, SourceSession};

/// Outcome of one cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// Runs fetched from Strava
    pub runs_fetched: usize,
    /// Entries resolved on Taji100
    pub events_scraped: usize,
    /// Entries whose edit page could not be read
    pub entries_skipped: usize,
    /// Whether the entry list could not be read (no submissions this cycle)
    pub entries_unavailable: bool,
    /// Runs posted to Taji100
    pub submitted: usize,
    /// Runs whose submission failed
    pub failed_submissions: usize,
    /// First error of the cycle that must stop the loop
    pub fatal_error: Option<String>,
    pub summary: CycleSummary,
}

/// Long-running uploader: both sessions plus the store they persist to.
pub struct SyncLoop<C: Console> {
    config: Config,
    store: CredentialStore,
    source: SourceSession,
    sink: SinkSession,
    console: C,
}

impl<C: Console> SyncLoop<C> {
    /// Initialization: load the configuration, establish both sessions and
    /// persist whatever credentials were newly obtained.
    ///
    /// Every error here is fatal.
    pub async fn initialize(store: CredentialStore, console: C) -> Result<Self> {
        match Self::establish(store, console).await {
            Ok(sync) => {
                tracing::info!("Initialized successfully.");
                Ok(sync)
            }
            Err(e) => {
                if e.is_fatal_during(Phase::Initializing) {
                    tracing::error!(error = %e, "Initialization failed");
                }
                Err(e)
            }
        }
    }

    async fn establish(mut store: CredentialStore, mut console: C) -> Result<Self> {
        let config = Config::from_store(&store)?;

        let source = SourceSession::authorize(&config.source, &mut store, &mut console).await?;
        let sink = SinkSession::authenticate(&config.sink, &mut store, &mut console).await?;

        if let Err(e) = store.save() {
            tracing::warn!(error = %e, "Failed to write tokens to credential file");
        }

        Ok(Self::new(config, store, source, sink, console))
    }

    /// Assemble a loop from already established sessions.
    pub fn new(
        config: Config,
        store: CredentialStore,
        source: SourceSession,
        sink: SinkSession,
        console: C,
    ) -> Self {
        Self {
            config,
            store,
            source,
            sink,
            console,
        }
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    /// Run cycles, sleeping the configured interval in between, until a
    /// cycle hits an error that is fatal while syncing.
    pub async fn run(mut self) -> Result<()> {
        loop {
            let report = self.run_cycle().await;
            if let Some(reason) = report.fatal_error {
                tracing::error!(reason = %reason, "Stopping sync loop");
                return Err(AppError::Internal(anyhow::anyhow!(reason)));
            }
            self.console.clear();
            self.console.show(&report.summary.to_string());
            tokio::time::sleep(self.config.sync.interval).await;
        }
    }

    /// One full fetch, scrape, reconcile and submit pass.
    ///
    /// HTTP and page-structure failures do not end the cycle: a failed fetch
    /// yields no runs, an unreadable entry list skips submissions, and a
    /// failed submission is retried by the next cycle because missing runs
    /// are recomputed from scratch. Errors fatal while syncing are reported
    /// in [`CycleReport::fatal_error`].
    pub async fn run_cycle(&mut self) -> CycleReport {
        let sync = self.config.sync.clone();
        let mut fatal_error = None;

        let runs = match self.source.fetch_activities(sync.after, sync.before).await {
            Ok(runs) => runs,
            Err(e) if e.is_strava_token_error() => {
                note_fatal(&mut fatal_error, &e);
                tracing::error!(
                    error = %e,
                    "Strava rejected the token; remove SOURCE_TOKEN from the credential file and restart to authorize again"
                );
                Vec::new()
            }
            Err(e) => {
                note_fatal(&mut fatal_error, &e);
                tracing::warn!(error = %e, "Failed to fetch Strava activities");
                Vec::new()
            }
        };
        if let Err(e) = self.persist_rotated_token() {
            note_fatal(&mut fatal_error, &e);
            tracing::error!(error = %e, "Failed to serialize refreshed Strava token");
        }

        let mut events_scraped = 0;
        let mut entries_skipped = 0;
        let mut entries_unavailable = false;
        let mut submitted = 0;
        let mut failed_submissions = 0;

        match self.scrape_events().await {
            Ok((events, skipped)) => {
                events_scraped = events.len();
                entries_skipped = skipped;

                let pending = reconcile::missing(&runs, &events);
                tracing::info!(
                    runs = runs.len(),
                    events = events.len(),
                    missing = pending.len(),
                    "Reconciled runs against logged entries"
                );

                for run in pending {
                    match self.sink.post_run(run).await {
                        Ok(()) => submitted += 1,
                        Err(e) => {
                            note_fatal(&mut fatal_error, &e);
                            tracing::warn!(
                                error = %e,
                                date = %run.date,
                                time = %run.time,
                                "Failed to submit run, will retry next cycle"
                            );
                            failed_submissions += 1;
                        }
                    }
                }
            }
            Err(e) => {
                note_fatal(&mut fatal_error, &e);
                if matches!(e, AppError::SessionExpired) {
                    tracing::error!(
                        "Taji100 session expired; remove the SINK_* keys from the credential file and restart to log in again"
                    );
                } else {
                    tracing::error!(error = %e, "Failed to read logged entries, skipping submissions this cycle");
                }
                entries_unavailable = true;
            }
        }

        let synced_at = Local::now();
        let next_sync_at = synced_at
            + chrono::Duration::from_std(sync.interval)
                .unwrap_or_else(|_| chrono::Duration::hours(12));
        let summary = CycleSummary::new(
            &runs,
            events_scraped,
            sync.goal_miles,
            synced_at,
            next_sync_at,
        );

        tracing::info!(
            runs = runs.len(),
            events = events_scraped,
            skipped = entries_skipped,
            submitted,
            failed = failed_submissions,
            "Sync cycle complete"
        );

        CycleReport {
            runs_fetched: runs.len(),
            events_scraped,
            entries_skipped,
            entries_unavailable,
            submitted,
            failed_submissions,
            fatal_error,
            summary,
        }
    }

    /// Scrape every logged entry. Entries whose page lacks the expected
    /// fields are skipped; any request failure aborts the scrape.
    async fn scrape_events(&self) -> Result<(Vec<SinkEvent>, usize)> {
        let entry_ids = self.sink.list_entry_ids().await?;

        let mut events = Vec::with_capacity(entry_ids.len());
        let mut skipped = 0;
        for entry_id in &entry_ids {
            match self.sink.resolve_event(entry_id).await {
                Ok(event) => events.push(event),
                Err(AppError::Scrape(e)) => {
                    tracing::warn!(entry_id = %entry_id, error = %e, "Skipping unreadable entry");
                    skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        Ok((events, skipped))
    }

    /// Write a refreshed Strava token back to the credential file.
    ///
    /// A failed write only costs a refresh on the next start, so it is
    /// logged and not returned.
    fn persist_rotated_token(&mut self) -> Result<()> {
        if let Some(json) = self.source.take_rotated_token()? {
            self.store.set(SOURCE_TOKEN, json);
            if let Err(e) = self.store.save() {
                tracing::warn!(error = %e, "Failed to persist refreshed Strava token");
            }
        }
        Ok(())
    }
}

/// Remember the first error that must stop the loop.
fn note_fatal(slot: &mut Option<String>, error: &AppError) {
    if slot.is_none() && error.is_fatal_during(Phase::Syncing) {
        *slot = Some(error.to_string());
    }
}
