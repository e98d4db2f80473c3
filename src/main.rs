// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Taju-Uploader
//!
//! Syncs Strava runs to Taji100 twice a day. Credentials live in
//! `taju.env` next to the executable; missing tokens are obtained
//! interactively on the first start.

use taju_uploader::{
    config::{CredentialStore, ENV_FILENAME},
    console::Terminal,
    services::SyncLoop,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let store = CredentialStore::load(ENV_FILENAME)?;
    tracing::info!(path = %store.path().display(), "Loaded credential file");

    let sync = SyncLoop::initialize(store, Terminal).await?;
    sync.run().await?;
    Ok(())
}

/// Initialize logging on stderr, so prompts and reports on stdout stay
/// readable. `LOG_FORMAT=json` switches to structured JSON output.
fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("taju_uploader=debug,info"));

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(false)
                    .with_current_span(true)
                    .flatten_event(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
