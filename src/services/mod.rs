// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod reconcile;
pub mod scrape;
pub mod strava;
pub mod sync;
pub mod taji;

pub use scrape::ScrapeError;
pub use strava::{SourceSession, StravaClient};
pub use sync::{CycleReport, SyncLoop};
pub use taji::{SinkCredentials, SinkSession};
