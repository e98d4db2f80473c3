// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod event;
pub mod run;
pub mod stats;
pub mod token;

pub use event::SinkEvent;
pub use run::{build_run, meter2mile, CanonicalRun};
pub use stats::CycleSummary;
pub use token::OAuthToken;
