// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types.
//!
//! Errors are split by how the uploader reacts to them, which depends on
//! the phase: any failure while establishing the sessions stops the
//! process, while HTTP and page-structure failures inside a sync cycle are
//! logged and retried on the next cycle.

use crate::config::ConfigError;
use crate::services::scrape::ScrapeError;

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Strava API error: {0}")]
    StravaApi(String),

    #[error("Taji100 request failed: {0}")]
    Sink(String),

    #[error("Taji100 session is no longer valid")]
    SessionExpired,

    #[error("Unexpected page structure: {0}")]
    Scrape(#[from] ScrapeError),

    #[error("Timed out waiting for Strava authorization")]
    AuthorizationTimedOut,

    #[error("Strava authorization was denied: {0}")]
    AuthorizationDenied(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Message used when Strava answers 429.
    pub const STRAVA_RATE_LIMIT: &'static str = "Rate limit exceeded";

    /// Message used when Strava rejects the access token.
    pub const STRAVA_TOKEN_ERROR: &'static str = "Invalid or expired access token";

    /// Whether Strava rejected the token (expired, revoked or malformed).
    pub fn is_strava_token_error(&self) -> bool {
        match self {
            AppError::StravaApi(msg) => {
                let msg = msg.to_lowercase();
                msg.contains("token") || msg.contains("invalid")
            }
            _ => false,
        }
    }

    /// Whether the process cannot continue after this error, given the
    /// phase it was raised in.
    ///
    /// While initializing, every error is fatal: without both sessions there
    /// is nothing to fall back to, even when the cause is only a rejected
    /// login or a page that lost its anti-forgery token. Inside a
    /// sync cycle, HTTP and page-structure failures are retried by the next
    /// cycle; only configuration and internal errors stop the loop.
    pub fn is_fatal_during(&self, phase: Phase) -> bool {
        match phase {
            Phase::Initializing => true,
            Phase::Syncing => matches!(self, AppError::Config(_) | AppError::Internal(_)),
        }
    }
}

/// Lifecycle phase of the uploader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Loading credentials and establishing both sessions (runs once)
    Initializing,
    /// Periodic sync cycles, until an error fatal in this phase
    Syncing,
}

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AppError>;

