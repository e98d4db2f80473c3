// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Credential store and application configuration.
//!
//! Everything the uploader knows between runs lives in a single dotenv-style
//! file next to the executable. It is read once at startup, the session
//! layers fill in whatever was missing, and the whole file is written back.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default credential file name, looked up in the working directory.
pub const ENV_FILENAME: &str = "taju.env";

/// Strava application client ID (required).
pub const SOURCE_CLIENT_ID: &str = "SOURCE_CLIENT_ID";
/// Strava application client secret (required).
pub const SOURCE_CLIENT_SECRET: &str = "SOURCE_CLIENT_SECRET";
/// JSON-serialized OAuth token.
pub const SOURCE_TOKEN: &str = "SOURCE_TOKEN";
/// Taji100 `csrftoken` cookie.
pub const SINK_CSRF: &str = "SINK_CSRF";
/// Taji100 `sessionid` cookie.
pub const SINK_SESSION: &str = "SINK_SESSION";
/// Taji100 participant identifier (from the "My Page" link).
pub const SINK_PARTICIPANT: &str = "SINK_PARTICIPANT";

const SYNC_AFTER: &str = "SYNC_AFTER";
const SYNC_BEFORE: &str = "SYNC_BEFORE";
const SYNC_INTERVAL_HOURS: &str = "SYNC_INTERVAL_HOURS";
const GOAL_MILES: &str = "GOAL_MILES";
const SINK_BASE_URL: &str = "SINK_BASE_URL";
const SOURCE_API_BASE: &str = "SOURCE_API_BASE";

/// Host of the redirect URI registered with the Strava application. The
/// listener binds the same name so the browser redirect reaches it.
pub const REDIRECT_HOST: &str = "localhost";

/// Port of the redirect URI registered with the Strava application.
pub const REDIRECT_PORT: u16 = 9191;

/// Maximum number of activities requested per fetch.
pub const PAGE_SIZE: u32 = 100;

/// OAuth scope requested from Strava.
pub const OAUTH_SCOPE: &str = "read,activity:read";

/// How long to wait for the operator to finish the browser flow.
pub const AUTHORIZATION_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Durable key/value map backed by a dotenv file.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl CredentialStore {
    /// Load the store from `path`. The file must exist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        let iter = dotenvy::from_path_iter(&path).map_err(|e| ConfigError::Unreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut values = BTreeMap::new();
        for item in iter {
            let (key, value) = item.map_err(|e| ConfigError::Unreadable {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
            values.insert(key, value);
        }

        tracing::debug!(path = %path.display(), keys = values.len(), "Loaded credential store");
        Ok(Self { path, values })
    }

    /// An empty store that will be written to `path`.
    pub fn empty<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            values: BTreeMap::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    /// Look up a key that must be present.
    pub fn require(&self, key: &'static str) -> Result<&str, ConfigError> {
        self.get(key).ok_or(ConfigError::Missing(key))
    }

    /// Rewrite the whole file from the in-memory map.
    pub fn save(&self) -> Result<(), ConfigError> {
        let mut out = String::new();
        for (key, value) in &self.values {
            // Writing to a String cannot fail.
            let _ = writeln!(out, "{}={}", key, quote_value(value));
        }

        fs::write(&self.path, out).map_err(|e| ConfigError::Unwritable {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })?;

        tracing::debug!(path = %self.path.display(), keys = self.values.len(), "Saved credential store");
        Ok(())
    }
}

/// Quote a value so that `dotenvy` reads back exactly the same string.
///
/// Single quotes are literal in dotenv syntax, so they are preferred; values
/// containing a single quote or a newline fall back to escaped double quotes.
fn quote_value(value: &str) -> String {
    if !value.contains('\'') && !value.contains('\n') {
        return format!("'{}'", value);
    }

    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '\\' | '"' | '$' => {
                quoted.push('\\');
                quoted.push(c);
            }
            '\n' => quoted.push_str("\\n"),
            _ => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

/// Strava application settings.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Scheme and host of the Strava API and OAuth endpoints.
    pub api_base: String,
    /// Redirect URI registered with the Strava application.
    pub redirect_uri: String,
}

/// Taji100 site settings.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    pub base_url: String,
}

/// Sync loop settings.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Only activities starting after this instant are fetched.
    pub after: DateTime<Utc>,
    /// Only activities starting before this instant are fetched.
    pub before: DateTime<Utc>,
    /// Pause between two cycles.
    pub interval: Duration,
    /// Challenge distance used for the progress percentage.
    pub goal_miles: f64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            // 2025-02-01T00:00:00Z and 2025-03-01T00:00:00Z
            after: DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::seconds(1_738_368_000),
            before: DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::seconds(1_740_787_200),
            interval: Duration::from_secs(12 * 60 * 60),
            goal_miles: 100.0,
        }
    }
}

/// Application configuration, derived from the credential store at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub source: SourceConfig,
    pub sink: SinkConfig,
    pub sync: SyncConfig,
}

impl Config {
    /// Build the typed configuration from the credential store.
    ///
    /// The Strava client credentials are required; the tuning keys fall back
    /// to the February Taji100 challenge defaults.
    pub fn from_store(store: &CredentialStore) -> Result<Self, ConfigError> {
        let defaults = SyncConfig::default();

        let after = match store.get(SYNC_AFTER) {
            Some(v) => parse_instant(SYNC_AFTER, v)?,
            None => defaults.after,
        };
        let before = match store.get(SYNC_BEFORE) {
            Some(v) => parse_instant(SYNC_BEFORE, v)?,
            None => defaults.before,
        };
        if after >= before {
            return Err(ConfigError::Invalid {
                key: SYNC_BEFORE,
                reason: format!("window end {} is not after start {}", before, after),
            });
        }

        let interval = match store.get(SYNC_INTERVAL_HOURS) {
            Some(v) => {
                let hours: u64 = v.trim().parse().map_err(|_| ConfigError::Invalid {
                    key: SYNC_INTERVAL_HOURS,
                    reason: format!("'{}' is not a whole number of hours", v),
                })?;
                if hours == 0 {
                    return Err(ConfigError::Invalid {
                        key: SYNC_INTERVAL_HOURS,
                        reason: "interval must be at least one hour".to_string(),
                    });
                }
                let secs = hours.checked_mul(60 * 60).ok_or_else(|| ConfigError::Invalid {
                    key: SYNC_INTERVAL_HOURS,
                    reason: format!("{} hours is too long an interval", hours),
                })?;
                Duration::from_secs(secs)
            }
            None => defaults.interval,
        };

        let goal_miles = match store.get(GOAL_MILES) {
            Some(v) => {
                let goal: f64 = v.trim().parse().map_err(|_| ConfigError::Invalid {
                    key: GOAL_MILES,
                    reason: format!("'{}' is not a number", v),
                })?;
                if goal.is_nan() || goal <= 0.0 {
                    return Err(ConfigError::Invalid {
                        key: GOAL_MILES,
                        reason: "goal must be positive".to_string(),
                    });
                }
                goal
            }
            None => defaults.goal_miles,
        };

        Ok(Self {
            source: SourceConfig {
                client_id: store.require(SOURCE_CLIENT_ID)?.trim().to_string(),
                client_secret: store.require(SOURCE_CLIENT_SECRET)?.trim().to_string(),
                api_base: store
                    .get(SOURCE_API_BASE)
                    .map(|v| v.trim_end_matches('/').to_string())
                    .unwrap_or_else(|| "https://www.strava.com".to_string()),
                redirect_uri: format!("http://{}:{}", REDIRECT_HOST, REDIRECT_PORT),
            },
            sink: SinkConfig {
                base_url: store
                    .get(SINK_BASE_URL)
                    .map(|v| v.trim_end_matches('/').to_string())
                    .unwrap_or_else(|| "https://taji100.com".to_string()),
            },
            sync: SyncConfig {
                after,
                before,
                interval,
                goal_miles,
            },
        })
    }

    /// Config for testing only, pointing both sites at the given base URLs.
    pub fn test_default(source_base: &str, sink_base: &str) -> Self {
        Self {
            source: SourceConfig {
                client_id: "test_client_id".to_string(),
                client_secret: "test_secret".to_string(),
                api_base: source_base.trim_end_matches('/').to_string(),
                redirect_uri: format!("http://{}:{}", REDIRECT_HOST, REDIRECT_PORT),
            },
            sink: SinkConfig {
                base_url: sink_base.trim_end_matches('/').to_string(),
            },
            sync: SyncConfig::default(),
        }
    }
}

fn parse_instant(key: &'static str, value: &str) -> Result<DateTime<Utc>, ConfigError> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ConfigError::Invalid {
            key,
            reason: format!("'{}' is not an RFC 3339 timestamp: {}", value, e),
        })
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required key in credential file: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error(
        "Error loading file '{path}' (make sure it is in the same directory as this executable): {reason}"
    )]
    Unreadable { path: String, reason: String },

    #[error("Failed to write credential file '{path}': {reason}")]
    Unwritable { path: String, reason: String },
}
