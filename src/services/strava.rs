// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava API client and the source session.
//!
//! Handles:
//! - First-time OAuth authorization through the local redirect listener
//! - Token refresh when expired
//! - Activity fetching and normalization into canonical runs

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::config::{
    CredentialStore, SourceConfig, AUTHORIZATION_TIMEOUT, OAUTH_SCOPE, PAGE_SIZE, REDIRECT_HOST,
    REDIRECT_PORT, SOURCE_TOKEN,
};
use crate::console::Console;
use crate::error::{AppError, Result};
use crate::models::{build_run, CanonicalRun, OAuthToken};
use crate::routes::auth::{generate_oauth_state, AuthorizationGrant, RedirectListener};
use crate::time_utils::format_utc_rfc3339;

/// Margin before token expiration when we proactively refresh (5 minutes).
const TOKEN_REFRESH_MARGIN_SECS: i64 = 5 * 60;

/// Strava API client.
#[derive(Clone)]
pub struct StravaClient {
    http: reqwest::Client,
    api_base: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl StravaClient {
    /// Create a new Strava client with OAuth credentials.
    pub fn new(config: &SourceConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: config.api_base.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
        }
    }

    /// URL of the authorization dialog the operator has to visit.
    pub fn authorization_url(&self, state: &str) -> String {
        format!(
            "{}/oauth/authorize?\
             client_id={}&\
             redirect_uri={}&\
             response_type=code&\
             approval_prompt=force&\
             scope={}&\
             state={}",
            self.api_base,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(OAUTH_SCOPE),
            urlencoding::encode(state)
        )
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(&self, grant: &AuthorizationGrant) -> Result<OAuthToken> {
        let response = self
            .http
            .post(format!("{}/oauth/token", self.api_base))
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", grant.code.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| AppError::StravaApi(format!("Token exchange failed: {}", e)))?;

        let body: TokenResponse = self.check_response_json(response).await?;
        Ok(body.into_token(grant.scope.clone()))
    }

    /// Refresh an expired access token.
    pub async fn refresh_token(&self, token: &OAuthToken) -> Result<OAuthToken> {
        let response = self
            .http
            .post(format!("{}/oauth/token", self.api_base))
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", token.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| AppError::StravaApi(format!("Token refresh request failed: {}", e)))?;

        let body: TokenResponse = self.check_response_json(response).await?;
        Ok(body.into_token(token.scope.clone()))
    }

    /// List activities started inside `(after, before)`.
    pub async fn list_activities(
        &self,
        access_token: &str,
        after: i64, // Unix timestamp
        before: i64,
        per_page: u32,
    ) -> Result<Vec<StravaActivitySummary>> {
        let response = self
            .http
            .get(format!("{}/api/v3/athlete/activities", self.api_base))
            .bearer_auth(access_token)
            .query(&[
                ("after", after.to_string()),
                ("before", before.to_string()),
                ("per_page", per_page.to_string()),
            ])
            .send()
            .await
            .map_err(|e| AppError::StravaApi(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                tracing::warn!("Strava rate limit hit (429)");
                return Err(AppError::StravaApi(AppError::STRAVA_RATE_LIMIT.to_string()));
            }

            if status.as_u16() == 401 {
                return Err(AppError::StravaApi(
                    AppError::STRAVA_TOKEN_ERROR.to_string(),
                ));
            }

            return Err(AppError::StravaApi(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::StravaApi(format!("JSON parse error: {}", e)))
    }
}

/// Token response from Strava's token endpoint (exchange and refresh).
#[derive(Debug, Clone, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_at: i64,
    #[serde(default)]
    token_type: Option<String>,
}

impl TokenResponse {
    fn into_token(self, scope: Option<String>) -> OAuthToken {
        OAuthToken {
            access_token: self.access_token,
            token_type: self.token_type.unwrap_or_else(|| "Bearer".to_string()),
            refresh_token: self.refresh_token,
            expiry: DateTime::from_timestamp(self.expires_at, 0).unwrap_or_else(Utc::now),
            scope,
        }
    }
}

/// Summary activity for list endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct StravaActivitySummary {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub activity_type: String,
    pub start_date: String,
    /// Seconds
    pub elapsed_time: f64,
    /// Meters
    pub distance: f64,
}

/// Keep only runs, in list order, and normalize them.
///
/// Other activity types are skipped silently. A run whose start date cannot
/// be parsed is skipped with a warning.
pub fn runs_from_activities(activities: &[StravaActivitySummary]) -> Vec<CanonicalRun> {
    activities
        .iter()
        .filter(|a| a.activity_type == "Run")
        .filter_map(|a| match build_run(&a.start_date, a.elapsed_time as i64, a.distance) {
            Ok(run) => Some(run),
            Err(e) => {
                tracing::warn!(
                    activity_id = ?a.id,
                    start_date = %a.start_date,
                    error = %e,
                    "Skipping run with unparsable start date"
                );
                None
            }
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// SourceSession - authenticated Strava access with token lifecycle
// ─────────────────────────────────────────────────────────────────────────────

/// Authenticated Strava session.
///
/// Owns the token; callers only issue requests through it. A refreshed token
/// is reported once through [`SourceSession::take_rotated_token`] so it can be
/// persisted.
pub struct SourceSession {
    client: StravaClient,
    token: OAuthToken,
    rotated: bool,
}

impl SourceSession {
    /// Restore the stored token, or authorize interactively and record the
    /// new token in the store.
    ///
    /// A stored token that no longer parses is discarded and replaced.
    pub async fn authorize(
        config: &SourceConfig,
        store: &mut CredentialStore,
        console: &mut dyn Console,
    ) -> Result<Self> {
        if let Some(json) = store.get(SOURCE_TOKEN).filter(|v| !v.is_empty()) {
            match OAuthToken::from_json(json) {
                Ok(token) => {
                    tracing::info!("Successfully loaded Strava Oauth token");
                    return Ok(Self::restore(config, token));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Stored Strava token is unreadable, authorizing again");
                }
            }
        }

        let session = Self::authorize_interactive(config, console).await?;
        store.set(SOURCE_TOKEN, session.token_json()?);
        Ok(session)
    }

    /// Use a previously stored token.
    pub fn restore(config: &SourceConfig, token: OAuthToken) -> Self {
        Self {
            client: StravaClient::new(config),
            token,
            rotated: false,
        }
    }

    /// Run the interactive authorization-code flow.
    ///
    /// Prints the authorization URL, waits for the browser redirect on the
    /// local listener and exchanges the code. Any failure here is fatal for
    /// the caller.
    pub async fn authorize_interactive(
        config: &SourceConfig,
        console: &mut dyn Console,
    ) -> Result<Self> {
        let listener = RedirectListener::bind((REDIRECT_HOST, REDIRECT_PORT)).await?;
        Self::authorize_with_listener(config, console, listener, AUTHORIZATION_TIMEOUT).await
    }

    /// Same as [`SourceSession::authorize_interactive`] with an already
    /// bound listener and explicit timeout.
    pub async fn authorize_with_listener(
        config: &SourceConfig,
        console: &mut dyn Console,
        listener: RedirectListener,
        timeout: std::time::Duration,
    ) -> Result<Self> {
        let client = StravaClient::new(config);
        let state = generate_oauth_state()?;

        console.show("We need to authorize Taj Uploader to access your Strava account...");
        console.show(&format!(
            "please visit the URL for the authorization dialog:\n\n{}\n",
            client.authorization_url(&state)
        ));

        let grant = listener.wait_for_code(&state, timeout).await?;

        tracing::info!("Exchanging authorization code for tokens");
        let token = client.exchange_code(&grant).await.map_err(|e| {
            tracing::error!(error = %e, "Strava token exchange failed");
            e
        })?;
        tracing::info!("Successful authorization");

        Ok(Self {
            client,
            token,
            rotated: false,
        })
    }

    /// Token serialized for the credential store.
    pub fn token_json(&self) -> Result<String> {
        self.token
            .to_json()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize token: {}", e)))
    }

    /// Serialized token if it was refreshed since the last call.
    pub fn take_rotated_token(&mut self) -> Result<Option<String>> {
        if !self.rotated {
            return Ok(None);
        }
        self.rotated = false;
        self.token_json().map(Some)
    }

    /// Refresh the access token if it expires within the refresh margin.
    async fn ensure_fresh_token(&mut self) -> Result<()> {
        let margin = Duration::seconds(TOKEN_REFRESH_MARGIN_SECS);
        if !self.token.expires_within(Utc::now(), margin) {
            return Ok(());
        }
        if self.token.refresh_token.is_empty() {
            return Err(AppError::StravaApi(AppError::STRAVA_TOKEN_ERROR.to_string()));
        }

        tracing::info!("Access token expired, refreshing");
        self.token = self.client.refresh_token(&self.token).await?;
        self.rotated = true;
        tracing::info!(expiry = %self.token.expiry, "Token refreshed");
        Ok(())
    }

    /// Fetch runs started inside the window, normalized for the sink.
    pub async fn fetch_activities(
        &mut self,
        after: DateTime<Utc>,
        before: DateTime<Utc>,
    ) -> Result<Vec<CanonicalRun>> {
        self.ensure_fresh_token().await?;

        let activities = self
            .client
            .list_activities(
                &self.token.access_token,
                after.timestamp(),
                before.timestamp(),
                PAGE_SIZE,
            )
            .await?;

        let runs = runs_from_activities(&activities);
        tracing::info!(
            after = %format_utc_rfc3339(after),
            before = %format_utc_rfc3339(before),
            activities = activities.len(),
            runs = runs.len(),
            "Fetched Strava activities"
        );
        Ok(runs)
    }
}
