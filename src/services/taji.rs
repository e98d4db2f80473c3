// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Taji100 session: cookie login, entry scraping and run submission.
//!
//! Taji100 is a Django site without an API. The session is the pair of
//! `csrftoken`/`sessionid` cookies plus the participant identifier taken
//! from the "My Page" link; every state-changing POST also needs the
//! anti-forgery token rendered into the form page it is submitted from.

use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::REFERER;
use reqwest::Url;
use std::sync::Arc;

use crate::config::{CredentialStore, SinkConfig, SINK_CSRF, SINK_PARTICIPANT, SINK_SESSION};
use crate::console::Console;
use crate::error::{AppError, Result};
use crate::models::{CanonicalRun, SinkEvent};
use crate::services::scrape;

const CSRF_COOKIE: &str = "csrftoken";
const SESSION_COOKIE: &str = "sessionid";

const LOGIN_PATH: &str = "/account/login/";
const NEW_LOG_PATH: &str = "/log/new?activity=run";

/// Values that identify a logged-in participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkCredentials {
    pub csrf: String,
    pub session: String,
    pub participant_id: String,
}

impl SinkCredentials {
    /// Read the stored triplet; `None` unless all three are present.
    pub fn from_store(store: &CredentialStore) -> Option<Self> {
        let get = |key: &str| store.get(key).filter(|v| !v.is_empty()).map(str::to_string);
        Some(Self {
            csrf: get(SINK_CSRF)?,
            session: get(SINK_SESSION)?,
            participant_id: get(SINK_PARTICIPANT)?,
        })
    }

    pub fn write_to(&self, store: &mut CredentialStore) {
        store.set(SINK_CSRF, self.csrf.as_str());
        store.set(SINK_SESSION, self.session.as_str());
        store.set(SINK_PARTICIPANT, self.participant_id.as_str());
    }
}

/// Authenticated Taji100 session.
///
/// The HTTP client and its cookie jar belong to this session alone.
pub struct SinkSession {
    http: reqwest::Client,
    jar: Arc<Jar>,
    base: Url,
    base_url: String,
    credentials: SinkCredentials,
}

impl SinkSession {
    /// Restore the session from the credential store, or log in
    /// interactively and record the new credentials in the store.
    pub async fn authenticate(
        config: &SinkConfig,
        store: &mut CredentialStore,
        console: &mut dyn Console,
    ) -> Result<Self> {
        if let Some(credentials) = SinkCredentials::from_store(store) {
            tracing::info!("Successfully loaded Taji session tokens");
            return Self::restore(config, credentials);
        }

        let session = Self::login(config, console).await?;
        session.credentials.write_to(store);
        Ok(session)
    }

    /// Adopt stored cookies without contacting the server.
    pub fn restore(config: &SinkConfig, credentials: SinkCredentials) -> Result<Self> {
        let (http, jar, base) = build_client(&config.base_url)?;

        jar.add_cookie_str(&format!("{}={}; Path=/", CSRF_COOKIE, credentials.csrf), &base);
        jar.add_cookie_str(
            &format!("{}={}; Path=/", SESSION_COOKIE, credentials.session),
            &base,
        );

        Ok(Self {
            http,
            jar,
            base,
            base_url: config.base_url.clone(),
            credentials,
        })
    }

    /// Log in with the operator's username and password.
    pub async fn login(config: &SinkConfig, console: &mut dyn Console) -> Result<Self> {
        let (http, jar, base) = build_client(&config.base_url)?;
        let login_url = format!("{}{}", config.base_url, LOGIN_PATH);

        let login_page = fetch_text(&http, &login_url).await?.1;
        let csrfmiddlewaretoken = scrape::extract_csrf_token(&login_page, "login")?;

        let username = console.ask(
            "Enter your Taji100 username (it should be your email address) and hit ENTER: ",
        )?;
        let password = console.ask("Enter your Taji100 password and hit ENTER: ")?;

        let response = http
            .post(&login_url)
            .header(REFERER, &login_url)
            .form(&[
                ("csrfmiddlewaretoken", csrfmiddlewaretoken.as_str()),
                ("email", username.as_str()),
                ("password", password.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::Sink(format!("Login request failed: {}", e)))?;
        tracing::debug!(status = %response.status(), url = %response.url(), "Login form submitted");

        let cookies = jar
            .cookies(&base)
            .and_then(|v| v.to_str().ok().map(str::to_string))
            .unwrap_or_default();
        let csrf = cookie_value(&cookies, CSRF_COOKIE);
        let session = cookie_value(&cookies, SESSION_COOKIE);
        let (Some(csrf), Some(session)) = (csrf, session) else {
            return Err(AppError::Sink(
                "Login did not establish a session; check the username and password".to_string(),
            ));
        };

        let home = fetch_text(&http, &format!("{}/", config.base_url)).await?.1;
        let participant_id = scrape::extract_participant_id(&home)?;

        tracing::info!(participant = %participant_id, "Logged in to Taji100");

        Ok(Self {
            http,
            jar,
            base,
            base_url: config.base_url.clone(),
            credentials: SinkCredentials {
                csrf,
                session,
                participant_id,
            },
        })
    }

    /// Credentials to persist for the next start.
    pub fn credentials(&self) -> &SinkCredentials {
        &self.credentials
    }

    /// Identifiers of every entry on the participant's page.
    pub async fn list_entry_ids(&self) -> Result<Vec<String>> {
        let url = format!(
            "{}/participants/{}/",
            self.base_url, self.credentials.participant_id
        );
        let body = self.get_authenticated(&url).await?;
        let ids = scrape::extract_entry_ids(&body);
        tracing::debug!(entries = ids.len(), "Scraped participant page");
        Ok(ids)
    }

    /// Logged date and time of one entry, from its edit form.
    pub async fn resolve_event(&self, entry_id: &str) -> Result<SinkEvent> {
        let url = format!("{}/log/{}/edit", self.base_url, entry_id);
        let body = self.get_authenticated(&url).await?;
        Ok(scrape::extract_event(&body, entry_id)?)
    }

    /// Submit one run through the "log a run" form.
    ///
    /// Success means the POST completed; the sink's answer is not checked
    /// beyond its status code, which is only logged.
    pub async fn post_run(&self, run: &CanonicalRun) -> Result<()> {
        let form_url = format!("{}{}", self.base_url, NEW_LOG_PATH);
        let form_page = self.get_authenticated(&form_url).await?;
        let csrfmiddlewaretoken = scrape::extract_csrf_token(&form_page, "new log")?;

        let mut fields = vec![("csrfmiddlewaretoken", csrfmiddlewaretoken.as_str())];
        fields.extend(run.form_fields());

        let response = self
            .http
            .post(&form_url)
            .header(REFERER, &form_url)
            .form(&fields)
            .send()
            .await
            .map_err(|e| AppError::Sink(format!("Run submission failed: {}", e)))?;

        let status = response.status();
        if status.is_success() || status.is_redirection() {
            tracing::info!(date = %run.date, time = %run.time, distance = %run.distance, "Run submitted");
        } else {
            tracing::warn!(
                status = %status,
                date = %run.date,
                time = %run.time,
                "Taji100 answered the submission with an error status"
            );
        }
        Ok(())
    }

    /// GET a page that requires the session; a bounce to the login form
    /// means the cookies are no longer accepted.
    async fn get_authenticated(&self, url: &str) -> Result<String> {
        let (final_url, body) = fetch_text(&self.http, url).await?;
        if scrape::is_login_page(final_url.path()) {
            tracing::warn!(url = %url, "Taji100 redirected to the login page");
            return Err(AppError::SessionExpired);
        }
        Ok(body)
    }

    /// Cookies currently held for the site, for diagnostics.
    pub fn cookie_header(&self) -> Option<String> {
        self.jar
            .cookies(&self.base)
            .and_then(|v| v.to_str().ok().map(str::to_string))
    }
}

/// Client with a cookie jar scoped to the site.
fn build_client(base_url: &str) -> Result<(reqwest::Client, Arc<Jar>, Url)> {
    let base = Url::parse(base_url)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to parse Taji100 URL: {}", e)))?;
    let jar = Arc::new(Jar::default());
    let http = reqwest::Client::builder()
        .cookie_provider(jar.clone())
        .build()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build HTTP client: {}", e)))?;
    Ok((http, jar, base))
}

/// GET `url`, returning the URL after redirects and the body.
async fn fetch_text(http: &reqwest::Client, url: &str) -> Result<(Url, String)> {
    let response = http
        .get(url)
        .send()
        .await
        .map_err(|e| AppError::Sink(format!("GET {} failed: {}", url, e)))?;

    let status = response.status();
    let final_url = response.url().clone();
    if !status.is_success() {
        return Err(AppError::Sink(format!("GET {}: HTTP {}", url, status)));
    }

    let body = response
        .text()
        .await
        .map_err(|e| AppError::Sink(format!("Failed to read {}: {}", url, e)))?;
    Ok((final_url, body))
}

/// Value of cookie `name` in a `Cookie` header.
fn cookie_value(header: &str, name: &str) -> Option<String> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_value() {
        let header = "csrftoken=abc; sessionid=xyz=1";
        assert_eq!(cookie_value(header, "csrftoken").as_deref(), Some("abc"));
        assert_eq!(cookie_value(header, "sessionid").as_deref(), Some("xyz=1"));
        assert_eq!(cookie_value(header, "missing"), None);
    }

    #[test]
    fn test_credentials_require_all_three() {
        let mut store = CredentialStore::empty("unused.env");
        store.set(SINK_CSRF, "c");
        store.set(SINK_SESSION, "s");
        assert_eq!(SinkCredentials::from_store(&store), None);

        store.set(SINK_PARTICIPANT, "");
        assert_eq!(SinkCredentials::from_store(&store), None);

        store.set(SINK_PARTICIPANT, "jane");
        assert_eq!(
            SinkCredentials::from_store(&store),
            Some(SinkCredentials {
                csrf: "c".to_string(),
                session: "s".to_string(),
                participant_id: "jane".to_string(),
            })
        );
    }

    #[test]
    fn test_restore_installs_cookies() {
        let config = SinkConfig {
            base_url: "https://taji100.com".to_string(),
        };
        let session = SinkSession::restore(
            &config,
            SinkCredentials {
                csrf: "c1".to_string(),
                session: "s1".to_string(),
                participant_id: "jane".to_string(),
            },
        )
        .unwrap();

        let header = session.cookie_header().unwrap();
        assert!(header.contains("csrftoken=c1"));
        assert!(header.contains("sessionid=s1"));
    }
}
