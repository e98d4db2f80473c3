// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Field extraction from Taji100 pages.
//!
//! Taji100 has no API, so everything the uploader needs is pulled out of
//! server-rendered HTML with one pattern per field. Each extractor is a pure
//! function from page text to a typed value, so a markup change touches one
//! function and never the request flow.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::SinkEvent;

static CSRF_MIDDLEWARE_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<input type=['"]hidden['"] name=['"]csrfmiddlewaretoken['"] value=['"]([^'"]*)['"]\s*/?>"#)
        .expect("valid regex")
});

static MY_PAGE_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<a class="nav-link w-nav-link" href="/participants/([^"/]+)/">My Page</a>"#)
        .expect("valid regex")
});

static ENTRY_EDIT_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<a href="/log/([^"/]+)/edit"><i"#).expect("valid regex"));

static CHECKED_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"value="([^"]*)" checked"#).expect("valid regex"));

static TIME_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"name="time" value="([^"]*)""#).expect("valid regex"));

/// A page did not contain the field we were looking for.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScrapeError {
    #[error("anti-forgery token not found on {0} page")]
    MissingCsrfToken(&'static str),

    #[error("\"My Page\" link not found on the home page")]
    MissingParticipantLink,

    #[error("checked date not found on edit page of entry {0}")]
    MissingDate(String),

    #[error("time value not found on edit page of entry {0}")]
    MissingTime(String),
}

/// Anti-forgery token of the form on `page` (`login`, `new log`).
pub fn extract_csrf_token(html: &str, page: &'static str) -> Result<String, ScrapeError> {
    CSRF_MIDDLEWARE_TOKEN
        .captures(html)
        .map(|c| c[1].to_string())
        .ok_or(ScrapeError::MissingCsrfToken(page))
}

/// Participant identifier from the "My Page" navigation link.
pub fn extract_participant_id(html: &str) -> Result<String, ScrapeError> {
    MY_PAGE_LINK
        .captures(html)
        .map(|c| c[1].to_string())
        .ok_or(ScrapeError::MissingParticipantLink)
}

/// Identifiers of every entry edit link on a participant page, in page order.
///
/// A participant without entries has no links, which is not an error.
pub fn extract_entry_ids(html: &str) -> Vec<String> {
    ENTRY_EDIT_LINK
        .captures_iter(html)
        .map(|c| c[1].to_string())
        .collect()
}

/// Logged date and time from an entry's edit form.
pub fn extract_event(html: &str, entry_id: &str) -> Result<SinkEvent, ScrapeError> {
    let date = CHECKED_DATE
        .captures(html)
        .map(|c| c[1].to_string())
        .ok_or_else(|| ScrapeError::MissingDate(entry_id.to_string()))?;
    let time = TIME_VALUE
        .captures(html)
        .map(|c| c[1].to_string())
        .ok_or_else(|| ScrapeError::MissingTime(entry_id.to_string()))?;

    Ok(SinkEvent { date, time })
}

/// Whether a page is the login form, i.e. the session cookies were rejected.
pub fn is_login_page(path: &str) -> bool {
    path.trim_end_matches('/').ends_with("/account/login")
}
