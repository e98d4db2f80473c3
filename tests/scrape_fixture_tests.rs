// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Field extraction against saved Taji100 pages.

use std::fs;
use taju_uploader::models::SinkEvent;
use taju_uploader::services::scrape;

fn fixture(name: &str) -> String {
    fs::read_to_string(format!("tests/fixtures/{}", name)).expect("Failed to read fixture")
}

#[test]
fn test_participant_from_home_page() {
    let html = fixture("home_page.html");
    assert_eq!(scrape::extract_participant_id(&html).unwrap(), "jane-doe-42");
}

#[test]
fn test_entry_ids_from_participant_page() {
    let html = fixture("participant_page.html");
    assert_eq!(scrape::extract_entry_ids(&html), vec!["981", "977", "964"]);
}

#[test]
fn test_event_from_edit_page() {
    let html = fixture("edit_page.html");
    let event = scrape::extract_event(&html, "977").unwrap();
    assert_eq!(event, SinkEvent::new("2025-02-08", "08:30:AM"));
}

#[test]
fn test_csrf_token_from_edit_page() {
    let html = fixture("edit_page.html");
    assert_eq!(
        scrape::extract_csrf_token(&html, "edit").unwrap(),
        "Zq8kH2mPfn0rXcVb"
    );
}

#[test]
fn test_home_page_has_no_csrf_token() {
    let html = fixture("home_page.html");
    assert!(scrape::extract_csrf_token(&html, "home").is_err());
}
