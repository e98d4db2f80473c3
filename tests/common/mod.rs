// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared test helpers: an in-process stand-in for both Strava and Taji100,
//! and a console that answers prompts from a script.

#![allow(dead_code)]

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{AppendHeaders, Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::{Arc, Mutex};
use taju_uploader::config::Config;
use taju_uploader::console::Console;

pub const PARTICIPANT: &str = "jane-doe";
pub const LOGIN_CSRF: &str = "login-csrf-token";
pub const SESSION_ID: &str = "session-abc";
pub const NEW_LOG_CSRF: &str = "new-log-csrf-token";
pub const USERNAME: &str = "jane@example.com";
pub const PASSWORD: &str = "hunter2";

/// A logged Taji100 entry, as shown on its edit page.
#[derive(Debug, Clone)]
pub struct FakeEntry {
    pub id: String,
    pub date: String,
    pub time: String,
}

/// Mutable state behind the fake sites.
#[derive(Default)]
pub struct FakeSites {
    /// Body of `GET /api/v3/athlete/activities`
    pub activities: Mutex<Value>,
    /// Status returned by the activities endpoint (200 when unset)
    pub activities_status: Mutex<Option<StatusCode>>,
    /// Query strings of activity list requests
    pub activity_queries: Mutex<Vec<HashMap<String, String>>>,
    /// `Authorization` headers of activity list requests
    pub activity_auth: Mutex<Vec<String>>,
    /// Forms posted to `/oauth/token`
    pub token_requests: Mutex<Vec<HashMap<String, String>>>,

    /// Entries listed on the participant page
    pub entries: Mutex<Vec<FakeEntry>>,
    /// Entry ids whose edit page lacks the date field
    pub broken_entries: Mutex<Vec<String>>,
    /// When set, authenticated pages bounce to the login form
    pub session_expired: Mutex<bool>,
    /// Forms posted to `/log/new`
    pub posted_runs: Mutex<Vec<HashMap<String, String>>>,
    /// Forms posted to `/account/login/`
    pub login_posts: Mutex<Vec<HashMap<String, String>>>,
}

impl FakeSites {
    pub fn set_activities(&self, activities: Value) {
        *self.activities.lock().unwrap() = activities;
    }

    pub fn add_entry(&self, id: &str, date: &str, time: &str) {
        self.entries.lock().unwrap().push(FakeEntry {
            id: id.to_string(),
            date: date.to_string(),
            time: time.to_string(),
        });
    }

    pub fn posted_runs(&self) -> Vec<HashMap<String, String>> {
        self.posted_runs.lock().unwrap().clone()
    }
}

/// Start the fake sites on an ephemeral port. Returns the base URL.
pub async fn spawn_fake_sites() -> (String, Arc<FakeSites>) {
    let sites = Arc::new(FakeSites::default());
    sites.set_activities(json!([]));

    let app = Router::new()
        // Strava
        .route("/oauth/token", post(token_endpoint))
        .route("/api/v3/athlete/activities", get(list_activities))
        // Taji100
        .route("/account/login/", get(login_page).post(login_submit))
        .route("/", get(home_page))
        .route("/participants/{id}/", get(participant_page))
        .route("/log/{id}/edit", get(edit_page))
        .route("/log/new", get(new_log_page).post(new_log_submit))
        .with_state(sites.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake sites");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), sites)
}

/// Config pointing both sessions at the fake sites.
pub fn fake_config(base_url: &str) -> Config {
    Config::test_default(base_url, base_url)
}

/// Activity in the shape Strava's list endpoint returns.
pub fn activity(id: u64, kind: &str, start_date: &str, elapsed: u64, meters: f64) -> Value {
    json!({
        "id": id,
        "name": format!("{} {}", kind, id),
        "type": kind,
        "sport_type": kind,
        "start_date": start_date,
        "start_date_local": start_date,
        "elapsed_time": elapsed,
        "moving_time": elapsed,
        "distance": meters,
    })
}

fn has_session(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.contains(&format!("sessionid={}", SESSION_ID)))
}

fn login_redirect(sites: &FakeSites, headers: &HeaderMap) -> Option<Response> {
    if *sites.session_expired.lock().unwrap() || !has_session(headers) {
        return Some(Redirect::to("/account/login/?next=/").into_response());
    }
    None
}

async fn token_endpoint(
    State(sites): State<Arc<FakeSites>>,
    Form(form): Form<HashMap<String, String>>,
) -> Json<Value> {
    sites.token_requests.lock().unwrap().push(form);
    let expires_at = chrono::Utc::now().timestamp() + 6 * 60 * 60;
    Json(json!({
        "token_type": "Bearer",
        "access_token": "fresh-access",
        "expires_at": expires_at,
        "expires_in": 21600,
        "refresh_token": "fresh-refresh",
    }))
}

async fn list_activities(
    State(sites): State<Arc<FakeSites>>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    sites.activity_queries.lock().unwrap().push(query);
    if let Some(auth) = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        sites.activity_auth.lock().unwrap().push(auth.to_string());
    }

    if let Some(status) = *sites.activities_status.lock().unwrap() {
        return (status, "{\"message\":\"error\"}").into_response();
    }
    Json(sites.activities.lock().unwrap().clone()).into_response()
}

async fn login_page() -> impl IntoResponse {
    (
        AppendHeaders([(
            header::SET_COOKIE,
            format!("csrftoken={}; Path=/", LOGIN_CSRF),
        )]),
        Html(format!(
            r#"<form method="post"><input type="hidden" name="csrfmiddlewaretoken" value="{}"><input name="email"><input name="password" type="password"></form>"#,
            LOGIN_CSRF
        )),
    )
}

async fn login_submit(
    State(sites): State<Arc<FakeSites>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let accepted = form.get("email").map(String::as_str) == Some(USERNAME)
        && form.get("password").map(String::as_str) == Some(PASSWORD)
        && form.get("csrfmiddlewaretoken").map(String::as_str) == Some(LOGIN_CSRF);
    sites.login_posts.lock().unwrap().push(form);

    if !accepted {
        return Html("<p>Please enter a correct email and password.</p>").into_response();
    }
    (
        AppendHeaders([(
            header::SET_COOKIE,
            format!("sessionid={}; Path=/; HttpOnly", SESSION_ID),
        )]),
        Redirect::to("/"),
    )
        .into_response()
}

async fn home_page(State(sites): State<Arc<FakeSites>>, headers: HeaderMap) -> Response {
    if let Some(redirect) = login_redirect(&sites, &headers) {
        return redirect;
    }
    Html(format!(
        r#"<nav><a class="nav-link w-nav-link" href="/participants/{}/">My Page</a></nav>"#,
        PARTICIPANT
    ))
    .into_response()
}

async fn participant_page(
    State(sites): State<Arc<FakeSites>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Some(redirect) = login_redirect(&sites, &headers) {
        return redirect;
    }
    if id != PARTICIPANT {
        return StatusCode::NOT_FOUND.into_response();
    }

    let links: String = sites
        .entries
        .lock()
        .unwrap()
        .iter()
        .map(|e| format!(r#"<li><a href="/log/{}/edit"><i class="fa fa-pencil"></i></a></li>"#, e.id))
        .collect();
    Html(format!("<ul>{}</ul>", links)).into_response()
}

async fn edit_page(
    State(sites): State<Arc<FakeSites>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Some(redirect) = login_redirect(&sites, &headers) {
        return redirect;
    }
    let Some(entry) = sites
        .entries
        .lock()
        .unwrap()
        .iter()
        .find(|e| e.id == id)
        .cloned()
    else {
        return StatusCode::NOT_FOUND.into_response();
    };

    if sites.broken_entries.lock().unwrap().contains(&id) {
        return Html(format!(r#"<input type="text" name="time" value="{}">"#, entry.time))
            .into_response();
    }
    Html(format!(
        r#"<input type="radio" name="date" value="{}" checked><input type="text" name="time" value="{}">"#,
        entry.date, entry.time
    ))
    .into_response()
}

async fn new_log_page(State(sites): State<Arc<FakeSites>>, headers: HeaderMap) -> Response {
    if let Some(redirect) = login_redirect(&sites, &headers) {
        return redirect;
    }
    Html(format!(
        r#"<form method="post"><input type='hidden' name='csrfmiddlewaretoken' value='{}' /></form>"#,
        NEW_LOG_CSRF
    ))
    .into_response()
}

async fn new_log_submit(
    State(sites): State<Arc<FakeSites>>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    if let Some(redirect) = login_redirect(&sites, &headers) {
        return redirect;
    }
    // A submitted run shows up on the participant page like any other entry.
    {
        let mut entries = sites.entries.lock().unwrap();
        let id = format!("{}", 1000 + entries.len());
        entries.push(FakeEntry {
            id,
            date: form.get("date").cloned().unwrap_or_default(),
            time: form.get("time").cloned().unwrap_or_default(),
        });
    }
    sites.posted_runs.lock().unwrap().push(form);
    Redirect::to(&format!("/participants/{}/", PARTICIPANT)).into_response()
}

/// Console that answers prompts from a fixed script and records output.
#[derive(Default)]
pub struct ScriptedConsole {
    pub answers: VecDeque<String>,
    pub shown: Vec<String>,
    pub asked: Vec<String>,
    pub clears: usize,
}

impl ScriptedConsole {
    pub fn with_answers(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|a| a.to_string()).collect(),
            ..Self::default()
        }
    }
}

impl Console for ScriptedConsole {
    fn show(&mut self, message: &str) {
        self.shown.push(message.to_string());
    }

    fn ask(&mut self, question: &str) -> io::Result<String> {
        self.asked.push(question.to_string());
        self.answers
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no scripted answer"))
    }

    fn clear(&mut self) {
        self.clears += 1;
    }
}
