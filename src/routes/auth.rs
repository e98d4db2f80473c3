// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Local Strava OAuth redirect listener.
//!
//! During first-time authorization the operator's browser is sent back to
//! `http://localhost:9191/?code=...`. This listener serves that one request,
//! hands the code to the waiting session and shuts down.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use ring::rand::{SecureRandom, SystemRandom};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::sync::{oneshot, Mutex};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::error::{AppError, Result};

/// How long to let the server finish writing the final response.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Authorization code returned by Strava.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationGrant {
    pub code: String,
    /// Scopes the operator actually granted
    pub scope: Option<String>,
}

type GrantResult = std::result::Result<AuthorizationGrant, String>;

/// Shared state of the callback handler.
pub struct CallbackState {
    expected_state: String,
    /// Taken by the first valid callback; later callbacks find it empty.
    sender: Mutex<Option<oneshot::Sender<GrantResult>>>,
}

/// Query parameters of the Strava redirect.
#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Router serving the redirect URI.
pub fn routes(state: Arc<CallbackState>) -> Router {
    Router::new()
        .route("/", get(auth_callback))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

impl CallbackState {
    /// Create handler state expecting `expected_state`, and the receiving end
    /// the waiting session listens on.
    pub fn new(expected_state: String) -> (Arc<Self>, oneshot::Receiver<GrantResult>) {
        let (tx, rx) = oneshot::channel();
        let state = Arc::new(Self {
            expected_state,
            sender: Mutex::new(Some(tx)),
        });
        (state, rx)
    }
}

/// OAuth redirect - forward the code (or the denial) to the waiting session.
async fn auth_callback(
    State(state): State<Arc<CallbackState>>,
    Query(params): Query<CallbackParams>,
) -> (StatusCode, &'static str) {
    if params.state.as_deref() != Some(state.expected_state.as_str()) {
        tracing::warn!("Ignoring redirect with unexpected OAuth state");
        return (StatusCode::BAD_REQUEST, "Unexpected authorization state.");
    }

    let outcome = if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from Strava");
        Err(error)
    } else {
        match params.code.filter(|c| !c.is_empty()) {
            Some(code) => Ok(AuthorizationGrant {
                code,
                scope: params.scope,
            }),
            None => return (StatusCode::BAD_REQUEST, "Missing authorization code."),
        }
    };

    let Some(sender) = state.sender.lock().await.take() else {
        return (StatusCode::CONFLICT, "Authorization was already received.");
    };

    let denied = outcome.is_err();
    // The receiver only disappears once the wait timed out.
    let _ = sender.send(outcome);

    if denied {
        (
            StatusCode::OK,
            "Authorization was denied. You can close this window.",
        )
    } else {
        (StatusCode::OK, "Successful authorization!")
    }
}

/// One-shot listener bound to the redirect URI's port.
pub struct RedirectListener {
    listener: TcpListener,
}

impl RedirectListener {
    pub async fn bind<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve redirects until one carries a code with the expected state,
    /// then stop accepting connections.
    pub async fn wait_for_code(
        self,
        expected_state: &str,
        timeout: Duration,
    ) -> Result<AuthorizationGrant> {
        let (state, grant_rx) = CallbackState::new(expected_state.to_string());
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let addr = self.local_addr()?;
        let app = routes(state);
        let listener = self.listener;
        let mut server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });
        tracing::info!(address = %addr, "Waiting for Strava redirect");

        let outcome = tokio::time::timeout(timeout, grant_rx).await;

        let _ = shutdown_tx.send(());
        if tokio::time::timeout(SHUTDOWN_GRACE, &mut server).await.is_err() {
            tracing::debug!("Redirect listener did not drain in time, aborting");
            server.abort();
        }

        match outcome {
            Err(_) => Err(AppError::AuthorizationTimedOut),
            Ok(Err(_)) => Err(AppError::Internal(anyhow::anyhow!(
                "Redirect listener stopped before receiving a code"
            ))),
            Ok(Ok(Err(error))) => Err(AppError::AuthorizationDenied(error)),
            Ok(Ok(Ok(grant))) => Ok(grant),
        }
    }
}

/// Random OAuth `state` value for one authorization attempt.
pub fn generate_oauth_state() -> Result<String> {
    let mut bytes = [0u8; 16];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("System RNG unavailable")))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}
