//!
//! clinic HTTP server
//! ------------------
//! Axum-based HTTP API for the clinic record service.
//!
//! Responsibilities:
//! - Login/logout endpoints issuing and clearing the session cookie.
//! - Role-gated route groups: `/receptionist/*` and `/doctor/*`.
//! - Background sweep of expired sessions.
//! - Graceful shutdown on Ctrl-C.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::from_fn_with_state;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::config::ServerConfig;
use crate::error::{AppError, AppResult};
use crate::identity::{role_gate, Authenticator, CredentialValidator, Credentials, MemorySessionStore, Role, RoleGate, SessionStore, StaticCredentials, token_hint};
use crate::storage::SharedStore;

pub mod cookies;
pub mod patients;

/// Shared server state injected into all handlers.
///
/// Everything is constructed once at startup and handed in; nothing lives in
/// globals, so tests can build as many independent servers as they like.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<dyn SessionStore>,
    pub auth: Arc<Authenticator>,
    pub store: SharedStore,
}

impl AppState {
    pub fn new(sessions: Arc<dyn SessionStore>, validator: Arc<dyn CredentialValidator>, store: SharedStore) -> Self {
        let auth = Arc::new(Authenticator::new(validator, sessions.clone()));
        Self { sessions, auth, store }
    }

    /// In-memory sessions with the given TTL, the development credential
    /// registry and an empty patient store.
    pub fn in_memory(ttl: chrono::Duration) -> Self {
        Self::new(
            Arc::new(MemorySessionStore::new(ttl)),
            Arc::new(StaticCredentials::development()),
            SharedStore::new(),
        )
    }
}

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    let receptionist = Router::new()
        .route("/patients", post(patients::create_patient).get(patients::list_patients))
        .route("/patients/{id}", put(patients::update_patient).delete(patients::delete_patient))
        .layer(from_fn_with_state(
            RoleGate::require(state.sessions.clone(), Role::Receptionist),
            role_gate,
        ));

    let doctor = Router::new()
        .route("/patients", get(patients::list_patients))
        .route("/patients/{id}/notes", put(patients::update_patient_notes))
        .layer(from_fn_with_state(
            RoleGate::require(state.sessions.clone(), Role::Doctor),
            role_gate,
        ));

    Router::new()
        .route("/", get(|| async { "clinic ok" }))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .nest("/receptionist", receptionist)
        .nest("/doctor", doctor)
        .with_state(state)
}

async fn login(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(creds) = payload.map_err(|rej| {
        debug!(target: "clinic::auth", "login body rejected: {rej}");
        AppError::invalid_input("bad_json", "Invalid input")
    })?;
    let session = state.auth.login(&creds)?;
    let cookie = session_cookie_or_rollback(state.sessions.as_ref(), &session.token)?;
    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, cookie);
    Ok((StatusCode::OK, headers, Json(serde_json::json!({ "message": "Login successful" }))))
}

/// Encode the login cookie; if that fails the session never reaches the
/// client, so it is deleted again.
fn session_cookie_or_rollback(sessions: &dyn SessionStore, token: &str) -> AppResult<HeaderValue> {
    cookies::set_session_cookie(token, sessions.ttl()).ok_or_else(|| {
        error!(target: "clinic::auth", sid = token_hint(token), "session cookie could not be encoded");
        if let Err(e) = sessions.delete(token) {
            error!(target: "clinic::auth", sid = token_hint(token), "rollback of unsent session failed: {e}");
        }
        AppError::dependency("cookie", "Failed to save session")
    })
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> AppResult<impl IntoResponse> {
    let token = cookies::session_token(&headers);
    state.auth.logout(token.as_deref())?;
    let mut h = HeaderMap::new();
    h.insert(SET_COOKIE, cookies::clear_session_cookie());
    Ok((StatusCode::OK, h, Json(serde_json::json!({ "message": "Logged out successfully" }))))
}

/// Periodically drop expired sessions so abandoned logins do not accumulate.
pub fn spawn_session_sweeper(sessions: Arc<dyn SessionStore>, every: std::time::Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(every);
        tick.tick().await;
        loop {
            tick.tick().await;
            let removed = sessions.sweep_expired();
            if removed > 0 { debug!(target: "clinic::session", removed, live = sessions.len(), "session_sweep"); }
        }
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

/// Start the clinic HTTP server with the given configuration and run until Ctrl-C.
pub async fn run_with_config(cfg: ServerConfig) -> anyhow::Result<()> {
    let state = AppState::in_memory(cfg.session_ttl);

    let sweeper = match cfg.sweep_interval {
        Some(every) => Some(spawn_session_sweeper(state.sessions.clone(), every)),
        None => {
            info!("session_sweeper" = false, "expired sessions are only evicted lazily");
            None
        }
    };

    let app = router(state);
    let addr = SocketAddr::new(cfg.bind, cfg.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind HTTP listener on {}", addr))?;
    info!("Starting server on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server terminated with an error")?;

    if let Some(h) = sweeper { h.abort(); }
    Ok(())
}
