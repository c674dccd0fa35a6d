use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::{debug, error};

use super::principal::Role;
use super::request_context::RequestContext;
use super::session::{token_hint, Session, SessionStore};
use crate::error::{AppError, AppResult};
use crate::server::cookies;

/// Per-route-group guard. `required: None` admits any authenticated role.
#[derive(Clone)]
pub struct RoleGate {
    sessions: Arc<dyn SessionStore>,
    required: Option<Role>,
}

impl RoleGate {
    pub fn new(sessions: Arc<dyn SessionStore>, required: Option<Role>) -> Self {
        Self { sessions, required }
    }

    pub fn require(sessions: Arc<dyn SessionStore>, role: Role) -> Self { Self::new(sessions, Some(role)) }
}

/// Resolve a token into an authorized session.
///
/// No token or no live session is `Unauthenticated`; a live session with the
/// wrong role is `Forbidden`. The session is never modified.
pub fn authorize(store: &dyn SessionStore, token: Option<&str>, required: Option<Role>) -> AppResult<Session> {
    let unauthenticated = || AppError::unauthenticated("no_session", "Unauthorized: no active session");
    let Some(token) = token else { return Err(unauthenticated()) };
    let session = store
        .load(token)
        .map_err(|e| {
            error!(target: "clinic::gate", sid = token_hint(token), "session lookup failed: {e}");
            e.with_message("Internal server error")
        })?
        .ok_or_else(unauthenticated)?;
    match required {
        Some(role) if session.role != role => {
            debug!(target: "clinic::gate", user = %session.username, have = %session.role, need = %role, "forbidden");
            Err(AppError::forbidden("insufficient_role", "Forbidden: insufficient permissions"))
        }
        _ => Ok(session),
    }
}

/// axum middleware: mount with `middleware::from_fn_with_state(gate, role_gate)`.
pub async fn role_gate(State(gate): State<RoleGate>, mut request: Request, next: Next) -> Response {
    let token = cookies::session_token(request.headers());
    match authorize(gate.sessions.as_ref(), token.as_deref(), gate.required) {
        Ok(session) => {
            request.extensions_mut().insert(RequestContext::from(&session));
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}
