use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use super::principal::Role;
use super::session::Session;
use crate::error::AppError;

/// Identity attached to a request by the role gate. Handlers behind a gate
/// extract it; the session token itself is deliberately not carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub username: String,
    pub role: Role,
}

impl From<&Session> for RequestContext {
    fn from(s: &Session) -> Self {
        Self { username: s.username.clone(), role: s.role }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for RequestContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Only reachable without the extension if a route was mounted outside a gate.
        parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .ok_or_else(|| AppError::unauthenticated("no_session", "Unauthorized: no active session"))
    }
}
