use std::sync::Arc;

use tracing::{info, warn};

use super::principal::Credentials;
use super::provider::{CredentialValidator, Verdict};
use super::session::{token_hint, Session, SessionStore};
use crate::error::{AppError, AppResult};

/// Issues sessions for accepted credentials and terminates them on logout.
/// The only component allowed to create or delete sessions.
pub struct Authenticator {
    validator: Arc<dyn CredentialValidator>,
    sessions: Arc<dyn SessionStore>,
}

impl Authenticator {
    pub fn new(validator: Arc<dyn CredentialValidator>, sessions: Arc<dyn SessionStore>) -> Self {
        Self { validator, sessions }
    }

    pub fn login(&self, creds: &Credentials) -> AppResult<Session> {
        let Verdict::Accepted(role) = self.validator.validate(creds) else {
            warn!(target: "clinic::auth", user = %creds.username, "login rejected");
            return Err(AppError::unauthenticated("invalid_credentials", "Invalid credentials"));
        };
        let session = self.sessions.create(&creds.username, role).map_err(|e| {
            warn!(target: "clinic::auth", user = %creds.username, "session create failed: {e}");
            e.with_message("Failed to save session")
        })?;
        info!(target: "clinic::auth", user = %session.username, role = %session.role, sid = token_hint(&session.token), "login");
        Ok(session)
    }

    /// Idempotent: no token, or a token that is no longer live, still succeeds.
    pub fn logout(&self, token: Option<&str>) -> AppResult<bool> {
        let Some(token) = token else { return Ok(false) };
        let removed = self.sessions.delete(token).map_err(|e| {
            warn!(target: "clinic::auth", sid = token_hint(token), "session delete failed: {e}");
            e.with_message("Failed to logout")
        })?;
        info!(target: "clinic::auth", sid = token_hint(token), removed, "logout");
        Ok(removed)
    }
}
