use std::collections::HashMap;

use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use tracing::{debug, error};

use super::principal::Role;
use crate::error::{AppError, AppResult};

pub type SessionToken = String;

/// Default session lifetime: one hour.
pub const DEFAULT_TTL_SECS: i64 = 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: SessionToken,
    pub username: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool { self.expires_at <= now }
}

/// Leading characters of a token, enough to correlate log lines without
/// making the token replayable.
pub fn token_hint(token: &str) -> &str {
    token.get(..6).unwrap_or("")
}

/// Backing store for live sessions.
///
/// Implementations must make `create` a single atomic step (no two callers may
/// receive the same token, and a failed create leaves nothing behind) and must
/// treat expired entries as absent on `load`.
pub trait SessionStore: Send + Sync {
    fn create(&self, username: &str, role: Role) -> AppResult<Session>;
    fn load(&self, token: &str) -> AppResult<Option<Session>>;
    /// Idempotent. Returns whether a session was removed.
    fn delete(&self, token: &str) -> AppResult<bool>;
    /// Drop every expired session; returns how many were removed.
    fn sweep_expired(&self) -> usize;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool { self.len() == 0 }
    fn ttl(&self) -> Duration;
}

fn gen_token() -> AppResult<SessionToken> {
    // 256-bit random token, base64url without padding
    let mut buf = [0u8; 32];
    getrandom::getrandom(&mut buf).map_err(|e| {
        error!(target: "clinic::session", "token generation failed: {e}");
        AppError::dependency("session_rng", "Internal server error")
    })?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf))
}

/// In-process session store guarded by a reader/writer lock.
pub struct MemorySessionStore {
    ttl: Duration,
    sessions: RwLock<HashMap<SessionToken, Session>>,
}

impl Default for MemorySessionStore {
    fn default() -> Self { Self::new(Duration::seconds(DEFAULT_TTL_SECS)) }
}

impl MemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, sessions: RwLock::new(HashMap::new()) }
    }

    pub fn create_at(&self, username: &str, role: Role, now: DateTime<Utc>) -> AppResult<Session> {
        let expires_at = now.checked_add_signed(self.ttl).ok_or_else(|| {
            error!(target: "clinic::session", ttl_secs = self.ttl.num_seconds(), "session expiry out of range");
            AppError::dependency("session_ttl", "Internal server error")
        })?;
        let mut map = self.sessions.write();
        // Drawing and inserting under one write lock keeps tokens unique.
        let token = loop {
            let t = gen_token()?;
            if !map.contains_key(&t) { break t; }
        };
        let session = Session {
            token: token.clone(),
            username: username.to_string(),
            role,
            created_at: now,
            expires_at,
        };
        map.insert(token, session.clone());
        debug!(target: "clinic::session", user = %username, role = %role, sid = token_hint(&session.token), ttl_secs = self.ttl.num_seconds(), "session.create");
        Ok(session)
    }

    pub fn load_at(&self, token: &str, now: DateTime<Utc>) -> Option<Session> {
        {
            let map = self.sessions.read();
            match map.get(token) {
                None => return None,
                Some(s) if !s.is_expired_at(now) => return Some(s.clone()),
                Some(_) => {}
            }
        }
        // Expired: evict, re-checking under the write lock in case it was replaced.
        let mut map = self.sessions.write();
        if map.get(token).is_some_and(|s| s.is_expired_at(now)) {
            map.remove(token);
            debug!(target: "clinic::session", sid = token_hint(token), "session.expired");
        }
        None
    }

    pub fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let mut map = self.sessions.write();
        let before = map.len();
        map.retain(|_, s| !s.is_expired_at(now));
        before - map.len()
    }
}

impl SessionStore for MemorySessionStore {
    fn create(&self, username: &str, role: Role) -> AppResult<Session> {
        self.create_at(username, role, Utc::now())
    }

    fn load(&self, token: &str) -> AppResult<Option<Session>> {
        Ok(self.load_at(token, Utc::now()))
    }

    fn delete(&self, token: &str) -> AppResult<bool> {
        let removed = self.sessions.write().remove(token).is_some();
        if removed {
            debug!(target: "clinic::session", sid = token_hint(token), "session.delete");
        }
        Ok(removed)
    }

    fn sweep_expired(&self) -> usize { self.sweep_at(Utc::now()) }

    fn len(&self) -> usize { self.sessions.read().len() }

    fn ttl(&self) -> Duration { self.ttl }
}
