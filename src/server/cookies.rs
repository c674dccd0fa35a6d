//! Session cookie encoding. The session store knows nothing about cookies; this
//! is the only place the token meets the transport.

use axum::http::header::COOKIE;
use axum::http::{HeaderMap, HeaderValue};
use chrono::Duration;

pub const SESSION_COOKIE: &str = "clinic_session";

/// Value of the named cookie across all `Cookie` headers, first match wins.
pub fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    for value in headers.get_all(COOKIE) {
        let Ok(s) = value.to_str() else { continue };
        for part in s.split(';') {
            if let Some((k, v)) = part.trim().split_once('=') {
                if k == name { return Some(v.to_string()); }
            }
        }
    }
    None
}

/// Session token from the request, ignoring an empty value (a cleared cookie).
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    parse_cookie(headers, SESSION_COOKIE).filter(|t| !t.is_empty())
}

pub fn set_session_cookie(token: &str, ttl: Duration) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{}={}; Max-Age={}; Path=/; HttpOnly; Secure; SameSite=Lax",
        SESSION_COOKIE,
        token,
        ttl.num_seconds()
    ))
    .ok()
}

pub fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_static("clinic_session=; Max-Age=0; Path=/; HttpOnly; Secure; SameSite=Lax")
}
