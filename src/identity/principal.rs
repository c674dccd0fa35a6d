use std::fmt;

use serde::{Deserialize, Serialize};

/// Closed set of roles a session can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Receptionist,
    Doctor,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Receptionist, Role::Doctor];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Receptionist => "receptionist",
            Role::Doctor => "doctor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registry entry: who may log in, with which password, as which role.
#[derive(Clone, PartialEq, Eq)]
pub struct Principal {
    pub username: String,
    pub password: String,
    pub role: Role,
}

impl Principal {
    pub fn new(username: impl Into<String>, password: impl Into<String>, role: Role) -> Self {
        Self { username: username.into(), password: password.into(), role }
    }
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Principal")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("role", &self.role)
            .finish()
    }
}

/// Login payload. The role stays a raw string: an unknown role is a credential
/// mismatch (401), not a malformed body (400).
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub role: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>, role: impl Into<String>) -> Self {
        Self { username: username.into(), password: password.into(), role: role.into() }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("role", &self.role)
            .finish()
    }
}
