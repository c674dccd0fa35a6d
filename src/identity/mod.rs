//! Session-backed identity: credential validation, the session store, login/logout
//! orchestration and the per-route role gate.
//! Keep the public surface thin and split implementation across sub-modules.

mod principal;
mod provider;
mod session;
mod authenticator;
mod request_context;
mod authorizer;

pub use principal::{Credentials, Principal, Role};
pub use provider::{CredentialValidator, StaticCredentials, Verdict};
pub use session::{token_hint, MemorySessionStore, Session, SessionStore, SessionToken, DEFAULT_TTL_SECS};
pub use authenticator::Authenticator;
pub use request_context::RequestContext;
pub use authorizer::{authorize, role_gate, RoleGate};
