use subtle::{ConditionallySelectable, ConstantTimeEq};

use super::principal::{Credentials, Principal, Role};

/// Outcome of a credential check. Rejection carries no reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted(Role),
    Rejected,
}

pub trait CredentialValidator: Send + Sync {
    fn validate(&self, creds: &Credentials) -> Verdict;
}

/// Fixed principal registry (development use only: passwords are plaintext).
///
/// Every entry is compared on all three fields, each in constant time, and the
/// scan never stops early. Which field mismatched is not observable.
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    entries: Vec<Principal>,
}

impl StaticCredentials {
    pub fn new(entries: Vec<Principal>) -> Self { Self { entries } }

    /// The two built-in accounts: `receptionist1` and `doctor1`.
    pub fn development() -> Self {
        Self::new(vec![
            Principal::new("receptionist1", "reception123", Role::Receptionist),
            Principal::new("doctor1", "doctor123", Role::Doctor),
        ])
    }

    pub fn entries(&self) -> &[Principal] { &self.entries }
}

impl Default for StaticCredentials {
    fn default() -> Self { Self::development() }
}

impl CredentialValidator for StaticCredentials {
    fn validate(&self, creds: &Credentials) -> Verdict {
        let mut found = subtle::Choice::from(0u8);
        let mut idx: u32 = 0;
        for (i, p) in self.entries.iter().enumerate() {
            let hit = creds.username.as_bytes().ct_eq(p.username.as_bytes())
                & creds.password.as_bytes().ct_eq(p.password.as_bytes())
                & creds.role.as_bytes().ct_eq(p.role.as_str().as_bytes());
            idx = u32::conditional_select(&idx, &(i as u32), hit);
            found |= hit;
        }
        if bool::from(found) {
            Verdict::Accepted(self.entries[idx as usize].role)
        } else {
            Verdict::Rejected
        }
    }
}
