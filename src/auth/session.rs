//! In-memory session store.
//!
//! Sessions are opaque random tokens mapped to the identity facts the rest
//! of the system needs (account id, name, email, role). Nothing is persisted:
//! a restart logs everyone out.

use dashmap::DashMap;
use rand::Rng;
use serde::Serialize;

/// Identity facts attached to a live session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionClaims {
    pub account_id: i64,
    pub name: String,
    pub email: String,
    pub role: i32,
}

#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<String, SessionClaims>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session for the given claims and return its token.
    pub fn issue(&self, claims: SessionClaims) -> String {
        let bytes: [u8; 32] = rand::rng().random();
        let token = hex::encode(bytes);
        self.sessions.insert(token.clone(), claims);
        token
    }

    pub fn claims_for(&self, token: &str) -> Option<SessionClaims> {
        self.sessions.get(token).map(|entry| entry.value().clone())
    }

    pub fn revoke(&self, token: &str) {
        self.sessions.remove(token);
    }

    /// Drop every session belonging to an account. Used when an account is
    /// deactivated or deleted, alongside the force-logout push.
    pub fn revoke_account(&self, account_id: i64) {
        self.sessions
            .retain(|_, claims| claims.account_id != account_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(account_id: i64) -> SessionClaims {
        SessionClaims {
            account_id,
            name: "Test".to_string(),
            email: format!("user{}@funews.org", account_id),
            role: 1,
        }
    }

    #[test]
    fn issued_token_resolves_to_claims() {
        let store = SessionStore::new();
        let token = store.issue(claims(7));
        assert_eq!(store.claims_for(&token).unwrap().account_id, 7);
        assert!(store.claims_for("bogus").is_none());
    }

    #[test]
    fn revoke_account_drops_all_of_its_sessions() {
        let store = SessionStore::new();
        let tab1 = store.issue(claims(7));
        let tab2 = store.issue(claims(7));
        let other = store.issue(claims(8));

        store.revoke_account(7);

        assert!(store.claims_for(&tab1).is_none());
        assert!(store.claims_for(&tab2).is_none());
        assert!(store.claims_for(&other).is_some());
    }
}
