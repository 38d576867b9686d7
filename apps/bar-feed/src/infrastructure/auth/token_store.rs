//! Process-Wide Token Store
//!
//! Single logical credential instance for the process lifetime.
//! Every read and write covers the full five-field group under one
//! lock acquisition: a reader can never observe an `access_token`
//! paired with a `refresh_token` from different exchanges.

use parking_lot::RwLock;

use crate::domain::credential::{Credential, TokenRefresh};

/// Shared container for the current OAuth credential.
#[derive(Debug, Default)]
pub struct TokenStore {
    inner: RwLock<Credential>,
}

impl TokenStore {
    /// Create a store seeded with an initial credential.
    #[must_use]
    pub const fn new(credential: Credential) -> Self {
        Self {
            inner: RwLock::new(credential),
        }
    }

    /// Take a consistent snapshot of all five fields.
    #[must_use]
    pub fn snapshot(&self) -> Credential {
        self.inner.read().clone()
    }

    /// Replace all five fields as one critical section.
    pub fn update_all(&self, credential: Credential) {
        *self.inner.write() = credential;
    }

    /// Merge the two volatile fields from a refresh exchange,
    /// preserving `refresh_token`, `token_type` and `userid`.
    pub fn apply_refresh(&self, refresh: &TokenRefresh) {
        let mut guard = self.inner.write();
        guard.access_token = refresh.access_token.clone();
        guard.expires_in = refresh.expires_in.clone();
    }
}
