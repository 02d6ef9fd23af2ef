//! Credential Store: access/refresh tokens and the minimal identity summary.
//!
//! Each field lives under its own persisted key so a partially written or
//! partially cleared session is detectable instead of silently trusted.

#[cfg(test)]
#[path = "credentials_test.rs"]
mod credentials_test;

use std::sync::Arc;

use super::persist::KeyValueStore;
use crate::error::StoreError;
use crate::net::types::{Credential, Identity, Role};

pub const ACCESS_TOKEN_KEY: &str = "accessToken";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
pub const NICKNAME_KEY: &str = "nickname";
pub const ROLE_KEY: &str = "role";

/// What the persisted keys currently describe.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PersistedSession {
    /// No session keys at all.
    Empty,
    /// Token and identity are all present and parse.
    Complete { credential: Credential, identity: Identity },
    /// Some keys are present but the set is inconsistent (for example a role
    /// without a token, or an unknown role).
    Corrupt,
}

#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        non_empty(self.store.get(ACCESS_TOKEN_KEY))
    }

    #[must_use]
    pub fn refresh_token(&self) -> Option<String> {
        non_empty(self.store.get(REFRESH_TOKEN_KEY))
    }

    #[must_use]
    pub fn credential(&self) -> Option<Credential> {
        let access_token = self.access_token()?;
        Some(Credential { access_token, refresh_token: self.refresh_token() })
    }

    /// Replace the current credential. Last write wins.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing medium cannot be written.
    pub fn set_credential(&self, credential: &Credential) -> Result<(), StoreError> {
        self.store.set(ACCESS_TOKEN_KEY, &credential.access_token)?;
        match &credential.refresh_token {
            Some(token) => self.store.set(REFRESH_TOKEN_KEY, token),
            None => self.store.remove(REFRESH_TOKEN_KEY),
        }
    }

    /// Persisted identity summary. The email is never persisted.
    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        let display_name = non_empty(self.store.get(NICKNAME_KEY))?;
        let role = self.store.get(ROLE_KEY).as_deref().and_then(Role::parse)?;
        Some(Identity { display_name, role, email: None })
    }

    /// # Errors
    ///
    /// Returns an error if the backing medium cannot be written.
    pub fn set_identity(&self, identity: &Identity) -> Result<(), StoreError> {
        self.store.set(NICKNAME_KEY, &identity.display_name)?;
        self.store.set(ROLE_KEY, identity.role.as_str())
    }

    /// Remove every session key.
    ///
    /// # Errors
    ///
    /// Returns the first write failure; remaining keys are still attempted.
    pub fn clear(&self) -> Result<(), StoreError> {
        let mut first_error = None;
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, NICKNAME_KEY, ROLE_KEY] {
            if let Err(e) = self.store.remove(key) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Classify the persisted keys without touching the network.
    #[must_use]
    pub fn load(&self) -> PersistedSession {
        let any_present = [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, NICKNAME_KEY, ROLE_KEY]
            .iter()
            .any(|key| self.store.get(key).is_some());
        if !any_present {
            return PersistedSession::Empty;
        }
        match (self.credential(), self.identity()) {
            (Some(credential), Some(identity)) => PersistedSession::Complete { credential, identity },
            _ => PersistedSession::Corrupt,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
