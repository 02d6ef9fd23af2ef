//! Global Auth Store: coarse, eagerly available login snapshot.
//!
//! SYSTEM CONTEXT
//! ==============
//! Chrome UI (headers, nav) reads this before any route guard has resolved.
//! It is optimistic: `check_login` trusts persisted keys without asking the
//! server, and the session machine may later contradict it.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use std::sync::Arc;

use tokio::sync::watch;

use crate::error::StoreError;
use crate::net::types::{Credential, Identity, Role};
use crate::store::credentials::{CredentialStore, PersistedSession};

/// Snapshot published to chrome UI.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthSnapshot {
    pub is_logged_in: bool,
    pub role: Option<Role>,
    pub nickname: Option<String>,
}

impl AuthSnapshot {
    fn logged_in(identity: &Identity) -> Self {
        Self { is_logged_in: true, role: Some(identity.role), nickname: Some(identity.display_name.clone()) }
    }
}

/// Single owned instance shared by handle; clones observe the same state.
#[derive(Clone)]
pub struct AuthStore {
    credentials: CredentialStore,
    tx: Arc<watch::Sender<AuthSnapshot>>,
}

impl AuthStore {
    #[must_use]
    pub fn new(credentials: CredentialStore) -> Self {
        let (tx, _rx) = watch::channel(AuthSnapshot::default());
        Self { credentials, tx: Arc::new(tx) }
    }

    #[must_use]
    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    #[must_use]
    pub fn snapshot(&self) -> AuthSnapshot {
        self.tx.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.tx.subscribe()
    }

    /// Persist a fresh session and mark the user logged in.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential store cannot be written; the
    /// snapshot is left unchanged in that case and the previous credential
    /// is restored.
    pub fn login(&self, credential: &Credential, identity: &Identity) -> Result<(), StoreError> {
        let previous = self.credentials.credential();
        self.credentials.set_credential(credential)?;
        if let Err(e) = self.credentials.set_identity(identity) {
            self.restore_credential(previous.as_ref());
            return Err(e);
        }
        tracing::debug!(role = %identity.role, "auth store: logged in");
        self.tx.send_replace(AuthSnapshot::logged_in(identity));
        Ok(())
    }

    fn restore_credential(&self, previous: Option<&Credential>) {
        let restored = match previous {
            Some(credential) => self.credentials.set_credential(credential),
            None => self.credentials.clear(),
        };
        if let Err(e) = restored {
            tracing::warn!(error = %e, "failed to roll back credential after partial login");
        }
    }

    /// Clear the credential, the identity, and the snapshot.
    ///
    /// The snapshot is cleared even when the medium fails to clear.
    ///
    /// # Errors
    ///
    /// Returns the credential store failure, if any.
    pub fn logout(&self) -> Result<(), StoreError> {
        let cleared = self.credentials.clear();
        self.tx.send_replace(AuthSnapshot::default());
        tracing::debug!("auth store: logged out");
        cleared
    }

    /// Rehydrate the snapshot from persisted keys. No network call.
    pub fn check_login(&self) -> AuthSnapshot {
        let snapshot = match self.credentials.load() {
            PersistedSession::Complete { identity, .. } => AuthSnapshot::logged_in(&identity),
            PersistedSession::Empty => AuthSnapshot::default(),
            PersistedSession::Corrupt => {
                tracing::warn!("persisted session is incomplete; treating as logged out");
                AuthSnapshot::default()
            }
        };
        self.tx.send_replace(snapshot.clone());
        snapshot
    }
}
