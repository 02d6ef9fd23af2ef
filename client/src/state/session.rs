//! Session State Machine: server-confirmed identity for the current session.
//!
//! SYSTEM CONTEXT
//! ==============
//! The machine never triggers itself; route guards call
//! [`SessionMachine::refresh_session`] when a navigation needs confirmation.
//! Each call re-enters `Loading` and resolves to `Authenticated` or
//! `Unauthenticated`. Only the newest call publishes its result, so a slow
//! check cannot overwrite a newer one.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;

use crate::net::api::ApiClient;
use crate::net::types::{Identity, MePayload};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    Loading,
    Authenticated,
    Unauthenticated,
}

/// Read-only view exposed to consumers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub session: Option<Identity>,
}

impl SessionSnapshot {
    fn loading() -> Self {
        Self { status: SessionStatus::Loading, session: None }
    }

    fn unauthenticated() -> Self {
        Self { status: SessionStatus::Unauthenticated, session: None }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated && self.session.is_some()
    }
}

#[derive(Clone)]
pub struct SessionMachine {
    api: ApiClient,
    tx: Arc<watch::Sender<SessionSnapshot>>,
    generation: Arc<AtomicU64>,
}

impl SessionMachine {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        let (tx, _rx) = watch::channel(SessionSnapshot::loading());
        Self { api, tx: Arc::new(tx), generation: Arc::new(AtomicU64::new(0)) }
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.tx.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.tx.subscribe()
    }

    /// Confirm the session with `GET /auth/me` and return the outcome.
    ///
    /// Any failure, including a timeout or a failed refresh, resolves to
    /// `Unauthenticated`.
    pub async fn refresh_session(&self) -> SessionSnapshot {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.tx.send_modify(|snapshot| snapshot.status = SessionStatus::Loading);

        let resolved = match self.api.who_am_i().await {
            Ok(MePayload::Identity(identity)) => {
                if let Err(e) = self.api.credentials().set_identity(&identity) {
                    tracing::warn!(error = %e, "failed to persist confirmed identity");
                }
                SessionSnapshot { status: SessionStatus::Authenticated, session: Some(identity) }
            }
            Ok(MePayload::NoSession) => {
                tracing::debug!("session check: no session");
                SessionSnapshot::unauthenticated()
            }
            Ok(MePayload::Invalid) => {
                tracing::warn!("session check: unrecognized identity payload");
                SessionSnapshot::unauthenticated()
            }
            Err(e) => {
                tracing::debug!(error = %e, "session check failed");
                SessionSnapshot::unauthenticated()
            }
        };

        if self.generation.load(Ordering::SeqCst) == generation {
            self.tx.send_replace(resolved.clone());
        } else {
            tracing::debug!(generation, "session check superseded; not publishing");
        }
        resolved
    }
}
