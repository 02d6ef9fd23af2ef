//! Route Guard for role-restricted views.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every protected navigation re-enters `PendingCheck` and revalidates the
//! session before anything renders. Unauthenticated users go to the login
//! surface; authenticated users with the wrong role go to their own realm.
//! There is no "access denied" state.
//!
//! Each check is keyed by a navigation ticket. A resolution that arrives for a
//! navigation the user already left is dropped without redirecting or
//! rendering.

#[cfg(test)]
#[path = "guard_test.rs"]
mod guard_test;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::net::types::{LOGIN_PATH, Role};
use crate::shell::AppShell;
use crate::state::session::{SessionMachine, SessionSnapshot, SessionStatus};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardState {
    /// Validation outstanding; render nothing.
    PendingCheck,
    Allowed,
    Redirecting { to: String },
}

/// Result of one guarded navigation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardOutcome {
    /// The session had not resolved yet.
    Pending,
    Allowed,
    Redirected(String),
    /// A newer navigation started before this one resolved.
    Superseded,
}

/// Identifies one navigation's check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NavigationTicket(u64);

/// Where `snapshot` sends a visitor of a route that requires `required`.
#[must_use]
pub fn evaluate(required: Role, snapshot: &SessionSnapshot) -> GuardState {
    match (snapshot.status, &snapshot.session) {
        (SessionStatus::Loading, _) => GuardState::PendingCheck,
        (SessionStatus::Authenticated, Some(identity)) if identity.role == required => GuardState::Allowed,
        (SessionStatus::Authenticated, Some(identity)) => {
            GuardState::Redirecting { to: identity.role.home_path().to_owned() }
        }
        (SessionStatus::Authenticated, None) | (SessionStatus::Unauthenticated, _) => {
            GuardState::Redirecting { to: LOGIN_PATH.to_owned() }
        }
    }
}

struct GuardInner {
    generation: u64,
    target: Option<String>,
    state: GuardState,
}

fn lock(mutex: &Mutex<GuardInner>) -> MutexGuard<'_, GuardInner> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Clone)]
pub struct RouteGuard {
    required_role: Role,
    session: SessionMachine,
    shell: Arc<dyn AppShell>,
    inner: Arc<Mutex<GuardInner>>,
}

impl RouteGuard {
    #[must_use]
    pub fn new(required_role: Role, session: SessionMachine, shell: Arc<dyn AppShell>) -> Self {
        Self {
            required_role,
            session,
            shell,
            inner: Arc::new(Mutex::new(GuardInner {
                generation: 0,
                target: None,
                state: GuardState::PendingCheck,
            })),
        }
    }

    #[must_use]
    pub fn required_role(&self) -> Role {
        self.required_role
    }

    #[must_use]
    pub fn state(&self) -> GuardState {
        lock(&self.inner).state.clone()
    }

    /// The navigation target of the newest check.
    #[must_use]
    pub fn target(&self) -> Option<String> {
        lock(&self.inner).target.clone()
    }

    /// Navigate to `target`: revalidate the session, then allow or redirect.
    pub async fn navigate(&self, target: &str) -> GuardOutcome {
        let ticket = self.begin(target);
        let snapshot = self.session.refresh_session().await;
        self.resolve(ticket, &snapshot)
    }

    /// Enter `PendingCheck` for a new navigation, superseding any older one.
    pub fn begin(&self, target: &str) -> NavigationTicket {
        let mut inner = lock(&self.inner);
        inner.generation += 1;
        inner.target = Some(target.to_owned());
        inner.state = GuardState::PendingCheck;
        NavigationTicket(inner.generation)
    }

    /// Apply a session outcome to the navigation identified by `ticket`.
    pub fn resolve(&self, ticket: NavigationTicket, snapshot: &SessionSnapshot) -> GuardOutcome {
        let next = evaluate(self.required_role, snapshot);
        {
            let mut inner = lock(&self.inner);
            if inner.generation != ticket.0 {
                tracing::debug!(ticket = ticket.0, current = inner.generation, "stale guard resolution dropped");
                return GuardOutcome::Superseded;
            }
            inner.state = next.clone();
        }

        match next {
            GuardState::PendingCheck => GuardOutcome::Pending,
            GuardState::Allowed => GuardOutcome::Allowed,
            GuardState::Redirecting { to } => {
                tracing::debug!(required = %self.required_role, to = %to, "guard redirecting");
                self.shell.redirect(&to);
                GuardOutcome::Redirected(to)
            }
        }
    }

    /// Render `children` only when the newest check allowed access.
    pub fn render<T>(&self, children: impl FnOnce() -> T) -> Option<T> {
        let allowed = lock(&self.inner).state == GuardState::Allowed;
        allowed.then(children)
    }
}
