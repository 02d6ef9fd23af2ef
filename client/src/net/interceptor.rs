//! Response decision function for the request pipeline.
//!
//! DESIGN
//! ======
//! Every response is classified by [`decide`] before the pipeline acts on it.
//! The function is pure so the branching can be tested without a transport.

#[cfg(test)]
#[path = "interceptor_test.rs"]
mod interceptor_test;

use crate::error::is_auth_status;

pub const LOGIN_PATH_PREFIX: &str = "/auth/login";
pub const REFRESH_PATH: &str = "/auth/refresh";
pub const LOGOUT_PATH: &str = "/auth/logout";
pub const ME_PATH: &str = "/auth/me";

/// What the pipeline should do with a response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// Hand the response to the caller untouched.
    PassThrough,
    /// Replay with the current credential, after any in-flight refresh settles.
    Retry,
    /// Start (or join) a refresh, then replay.
    RefreshThenRetry,
    /// Authentication failure with no recovery left; hand it to the caller as-is.
    Fail,
}

/// Facts about one response needed to classify it.
#[derive(Clone, Copy, Debug)]
pub struct ResponseContext<'a> {
    pub path: &'a str,
    pub status: u16,
    pub already_retried: bool,
    /// The stored access token differs from the one this request was sent with.
    pub credential_changed: bool,
    pub refresh_in_flight: bool,
    /// The store still holds an access or refresh token to recover with.
    pub has_session: bool,
}

#[must_use]
pub fn decide(ctx: &ResponseContext<'_>) -> Action {
    if !is_auth_status(ctx.status) || is_login_path(ctx.path) {
        return Action::PassThrough;
    }
    if is_session_endpoint(ctx.path) || ctx.already_retried || !ctx.has_session {
        return Action::Fail;
    }
    if ctx.credential_changed || ctx.refresh_in_flight {
        return Action::Retry;
    }
    Action::RefreshThenRetry
}

/// `POST /auth/login/<method>` and bare `/auth/login`.
#[must_use]
pub fn is_login_path(path: &str) -> bool {
    let path = strip_query(path);
    path == LOGIN_PATH_PREFIX
        || path
            .strip_prefix(LOGIN_PATH_PREFIX)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Refresh and logout handle their own failures and never recurse into refresh.
fn is_session_endpoint(path: &str) -> bool {
    matches!(strip_query(path), REFRESH_PATH | LOGOUT_PATH)
}

fn strip_query(path: &str) -> &str {
    path.split_once('?').map_or(path, |(head, _)| head)
}

#[must_use]
pub fn login_path(method: &str) -> String {
    format!("{LOGIN_PATH_PREFIX}/{}", method.trim_matches('/'))
}
