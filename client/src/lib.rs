//! # mentorlink-client
//!
//! Authenticated HTTP client and session state for the mentoring platform.
//!
//! Every API call goes through [`net::api::ApiClient`], which attaches the
//! stored bearer token, runs at most one coordinated credential refresh when
//! the backend rejects it, and replays each rejected request once. The
//! session machine and route guards sit on top of the same client so a
//! protected view renders only after the backend confirms who the user is.

pub mod config;
pub mod error;
pub mod net;
pub mod shell;
pub mod state;
pub mod store;
pub mod util;

#[cfg(test)]
mod test_helpers;
