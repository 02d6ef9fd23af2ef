//! Observable application state.
//!
//! SYSTEM CONTEXT
//! ==============
//! `auth` mirrors the persisted login for display; `session` holds the
//! server-confirmed identity that route guards trust.

pub mod auth;
pub mod session;
