//! Persisted client state.
//!
//! `persist` is the raw key-value layer; `credentials` gives the token and
//! identity keys their meaning.

pub mod credentials;
pub mod persist;
