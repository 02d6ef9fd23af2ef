//! Networking modules for the authenticated HTTP client.
//!
//! SYSTEM CONTEXT
//! ==============
//! `api` owns the request/refresh/replay pipeline, `interceptor` decides what
//! to do with a failed response, `transport` abstracts the wire, and `types`
//! defines the shared request/response schema.

pub mod api;
pub mod interceptor;
pub mod transport;
pub mod types;
