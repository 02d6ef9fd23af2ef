//! Navigation helpers built on the session state.

pub mod guard;
