//! Application shell hooks the core calls into.
//!
//! The shell owns navigation. A full reload discards every in-memory cache,
//! subscription, and pending request tied to the old session.

pub trait AppShell: Send + Sync {
    /// Tear down and restart the application from its entry point.
    fn reload(&self);

    /// Replace the current location with `to` without rendering the old view.
    fn redirect(&self, to: &str);
}
