//! Session lifecycle signaling
//!
//! The library never redirects or renders. When a session becomes terminally
//! invalid it clears the stored credential and calls into the host through
//! [`SessionSink`]; everything after that (notices, redirect delays, routing)
//! is the host's concern. Seeding the credential after a successful login is
//! likewise the host's job, via
//! [`CredentialStore::set`](crate::credentials::CredentialStore::set).

use async_trait::async_trait;
use tracing::warn;

/// Host callback invoked on terminal session failure
#[async_trait]
pub trait SessionSink: Send + Sync {
    /// The session can no longer be recovered automatically
    ///
    /// Called after the credential has been cleared, exactly once per
    /// terminated session. Implementations typically drop cached user state
    /// and route to an unauthenticated entry point.
    async fn on_session_terminated(&self);
}

/// Default sink that only logs
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSessionSink;

#[async_trait]
impl SessionSink for NullSessionSink {
    async fn on_session_terminated(&self) {
        warn!("session terminated; no session sink installed");
    }
}
