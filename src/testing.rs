//! Test doubles for storage and session signaling
//!
//! Deterministic in-process implementations of the crate's injection seams,
//! used by unit tests here and available to host test suites.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::credentials::TokenStorage;
use crate::session::SessionSink;

/// Session sink that counts terminations instead of redirecting
#[derive(Debug, Default)]
pub struct RecordingSessionSink {
    terminations: AtomicUsize,
}

impl RecordingSessionSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times the session was terminated
    #[must_use]
    pub fn terminations(&self) -> usize {
        self.terminations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionSink for RecordingSessionSink {
    async fn on_session_terminated(&self) {
        self.terminations.fetch_add(1, Ordering::SeqCst);
    }
}

/// Storage medium that fails every operation
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingTokenStorage;

#[async_trait]
impl TokenStorage for FailingTokenStorage {
    async fn load(&self) -> Result<Option<String>, String> {
        Err("storage offline".to_string())
    }

    async fn save(&self, _token: &str) -> Result<(), String> {
        Err("storage offline".to_string())
    }

    async fn delete(&self) -> Result<(), String> {
        Err("storage offline".to_string())
    }
}
