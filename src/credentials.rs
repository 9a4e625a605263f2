//! Credential storage with normalization
//!
//! Owns the current bearer credential for one client session. The
//! persistence medium is host-supplied via the [`TokenStorage`] trait so the
//! same store works over browser-style key-value storage, a keychain, or
//! plain memory; an in-memory implementation ships with the crate.
//!
//! Tokens are normalized on every write and on load: one pair of surrounding
//! double quotes is stripped (some persistence layers JSON-encode strings)
//! and whitespace trimmed. An absent token simply means "unauthenticated".

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Error type for credential store operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    /// The supplied token was empty or whitespace-only; the store is unchanged
    #[error("credential must not be empty")]
    Empty,

    /// The underlying persistence medium failed
    #[error("credential storage error: {0}")]
    Storage(String),
}

/// Persistence medium for the single credential value
///
/// Implementations are expected to survive process reloads when the host
/// medium does, but durability is never assumed: a missing value is reported
/// as `Ok(None)`, not as an error.
#[async_trait]
pub trait TokenStorage: Send + Sync {
    /// Load the persisted token, if any
    async fn load(&self) -> Result<Option<String>, String>;

    /// Persist the token, replacing any previous value
    async fn save(&self, token: &str) -> Result<(), String>;

    /// Remove the persisted token; removing an absent token is not an error
    async fn delete(&self) -> Result<(), String>;
}

/// Process-lifetime storage with no durability
#[derive(Debug, Default)]
pub struct MemoryTokenStorage {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStorage for MemoryTokenStorage {
    async fn load(&self) -> Result<Option<String>, String> {
        Ok(self.token.read().await.clone())
    }

    async fn save(&self, token: &str) -> Result<(), String> {
        *self.token.write().await = Some(token.to_string());
        Ok(())
    }

    async fn delete(&self) -> Result<(), String> {
        *self.token.write().await = None;
        Ok(())
    }
}

/// Thread-safe owner of the current bearer credential
///
/// Reads and writes are atomic relative to the pipeline's read-then-attach
/// step. Constructed once per client session; state is never global.
pub struct CredentialStore {
    storage: Arc<dyn TokenStorage>,
    current: RwLock<Option<String>>,
}

impl CredentialStore {
    /// Create a store over the given persistence medium
    #[must_use]
    pub fn new(storage: Arc<dyn TokenStorage>) -> Self {
        Self { storage, current: RwLock::new(None) }
    }

    /// Create a store backed by process memory only
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryTokenStorage::new()))
    }

    /// Load any persisted credential into memory
    ///
    /// Should be called once at startup. Returns `true` when a credential was
    /// found. The persisted value is normalized on the way in, so a token
    /// written with stray quoting by an earlier process is still usable.
    ///
    /// # Errors
    /// Returns an error only if the persistence medium fails; an absent
    /// credential is not an error.
    pub async fn initialize(&self) -> Result<bool, CredentialError> {
        let loaded = self.storage.load().await.map_err(CredentialError::Storage)?;
        let normalized = loaded.as_deref().and_then(normalize);

        let found = normalized.is_some();
        *self.current.write().await = normalized;

        if found {
            info!("credential store initialized with persisted token");
        } else {
            debug!("no persisted credential found");
        }
        Ok(found)
    }

    /// Get the current credential, or `None` when unauthenticated
    pub async fn get(&self) -> Option<String> {
        self.current.read().await.clone()
    }

    /// Check whether a credential is present
    pub async fn is_authenticated(&self) -> bool {
        self.current.read().await.is_some()
    }

    /// Store a new credential, normalizing it first
    ///
    /// # Errors
    /// Returns [`CredentialError::Empty`] (leaving the store untouched) if
    /// the token is empty after normalization, or
    /// [`CredentialError::Storage`] if persistence fails.
    pub async fn set(&self, token: &str) -> Result<(), CredentialError> {
        let normalized = normalize(token).ok_or(CredentialError::Empty)?;

        self.storage.save(&normalized).await.map_err(CredentialError::Storage)?;
        *self.current.write().await = Some(normalized);

        debug!("credential stored");
        Ok(())
    }

    /// Destroy the credential (logout or terminal refresh failure)
    ///
    /// # Errors
    /// Returns [`CredentialError::Storage`] if the persistence medium fails;
    /// the in-memory value is cleared regardless.
    pub async fn clear(&self) -> Result<(), CredentialError> {
        *self.current.write().await = None;
        let result = self.storage.delete().await.map_err(CredentialError::Storage);

        info!("credential cleared");
        result
    }
}

/// Strip one pair of surrounding double quotes and trim whitespace.
/// Returns `None` when nothing usable remains.
fn normalize(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .map_or(trimmed, str::trim);

    if unquoted.is_empty() {
        None
    } else {
        Some(unquoted.to_string())
    }
}
