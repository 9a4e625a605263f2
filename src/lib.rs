//! Authenticated HTTP client with transparent session refresh
//!
//! This crate keeps a caller's session valid across token expiry without
//! ever letting concurrent requests use two different tokens inconsistently
//! or trigger duplicate refresh operations.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │  ApiClient   │  Request pipeline bound to one base endpoint
//! └──────┬───────┘
//!        │
//!        ├──► CredentialStore     (normalized bearer token + TokenStorage)
//!        ├──► RefreshCoordinator  (single-flight refresh, FIFO waiter queue)
//!        │         │
//!        │         └──► SessionSink  (host callback on terminal failure)
//!        └──► classify             (status/body → closed error taxonomy)
//! ```
//!
//! On a 401 from a non-auth route, the pipeline defers to the coordinator:
//! the first failure performs exactly one refresh call while later failures
//! queue and share the verdict, then every suspended request replays with
//! the new token. If the refresh itself fails, the credential is cleared,
//! the host is notified, and all waiters reject with a terminal
//! session-expired error.
//!
//! # Usage Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use vendora_client::{ApiClient, ApiConfig, CredentialStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let credentials = Arc::new(CredentialStore::in_memory());
//!     credentials.initialize().await?;
//!
//!     let client = ApiClient::builder()
//!         .config(ApiConfig::new("https://api.example.com")?)
//!         .credentials(credentials.clone())
//!         .build()?;
//!
//!     // Seed the credential after the host's login flow succeeds.
//!     credentials.set("token-from-login").await?;
//!
//!     // Requests carry the bearer header automatically; an expired token
//!     // is refreshed behind the scenes and the request replayed.
//!     let products: serde_json::Value = client.get("/products").await?;
//!     println!("{products}");
//!
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod client;
pub mod config;
pub mod credentials;
pub mod envelope;
pub mod error;
pub mod refresh;
pub mod request;
pub mod session;
pub mod testing;

pub use client::{ApiClient, ApiClientBuilder};
pub use config::{ApiConfig, DEFAULT_TIMEOUT, REFRESH_PATH, VERIFY_PATH};
pub use credentials::{CredentialError, CredentialStore, MemoryTokenStorage, TokenStorage};
pub use envelope::{ApiEnvelope, ListEnvelope};
pub use error::{classify, ApiError, ErrorKind};
pub use refresh::RefreshCoordinator;
pub use request::ApiRequest;
pub use session::{NullSessionSink, SessionSink};
