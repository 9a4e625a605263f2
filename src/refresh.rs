//! Single-flight refresh coordination
//!
//! The coordinator is the only component allowed to act on an authorization
//! failure. Regardless of how many requests hit 401 in the same window,
//! exactly one refresh call goes out; every other qualifying failure is
//! queued and resolved with the shared verdict, in the order the 401s were
//! observed.
//!
//! State machine:
//!
//! ```text
//!            first qualifying 401
//!   Idle ────────────────────────────► Refreshing ──┐ additional 401s
//!    ▲                                     ▲────────┘ enqueue + suspend
//!    │  success: store new token,          │
//!    │           resolve waiters FIFO      │
//!    └─────────────────────────────────────┘
//!       failure: clear credential, notify sink,
//!               reject waiters (terminal)
//! ```
//!
//! The coordinator owns its own bare transport so the refresh call can never
//! recurse into the pipeline's 401 handling. The refresh itself runs as a
//! spawned task: a caller that gives up mid-refresh (timeout, `select!`)
//! never strands the flag or the queue. Constructed once per client session;
//! the flag and queue are never global.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use reqwest::header::AUTHORIZATION;
use reqwest::Method;
use serde::Deserialize;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::config::ApiConfig;
use crate::credentials::CredentialStore;
use crate::error::ApiError;
use crate::session::SessionSink;

/// Successful refresh responses carry the replacement token
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    token: Option<String>,
}

/// A request suspended on the outcome of the in-flight refresh
///
/// Holds the descriptor identity for tracing plus the completion handle its
/// suspended caller is parked on. Destroyed on resolve or reject.
struct PendingRequest {
    method: Method,
    path: String,
    notify: oneshot::Sender<Result<String, ApiError>>,
}

#[derive(Default)]
struct RefreshState {
    refreshing: bool,
    // Invariant: non-empty only while `refreshing` is true.
    queue: VecDeque<PendingRequest>,
}

/// Coordinates token refresh across concurrent requests
pub struct RefreshCoordinator {
    inner: Arc<RefreshInner>,
}

/// Shared with the spawned refresh task so the refresh outlives its trigger
struct RefreshInner {
    http: reqwest::Client,
    refresh_url: String,
    store: Arc<CredentialStore>,
    sink: Arc<dyn SessionSink>,
    state: Mutex<RefreshState>,
}

impl RefreshCoordinator {
    /// Create a coordinator for one client session
    ///
    /// # Errors
    /// Returns [`ApiError::Config`] if the dedicated transport cannot be
    /// built.
    pub fn new(
        config: &ApiConfig,
        store: Arc<CredentialStore>,
        sink: Arc<dyn SessionSink>,
    ) -> Result<Self, ApiError> {
        // Same uniform timeout as normal calls; a timed-out refresh is a
        // refresh failure.
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ApiError::Config(format!("failed to build refresh transport: {e}")))?;

        Ok(Self {
            inner: Arc::new(RefreshInner {
                http,
                refresh_url: config.refresh_url(),
                store,
                sink,
                state: Mutex::new(RefreshState::default()),
            }),
        })
    }

    /// Resolve a qualifying 401 into a usable credential or a terminal error
    ///
    /// The first caller in an idle window spawns the refresh; callers
    /// arriving while a refresh is in flight suspend until the verdict
    /// lands. On `Ok`, the returned credential is already persisted and the
    /// caller should replay its request.
    ///
    /// Cancellation-safe: the refresh runs as a spawned task and settles the
    /// queue regardless of whether the triggering caller is still waiting.
    ///
    /// # Errors
    /// Returns [`ApiError::SessionExpired`] when the session cannot be
    /// recovered.
    pub async fn resolve_unauthorized(
        &self,
        method: &Method,
        path: &str,
    ) -> Result<String, ApiError> {
        // Check-and-set in one critical section so two near-simultaneous
        // 401s can never both start a refresh. Every caller, the trigger
        // included, parks on a completion handle.
        let (rx, leads) = {
            let mut state = self.inner.state.lock();
            let (tx, rx) = oneshot::channel();
            state.queue.push_back(PendingRequest {
                method: method.clone(),
                path: path.to_string(),
                notify: tx,
            });
            let leads = !state.refreshing;
            state.refreshing = true;
            (rx, leads)
        };

        if leads {
            debug!(%method, path, "401 elected to trigger token refresh");
            let inner = self.inner.clone();
            tokio::spawn(async move { inner.run_refresh().await });
        } else {
            debug!(%method, path, "refresh already in flight; queueing request");
        }

        match rx.await {
            Ok(verdict) => verdict,
            // Refresh task dropped without settling; nothing left to wait for.
            Err(_) => Err(ApiError::SessionExpired),
        }
    }
}

impl RefreshInner {
    /// The one refresh attempt for a window; always settles the queue
    async fn run_refresh(&self) {
        let Some(stale) = self.store.get().await else {
            warn!("401 with no stored credential; nothing to refresh");
            self.terminate_session().await;
            return;
        };

        info!("access token rejected; attempting refresh");

        match self.request_new_token(&stale).await {
            Ok(token) => {
                // Persist before waking anyone so every replay reads the new
                // credential.
                if let Err(e) = self.store.set(&token).await {
                    error!(error = %e, "failed to persist refreshed credential");
                    self.terminate_session().await;
                    return;
                }

                info!("token refresh succeeded");
                self.settle(Ok(token));
            }
            Err(e) => {
                warn!(error = %e, "token refresh failed; terminating session");
                self.terminate_session().await;
            }
        }
    }

    /// One-shot call to the refresh endpoint, authenticated with the stale
    /// credential, on the coordinator's own transport
    async fn request_new_token(&self, stale: &str) -> Result<String, ApiError> {
        let response = self
            .http
            .post(&self.refresh_url)
            .header(AUTHORIZATION, format!("Bearer {stale}"))
            .json(&serde_json::json!({}))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Network(format!("refresh endpoint returned status {status}")));
        }

        let body: RefreshResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Network(format!("failed to parse refresh response: {e}")))?;

        body.token
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| ApiError::Network("refresh response carried no token".to_string()))
    }

    /// Terminal failure: clear the credential, notify the host, reject every
    /// waiter. No automatic recovery beyond this point.
    async fn terminate_session(&self) {
        if let Err(e) = self.store.clear().await {
            warn!(error = %e, "failed to clear credential while terminating session");
        }
        self.sink.on_session_terminated().await;
        self.settle(Err(ApiError::SessionExpired));
    }

    /// Leave the refreshing state and deliver the verdict to queued requests
    /// in the order their 401s were observed
    fn settle(&self, verdict: Result<String, ApiError>) {
        let drained = {
            let mut state = self.state.lock();
            state.refreshing = false;
            std::mem::take(&mut state.queue)
        };

        for pending in drained {
            debug!(method = %pending.method, path = %pending.path, "resolving queued request");
            // A closed receiver means the caller went away; nothing to do.
            let _ = pending.notify.send(verdict.clone());
        }
    }
}
