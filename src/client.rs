//! Request pipeline bound to one base endpoint
//!
//! [`ApiClient`] wraps an HTTP transport fixed to a single base URL, attaches
//! the current credential to every outgoing request, and routes qualifying
//! 401s through the [`RefreshCoordinator`]. By the time an error reaches the
//! caller it is either a successfully-retried response or a classified,
//! terminal outcome.

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::{ApiConfig, VERIFY_PATH};
use crate::credentials::CredentialStore;
use crate::error::{classify, ApiError};
use crate::refresh::RefreshCoordinator;
use crate::request::ApiRequest;
use crate::session::{NullSessionSink, SessionSink};

/// Authenticated API client for one backend
pub struct ApiClient {
    http: reqwest::Client,
    config: ApiConfig,
    store: Arc<CredentialStore>,
    refresh: Arc<RefreshCoordinator>,
}

impl ApiClient {
    /// Create a builder for fluent configuration
    #[must_use]
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// Create a client over the given configuration, credential store, and
    /// session sink
    ///
    /// # Errors
    /// Returns [`ApiError::Config`] if the transport cannot be built.
    pub fn new(
        config: ApiConfig,
        store: Arc<CredentialStore>,
        sink: Arc<dyn SessionSink>,
    ) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::Config(format!("failed to build HTTP transport: {e}")))?;

        let refresh = Arc::new(RefreshCoordinator::new(&config, store.clone(), sink)?);

        Ok(Self { http, config, store, refresh })
    }

    /// The credential store backing this client
    ///
    /// Hosts call [`CredentialStore::set`](CredentialStore::set) here after a
    /// successful login and [`CredentialStore::clear`] on logout.
    #[must_use]
    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    /// Execute a request, transparently recovering from a single 401
    ///
    /// 2xx–3xx responses are returned unchanged; whether the body matches the
    /// caller's expected shape is the caller's concern. A 401 on a non-auth
    /// route is handed to the refresh coordinator exactly once, after which
    /// the request is replayed with the refreshed credential. Every other
    /// error status is classified and propagated.
    ///
    /// # Errors
    /// Returns a classified [`ApiError`]; 401s surface only as
    /// [`ApiError::SessionExpired`] after refresh gave up.
    pub async fn execute(&self, request: ApiRequest) -> Result<Response, ApiError> {
        let mut request = request;
        let response = self.dispatch(&request).await?;

        if response.status() != StatusCode::UNAUTHORIZED
            || request.is_auth_route()
            || request.is_retried()
        {
            return Self::finalize(response).await;
        }

        // Consume the one automatic retry before entering the coordinator so
        // a second 401 on the replay propagates instead of looping.
        request.mark_retried();
        debug!(method = %request.method(), path = %request.path(), "401 received; deferring to refresh coordinator");
        self.refresh.resolve_unauthorized(request.method(), request.path()).await?;

        let replay = self.dispatch(&request).await?;
        Self::finalize(replay).await
    }

    /// Execute a GET request and deserialize the response body
    ///
    /// # Errors
    /// Returns a classified [`ApiError`], or [`ApiError::Unknown`] if the
    /// body cannot be deserialized.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.execute(ApiRequest::get(path)).await?;
        Self::parse_json(response).await
    }

    /// Execute a POST request and deserialize the response body
    ///
    /// # Errors
    /// Returns a classified [`ApiError`], or [`ApiError::Unknown`] if the
    /// body cannot be serialized or the response deserialized.
    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self.execute(ApiRequest::post(path, body)?).await?;
        Self::parse_json(response).await
    }

    /// Execute a PUT request and deserialize the response body
    ///
    /// # Errors
    /// Returns a classified [`ApiError`], or [`ApiError::Unknown`] if the
    /// body cannot be serialized or the response deserialized.
    pub async fn put<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self.execute(ApiRequest::put(path, body)?).await?;
        Self::parse_json(response).await
    }

    /// Execute a DELETE request and deserialize the response body
    ///
    /// # Errors
    /// Returns a classified [`ApiError`], or [`ApiError::Unknown`] if the
    /// response cannot be deserialized.
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.execute(ApiRequest::delete(path)).await?;
        Self::parse_json(response).await
    }

    /// Probe whether the stored credential is still accepted by the service
    ///
    /// A rejected credential clears the store and reports `false`. The probe
    /// targets an auth route, so it never enters the refresh flow.
    ///
    /// # Errors
    /// Returns a classified [`ApiError`] for outcomes other than a clean
    /// accept/reject.
    pub async fn verify_session(&self) -> Result<bool, ApiError> {
        match self.execute(ApiRequest::get(VERIFY_PATH)).await {
            Ok(_) => Ok(true),
            Err(ApiError::SessionExpired) => {
                info!("stored credential rejected by verify endpoint");
                if let Err(e) = self.store.clear().await {
                    tracing::warn!(error = %e, "failed to clear rejected credential");
                }
                Ok(false)
            }
            Err(other) => Err(other),
        }
    }

    /// Send one request: read-then-attach the credential, then hit the wire
    async fn dispatch(&self, request: &ApiRequest) -> Result<Response, ApiError> {
        let url = self.config.endpoint(request.path());

        let mut builder =
            self.http.request(request.method().clone(), &url).headers(request.headers().clone());

        if let Some(token) = self.store.get().await {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        debug!(method = %request.method(), %url, "sending request");
        Ok(builder.send().await?)
    }

    /// Pass successes through; classify everything else
    async fn finalize(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() || status.is_redirection() {
            return Ok(response);
        }

        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        Err(classify(status, &body))
    }

    /// Deserialize a response body, treating no-content statuses as JSON null
    async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let status = response.status();
        if status == StatusCode::NO_CONTENT || status == StatusCode::RESET_CONTENT {
            return serde_json::from_value(Value::Null).map_err(|_| {
                ApiError::Unknown(format!(
                    "no-content response ({status}) cannot populate the requested type"
                ))
            });
        }

        response
            .json()
            .await
            .map_err(|e| ApiError::Unknown(format!("failed to parse response body: {e}")))
    }
}

/// Builder for [`ApiClient`]
#[derive(Default)]
pub struct ApiClientBuilder {
    config: Option<ApiConfig>,
    store: Option<Arc<CredentialStore>>,
    sink: Option<Arc<dyn SessionSink>>,
}

impl ApiClientBuilder {
    /// Set the client configuration (required)
    #[must_use]
    pub fn config(mut self, config: ApiConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the credential store; defaults to an in-memory store
    #[must_use]
    pub fn credentials(mut self, store: Arc<CredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the session sink; defaults to a log-only sink
    #[must_use]
    pub fn session_sink(mut self, sink: Arc<dyn SessionSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Build the client
    ///
    /// # Errors
    /// Returns [`ApiError::Config`] if required fields are missing or the
    /// transport cannot be built.
    pub fn build(self) -> Result<ApiClient, ApiError> {
        let config =
            self.config.ok_or_else(|| ApiError::Config("base endpoint not set".to_string()))?;
        let store = self.store.unwrap_or_else(|| Arc::new(CredentialStore::in_memory()));
        let sink = self.sink.unwrap_or_else(|| Arc::new(NullSessionSink));

        ApiClient::new(config, store, sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn builder_requires_config() {
        let result = ApiClient::builder().build();
        assert!(matches!(result, Err(ApiError::Config(_))));
    }

    #[tokio::test]
    async fn builder_defaults_are_usable() {
        let config = ApiConfig::new("http://localhost:3001").unwrap();
        let client = ApiClient::builder().config(config).build().unwrap();

        assert_eq!(client.credentials().get().await, None);
    }
}
