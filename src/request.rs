//! Replayable request descriptors
//!
//! A request is captured as plain data (method, path, headers, JSON body)
//! rather than a one-shot transport handle, so the pipeline can dispatch the
//! same request again after a token refresh. The `retried` marker guarantees
//! at most one refresh-triggered retry per original request.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

use crate::config::ApiConfig;
use crate::error::ApiError;

/// A captured request that can be dispatched any number of times
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Option<Value>,
    retried: bool,
}

impl ApiRequest {
    /// Create a request for the given method and path (relative to the
    /// client's base endpoint)
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
            retried: false,
        }
    }

    /// Shorthand for a GET request
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// Shorthand for a POST request with a JSON body
    ///
    /// # Errors
    /// Returns an error if the body cannot be serialized.
    pub fn post<B: Serialize>(path: impl Into<String>, body: &B) -> Result<Self, ApiError> {
        Self::new(Method::POST, path).json(body)
    }

    /// Shorthand for a PUT request with a JSON body
    ///
    /// # Errors
    /// Returns an error if the body cannot be serialized.
    pub fn put<B: Serialize>(path: impl Into<String>, body: &B) -> Result<Self, ApiError> {
        Self::new(Method::PUT, path).json(body)
    }

    /// Shorthand for a DELETE request
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body
    ///
    /// The body is captured as a [`Value`] so the request stays replayable.
    ///
    /// # Errors
    /// Returns an error if the body cannot be serialized.
    pub fn json<B: Serialize>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::Unknown(format!("failed to serialize request body: {e}")))?;
        self.body = Some(value);
        Ok(self)
    }

    /// Attach an extra header
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Whether this request targets an authentication endpoint
    ///
    /// Auth-route 401s propagate directly; attempting a refresh for the
    /// refresh endpoint itself would loop forever.
    #[must_use]
    pub fn is_auth_route(&self) -> bool {
        ApiConfig::is_auth_route(&self.path)
    }

    /// Whether this request has already consumed its one automatic retry
    #[must_use]
    pub fn is_retried(&self) -> bool {
        self.retried
    }

    pub(crate) fn mark_retried(&mut self) {
        self.retried = true;
    }
}
