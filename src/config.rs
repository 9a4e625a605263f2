//! Client configuration
//!
//! Each client instance is bound to exactly one base endpoint at
//! construction; hosts that talk to several backends build one client per
//! backend. Environment overrides fall back to the supplied default with a
//! logged warning rather than failing startup.

use std::time::Duration;

use tracing::warn;
use url::Url;

use crate::error::ApiError;

/// Uniform transport timeout applied to normal calls and the refresh call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Refresh endpoint path, relative to the base endpoint
pub const REFRESH_PATH: &str = "/auth/refresh-token";

/// Credential verification endpoint path, relative to the base endpoint
pub const VERIFY_PATH: &str = "/auth/verify-token";

/// Requests targeting a path containing this marker never enter the refresh
/// flow; a 401 from login, register, or refresh itself propagates directly.
const AUTH_ROUTE_MARKER: &str = "/auth/";

/// Configuration for an [`ApiClient`](crate::client::ApiClient)
#[derive(Debug, Clone)]
pub struct ApiConfig {
    base_url: String,
    timeout: Duration,
}

impl ApiConfig {
    /// Create a configuration bound to the given base endpoint
    ///
    /// # Errors
    /// Returns [`ApiError::Config`] if the URL does not parse.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let base_url = base_url.into();
        Url::parse(&base_url)
            .map_err(|e| ApiError::Config(format!("invalid base URL '{base_url}': {e}")))?;

        Ok(Self { base_url: base_url.trim_end_matches('/').to_string(), timeout: DEFAULT_TIMEOUT })
    }

    /// Override the transport timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read the base endpoint from an environment variable
    ///
    /// Falls back to `default_url` (with a logged warning) when the variable
    /// is unset or blank. `VENDORA_API_TIMEOUT_MS` overrides the timeout the
    /// same way.
    ///
    /// # Errors
    /// Returns [`ApiError::Config`] if the resolved URL does not parse.
    pub fn from_env(var: &str, default_url: &str) -> Result<Self, ApiError> {
        let base_url = match std::env::var(var) {
            Ok(value) if !value.trim().is_empty() => value,
            _ => {
                warn!(variable = %var, default = %default_url, "environment variable not set; using default");
                default_url.to_string()
            }
        };

        let mut config = Self::new(base_url)?;

        if let Ok(raw) = std::env::var("VENDORA_API_TIMEOUT_MS") {
            match raw.trim().parse::<u64>() {
                Ok(millis) if millis > 0 => config.timeout = Duration::from_millis(millis),
                _ => warn!(value = %raw, "ignoring unparseable VENDORA_API_TIMEOUT_MS"),
            }
        }

        Ok(config)
    }

    /// The base endpoint, without a trailing slash
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The uniform transport timeout
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Build an absolute URL for a request path
    ///
    /// A missing leading slash is inserted, so `endpoint("products")` and
    /// `endpoint("/products")` are equivalent.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Absolute URL of the refresh endpoint
    #[must_use]
    pub fn refresh_url(&self) -> String {
        self.endpoint(REFRESH_PATH)
    }

    /// Check whether a request path targets an authentication endpoint
    #[must_use]
    pub fn is_auth_route(path: &str) -> bool {
        path.contains(AUTH_ROUTE_MARKER)
    }
}
