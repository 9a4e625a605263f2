//! Error taxonomy and HTTP status classification
//!
//! Provides the closed error taxonomy for API operations plus the pure
//! [`classify`] mapping from a status/body pair to a user-presentable error.
//! Classification is deterministic: no I/O, no mutation, same inputs always
//! produce the same outcome.

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Categories of API errors for presentation and retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request payload was rejected by the service (400, 422)
    Validation,
    /// The session is terminally invalid; the caller must re-authenticate
    SessionExpired,
    /// The caller lacks permission for the operation (403)
    Forbidden,
    /// The target resource does not exist (404)
    NotFound,
    /// The service reported an internal problem (5xx)
    ServiceUnavailable,
    /// The transport failed before a response was produced
    Network,
    /// The client itself was misconfigured; never crosses the request path
    Config,
    /// Anything the taxonomy does not recognize
    Unknown,
}

/// API operation errors
///
/// By the time one of these reaches a caller, authorization failures have
/// already been absorbed by the refresh coordinator: a 401 surfaces only as
/// [`ApiError::SessionExpired`] after refresh gave up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("Session expired. Please sign in again.")]
    SessionExpired,

    #[error("You do not have permission to perform this action.")]
    Forbidden,

    #[error("The requested resource was not found.")]
    NotFound,

    #[error("The server ran into a problem. Please try again later.")]
    ServiceUnavailable,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Unknown(String),
}

impl ApiError {
    /// Get the taxonomy kind for this error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::SessionExpired => ErrorKind::SessionExpired,
            Self::Forbidden => ErrorKind::Forbidden,
            Self::NotFound => ErrorKind::NotFound,
            Self::ServiceUnavailable => ErrorKind::ServiceUnavailable,
            Self::Network(_) => ErrorKind::Network,
            Self::Config(_) => ErrorKind::Config,
            Self::Unknown(_) => ErrorKind::Unknown,
        }
    }

    /// Check whether retrying the same request later could succeed
    ///
    /// Session expiry is deliberately non-retryable: the coordinator has
    /// already spent the one automatic retry the session gets.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::ServiceUnavailable | ErrorKind::Network)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

/// Map an error status and response body to an [`ApiError`]
///
/// The body is the service's JSON payload when one could be read, or
/// `Value::Null` otherwise. Success statuses never reach this function; the
/// pipeline returns those responses unchanged.
#[must_use]
pub fn classify(status: StatusCode, body: &Value) -> ApiError {
    match status.as_u16() {
        400 => classify_bad_request(body),
        401 => ApiError::SessionExpired,
        403 => ApiError::Forbidden,
        404 => ApiError::NotFound,
        422 => ApiError::Validation("The submitted data is invalid or incomplete.".to_string()),
        500..=599 => ApiError::ServiceUnavailable,
        _ => ApiError::Unknown(
            body.get("message")
                .and_then(Value::as_str)
                .map(String::from)
                .unwrap_or_else(|| format!("Unexpected response status {status}")),
        ),
    }
}

/// 400 bodies come in three shapes: a structured `errors` array, a map of
/// field names to messages, or a flat `message` string.
fn classify_bad_request(body: &Value) -> ApiError {
    if let Some(errors) = body.get("errors") {
        if let Some(list) = errors.as_array() {
            let joined = list.iter().map(flatten_value).collect::<Vec<_>>().join(", ");
            if !joined.is_empty() {
                return ApiError::Validation(joined);
            }
        }
        if let Some(map) = errors.as_object() {
            let mut parts = Vec::new();
            for value in map.values() {
                match value {
                    Value::Array(items) => parts.extend(items.iter().map(flatten_value)),
                    other => parts.push(flatten_value(other)),
                }
            }
            if !parts.is_empty() {
                return ApiError::Validation(parts.join("; "));
            }
        }
    }

    if let Some(message) = body.get("message").and_then(Value::as_str) {
        // Duplicate-key phrasing from the service reads better as a conflict.
        if message.contains("duplicate") || message.contains("unique") {
            return ApiError::Validation(
                "A record with these details already exists.".to_string(),
            );
        }
        return ApiError::Validation(message.to_string());
    }

    ApiError::Validation("The request is invalid. Please review the submitted data.".to_string())
}

fn flatten_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
