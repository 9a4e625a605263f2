//! Response envelope helpers
//!
//! The service wraps most payloads as `{ success, data?, message? }`; a few
//! legacy list endpoints return a bare array instead. These helpers are a
//! convenience for hosts deserializing typed responses; the pipeline itself
//! never inspects bodies on the success path.

use serde::Deserialize;

use crate::error::ApiError;

/// Standard response envelope
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T> ApiEnvelope<T> {
    /// Unwrap the payload, turning an unsuccessful envelope into an error
    ///
    /// # Errors
    /// Returns [`ApiError::Unknown`] carrying the envelope's message when
    /// `success` is false, or when a successful envelope has no data.
    pub fn into_data(self) -> Result<T, ApiError> {
        if !self.success {
            return Err(ApiError::Unknown(
                self.message.unwrap_or_else(|| "request failed".to_string()),
            ));
        }
        self.data
            .ok_or_else(|| ApiError::Unknown("response reported success without data".to_string()))
    }
}

/// List response that tolerates the legacy bare-array shape
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ListEnvelope<T> {
    Wrapped(ApiEnvelope<Vec<T>>),
    Bare(Vec<T>),
}

impl<T> ListEnvelope<T> {
    /// Unwrap the items regardless of which shape the endpoint used
    ///
    /// # Errors
    /// Returns [`ApiError::Unknown`] when a wrapped envelope reports failure
    /// or carries no data.
    pub fn into_items(self) -> Result<Vec<T>, ApiError> {
        match self {
            Self::Wrapped(envelope) => envelope.into_data(),
            Self::Bare(items) => Ok(items),
        }
    }
}
