//! API error taxonomy
//!
//! Every failure that reaches application code is one of these kinds with
//! a human-readable message. The mapping from a response:
//!
//! - transport failure (no response) → [`ApiError::Network`]
//! - 429 → [`ApiError::RateLimited`] with a retry-after hint
//! - 401 surviving the one refresh-and-retry (or a failed refresh) →
//!   [`ApiError::AuthRequired`]
//! - other 4xx carrying field-level errors → [`ApiError::Validation`]
//! - 5xx or any other unclassified non-2xx → [`ApiError::Server`]
//!
//! [`ApiError::Config`] covers construction-time misuse only and is never
//! produced by a dispatched request.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Categories of API errors, for match-free inspection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// No response reached the client
    Network,
    /// The backend rejected the request with 429
    RateLimited,
    /// The session is gone; the caller must force re-authentication
    AuthRequired,
    /// The backend rejected the request body with field-level errors
    Validation,
    /// 5xx or any other unclassified non-2xx response
    Server,
    /// Client-side misconfiguration (construction-time only)
    Config,
}

/// API operation errors
///
/// Cloneable so a single refresh outcome can be observed by every request
/// awaiting it.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),

    #[error("rate limit exceeded: {message}")]
    RateLimited {
        message: String,
        /// How long to wait before trying again: the server's
        /// `Retry-After` when present, otherwise the class cool-down
        retry_after: Option<Duration>,
    },

    #[error("authentication required: {0}")]
    AuthRequired(String),

    #[error("validation failed ({status}): {message}")]
    Validation {
        status: u16,
        message: String,
        /// Field name → list of messages, for form feedback
        field_errors: HashMap<String, Vec<String>>,
    },

    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// Get the error category for this error.
    pub fn kind(&self) -> ApiErrorKind {
        match self {
            Self::Network(_) => ApiErrorKind::Network,
            Self::RateLimited { .. } => ApiErrorKind::RateLimited,
            Self::AuthRequired(_) => ApiErrorKind::AuthRequired,
            Self::Validation { .. } => ApiErrorKind::Validation,
            Self::Server { .. } => ApiErrorKind::Server,
            Self::Config(_) => ApiErrorKind::Config,
        }
    }

    /// HTTP status associated with the error, when one exists.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RateLimited { .. } => Some(429),
            Self::AuthRequired(_) => Some(401),
            Self::Validation { status, .. } | Self::Server { status, .. } => Some(*status),
            Self::Network(_) | Self::Config(_) => None,
        }
    }

    /// The carried "try again in" hint, for rate-limit errors.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Whether an explicit user-driven retry is a sensible affordance.
    ///
    /// The pipeline itself never retries these; validation and auth
    /// errors need user input instead.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ApiErrorKind::Network | ApiErrorKind::RateLimited | ApiErrorKind::Server
        )
    }

    /// Classify a non-2xx response body into an error.
    ///
    /// The backend's conventional error body is `{message, code?,
    /// errors?}`; a 4xx carrying `errors` is a validation failure,
    /// everything else lands in the server bucket.
    pub fn from_response_parts(status: StatusCode, payload: ErrorPayload) -> Self {
        let message =
            payload.message.unwrap_or_else(|| "an unexpected error occurred".to_string());

        if status == StatusCode::UNAUTHORIZED {
            return Self::AuthRequired(message);
        }

        match payload.errors {
            Some(field_errors) if status.is_client_error() => {
                Self::Validation { status: status.as_u16(), message, field_errors }
            }
            _ => Self::Server { status: status.as_u16(), message },
        }
    }
}

/// Conventional error body returned by the backend
#[derive(Debug, Default, Deserialize)]
pub struct ErrorPayload {
    pub message: Option<String>,
    pub code: Option<String>,
    pub errors: Option<HashMap<String, Vec<String>>>,
}

impl ErrorPayload {
    /// Decode the payload from a response, tolerating empty or non-JSON
    /// bodies.
    pub async fn read(response: reqwest::Response) -> Self {
        response.json().await.unwrap_or_default()
    }
}
