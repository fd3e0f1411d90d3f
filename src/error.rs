//! Error types for the Halo API client.
//!
//! This module defines `HaloError`, the unified error type returned by every
//! client operation, plus the two families it wraps:
//!
//! - [`ConfigError`] - raised synchronously while validating
//!   [`HaloClientOptions`](crate::config::HaloClientOptions), never retried
//! - [`ApiError`] - a classified HTTP failure, tagged with an
//!   [`ApiErrorKind`] describing what went wrong
//!
//! Cancellation is reported as [`HaloError::Cancelled`] and is never an
//! `ApiError`, so it can't be mistaken for a transient failure.
//!
//! # Security
//!
//! Error messages never include the client secret or bearer tokens. Use
//! [`HaloError::sanitize_message`] when building messages from external text.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

/// Unified error type for all Halo client operations.
#[derive(Error, Debug)]
pub enum HaloError {
    /// Options failed validation, or the environment was incomplete.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The server answered with a non-success status.
    #[error(transparent)]
    Api(Box<ApiError>),

    /// The request never produced a response (connection refused, reset, DNS).
    #[error("HTTP request failed: {0}")]
    Http(#[source] reqwest::Error),

    /// HTTP client initialization failed.
    #[error("HTTP client error: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// Request timed out.
    #[error("request timed out after {duration:?} - the server may be slow or unreachable")]
    Timeout {
        /// How long we waited before timing out.
        duration: Duration,
        /// The operation that timed out.
        operation: String,
    },

    /// The caller's cancellation token fired before the call completed.
    #[error("request was cancelled")]
    Cancelled,

    /// JSON serialization or deserialization failed.
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Caller input could not be turned into a request.
    #[error("validation error: {0}")]
    Validation(String),

    /// The client was disposed before this call was made.
    #[error("the Halo client has been disposed")]
    Disposed,

    /// Connection test failed.
    #[error("connection test failed: {message}")]
    ConnectionTest {
        /// Details about why the connection test failed.
        message: String,
    },
}

impl HaloError {
    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        HaloError::Validation(message.into())
    }

    /// Creates a timeout error.
    pub fn timeout(duration: Duration, operation: impl Into<String>) -> Self {
        HaloError::Timeout {
            duration,
            operation: operation.into(),
        }
    }

    /// Creates a connection test error.
    pub fn connection_test(message: impl Into<String>) -> Self {
        HaloError::ConnectionTest {
            message: message.into(),
        }
    }

    /// Returns the classified API error, if this is one.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            HaloError::Api(err) => Some(err),
            _ => None,
        }
    }

    /// Returns the HTTP status code when the failure came from a response.
    pub fn status_code(&self) -> Option<u16> {
        self.api_error().and_then(ApiError::status_code)
    }

    /// Returns true if this error is transient and the operation should be retried.
    ///
    /// Retryable errors include:
    /// - Network failures where no response arrived (connect, send, timeout)
    /// - Rate limiting (HTTP 429)
    /// - Server errors (HTTP 5xx)
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            HaloError::Timeout { .. } => true,
            HaloError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            HaloError::Api(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Returns true if the call was cancelled by the caller.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, HaloError::Cancelled)
    }

    /// Sanitizes a message by removing every occurrence of a secret.
    ///
    /// # Arguments
    ///
    /// * `message` - The message to sanitize
    /// * `secret` - The client secret or token to strip from the message
    ///
    /// # Returns
    ///
    /// The message with any occurrence of the secret replaced with `[REDACTED]`
    #[must_use]
    pub fn sanitize_message(message: &str, secret: &str) -> String {
        if secret.is_empty() {
            return message.to_string();
        }
        message.replace(secret, "[REDACTED]")
    }

    /// Creates a sanitized version of this error's display message.
    #[must_use]
    pub fn sanitized_display(&self, secret: &str) -> String {
        Self::sanitize_message(&self.to_string(), secret)
    }
}

impl From<ApiError> for HaloError {
    fn from(err: ApiError) -> Self {
        HaloError::Api(Box::new(err))
    }
}

/// Options validation failure.
///
/// Every variant names the offending field so callers can point users at
/// the exact setting to fix.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required value was empty or whitespace.
    #[error("{field} cannot be null or empty")]
    Empty {
        /// Field name.
        field: &'static str,
    },

    /// A credential did not have the expected shape.
    #[error("{field} must be {expected}")]
    Format {
        /// Field name.
        field: &'static str,
        /// Human-readable description of the expected shape.
        expected: &'static str,
    },

    /// A value was present but out of range or malformed.
    #[error("{field} {reason}")]
    Invalid {
        /// Field or environment variable name.
        field: &'static str,
        /// What is wrong with the value.
        reason: String,
    },

    /// A required environment variable was not set.
    #[error("missing required environment variable: {var}")]
    MissingEnv {
        /// Variable name.
        var: &'static str,
    },
}

impl ConfigError {
    /// Creates an `Invalid` error.
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }

    /// Returns the name of the field or variable this error is about.
    pub fn field(&self) -> &'static str {
        match self {
            ConfigError::Empty { field }
            | ConfigError::Format { field, .. }
            | ConfigError::Invalid { field, .. } => field,
            ConfigError::MissingEnv { var } => var,
        }
    }
}

/// What kind of failure an [`ApiError`] represents.
///
/// Which extra fields are populated:
///
/// | Kind             | Status | Extra fields                                 |
/// |------------------|--------|----------------------------------------------|
/// | `Authentication` | 401 or token exchange status | `error_code` when the server sent one |
/// | `Authorization`  | 403    | -                                            |
/// | `NotFound`       | 404    | resource type/id when the call knows them    |
/// | `BadRequest`     | 400    | validation errors parsed from the body       |
/// | `RateLimit`      | 429    | retry-after, limit, remaining, reset time    |
/// | `Server`         | 5xx    | -                                            |
/// | `Generic`        | other  | raw body in `details["body"]`                |
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// Credentials were rejected.
    Authentication,
    /// Credentials were accepted but lack permission.
    Authorization,
    /// The resource does not exist.
    NotFound {
        /// Resource type, e.g. `Ticket`.
        resource_type: Option<String>,
        /// Resource identifier as sent in the request.
        resource_id: Option<String>,
    },
    /// The request was rejected as malformed.
    BadRequest {
        /// Validation messages in the order the server sent them.
        validation_errors: Vec<String>,
    },
    /// Too many requests.
    RateLimit {
        /// Seconds the server asked us to wait.
        retry_after_seconds: Option<u64>,
        /// Size of the rate limit window.
        rate_limit: Option<u64>,
        /// Requests left in the current window.
        remaining_requests: Option<u64>,
        /// When the window resets.
        reset_time: Option<DateTime<Utc>>,
    },
    /// The server failed.
    Server,
    /// Any other non-success status.
    Generic,
}

impl ApiErrorKind {
    /// Short label used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            ApiErrorKind::Authentication => "authentication",
            ApiErrorKind::Authorization => "authorization",
            ApiErrorKind::NotFound { .. } => "not_found",
            ApiErrorKind::BadRequest { .. } => "bad_request",
            ApiErrorKind::RateLimit { .. } => "rate_limit",
            ApiErrorKind::Server => "server",
            ApiErrorKind::Generic => "generic",
        }
    }
}

/// A classified failure reported by the Halo API.
///
/// Built once where the raw response is available and never mutated
/// afterwards; the `with_*` methods are only used during construction.
#[derive(Debug)]
pub struct ApiError {
    message: String,
    kind: ApiErrorKind,
    status_code: Option<u16>,
    error_code: Option<String>,
    details: Option<Map<String, Value>>,
    request_url: Option<String>,
    request_method: Option<String>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ApiError {
    /// Creates an error of the given kind with only a message.
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
            status_code: None,
            error_code: None,
            details: None,
            request_url: None,
            request_method: None,
            source: None,
        }
    }

    /// Creates a `Generic` error.
    pub fn generic(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Generic, message)
    }

    /// Creates an `Authentication` error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Authentication, message)
    }

    /// Creates an `Authorization` error.
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Authorization, message)
    }

    /// Creates a `NotFound` error.
    pub fn not_found(
        message: impl Into<String>,
        resource_type: Option<String>,
        resource_id: Option<String>,
    ) -> Self {
        Self::new(
            ApiErrorKind::NotFound {
                resource_type,
                resource_id,
            },
            message,
        )
    }

    /// Creates a `BadRequest` error.
    pub fn bad_request(message: impl Into<String>, validation_errors: Vec<String>) -> Self {
        Self::new(ApiErrorKind::BadRequest { validation_errors }, message)
    }

    /// Creates a `Server` error.
    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Server, message)
    }

    /// Attaches the HTTP status code.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    /// Attaches the API error code.
    pub fn with_error_code(mut self, code: Option<String>) -> Self {
        self.error_code = code;
        self
    }

    /// Attaches structured details from the response.
    pub fn with_details(mut self, details: Option<Map<String, Value>>) -> Self {
        self.details = details;
        self
    }

    /// Attaches the method and URL of the failing request.
    pub fn with_request(mut self, method: impl Into<String>, url: impl Into<String>) -> Self {
        self.request_method = Some(method.into());
        self.request_url = Some(url.into());
        self
    }

    /// Attaches the underlying cause.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// What kind of failure this is.
    pub fn kind(&self) -> &ApiErrorKind {
        &self.kind
    }

    /// HTTP status code, if a response was received.
    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    /// Error code from the response body.
    pub fn error_code(&self) -> Option<&str> {
        self.error_code.as_deref()
    }

    /// Structured details from the response body.
    pub fn details(&self) -> Option<&Map<String, Value>> {
        self.details.as_ref()
    }

    /// URL of the failing request.
    pub fn request_url(&self) -> Option<&str> {
        self.request_url.as_deref()
    }

    /// Method of the failing request.
    pub fn request_method(&self) -> Option<&str> {
        self.request_method.as_deref()
    }

    /// Validation messages for `BadRequest`, empty otherwise.
    pub fn validation_errors(&self) -> &[String] {
        match &self.kind {
            ApiErrorKind::BadRequest { validation_errors } => validation_errors,
            _ => &[],
        }
    }

    /// Seconds to wait before retrying, for `RateLimit`.
    pub fn retry_after(&self) -> Option<Duration> {
        match &self.kind {
            ApiErrorKind::RateLimit {
                retry_after_seconds,
                ..
            } => retry_after_seconds.map(Duration::from_secs),
            _ => None,
        }
    }

    /// Rate limit and server errors may succeed on a later attempt.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            ApiErrorKind::RateLimit { .. } | ApiErrorKind::Server
        )
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(status) => write!(f, "Halo API error (HTTP {}): {}", status, self.message),
            None => write!(f, "Halo API error: {}", self.message),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}
