//! Error types for the common library.
//!
//! This module provides a unified error hierarchy using `thiserror` so that the
//! speech and calendar servers report failures the same way.
//!
//! # Error Categories
//!
//! - `ConfigError`: Missing or invalid configuration
//! - `AuthError`: Google OAuth credential and token failures
//! - `SynthesisError`: Text-to-speech endpoint failures
//! - `Error::Api`: Calendar API errors (includes endpoint and status)
//! - `Error::Validation`: Input validation failures
//! - `Error::Io`: File system operations

use thiserror::Error;

/// Unified error type for the common library.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration errors (missing env vars, invalid values)
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Authentication errors (missing credentials, token refresh failures)
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Remote speech synthesis failed
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    /// API errors with endpoint and HTTP status context
    ///
    /// A `status_code` of 0 means the request never produced a response.
    #[error("API error for {endpoint} (HTTP {status_code}): {message}")]
    Api {
        /// The API endpoint that was called
        endpoint: String,
        /// HTTP status code returned by the API
        status_code: u16,
        /// Error message from the API or describing the failure
        message: String,
    },

    /// Input validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// File system I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a new API error with endpoint, status code, and message.
    ///
    /// # Example
    ///
    /// ```
    /// use dental_mcp_common::error::Error;
    ///
    /// let err = Error::api(
    ///     "https://www.googleapis.com/calendar/v3/calendars/primary/events",
    ///     404,
    ///     "Not Found"
    /// );
    /// assert!(err.to_string().contains("calendar/v3"));
    /// assert!(err.to_string().contains("404"));
    /// ```
    pub fn api(endpoint: impl Into<String>, status_code: u16, message: impl Into<String>) -> Self {
        Error::Api {
            endpoint: endpoint.into(),
            status_code,
            message: message.into(),
        }
    }

    /// Create a new validation error.
    ///
    /// # Example
    ///
    /// ```
    /// use dental_mcp_common::error::Error;
    ///
    /// let err = Error::validation("text cannot be empty");
    /// assert!(err.to_string().contains("text cannot be empty"));
    /// ```
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    /// Whether this error was caused by bad caller input rather than a backend failure.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}

/// Configuration errors.
///
/// These errors occur when loading or validating configuration from
/// environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is not set
    #[error("Required environment variable {0} is not set")]
    MissingEnvVar(String),

    /// An environment variable has an invalid value
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl ConfigError {
    /// Create a new missing environment variable error.
    pub fn missing_env_var(name: impl Into<String>) -> Self {
        ConfigError::MissingEnvVar(name.into())
    }

    /// Create a new invalid value error.
    pub fn invalid_value(name: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue(name.into(), reason.into())
    }
}

/// Text-to-speech failures.
///
/// Credentials are only checked by the remote service, so an invalid key
/// surfaces here as a `Status` error with HTTP 401.
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// The request never produced a response (DNS, TLS, connection reset)
    #[error("Synthesis request to {endpoint} failed: {message}")]
    Request {
        /// The synthesis endpoint that was called
        endpoint: String,
        /// Transport error description
        message: String,
    },

    /// The endpoint answered with a non-2xx status
    #[error("Synthesis endpoint {endpoint} returned HTTP {status_code}: {body}")]
    Status {
        /// The synthesis endpoint that was called
        endpoint: String,
        /// HTTP status code returned
        status_code: u16,
        /// Response body, usually a JSON error document
        body: String,
    },

    /// The audio body could not be read
    #[error("Malformed synthesis response from {endpoint}: {message}")]
    Body {
        /// The synthesis endpoint that was called
        endpoint: String,
        /// Read error description
        message: String,
    },
}

impl SynthesisError {
    /// Create a transport-level failure.
    pub fn request(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        SynthesisError::Request {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create a non-success status failure.
    ///
    /// # Example
    ///
    /// ```
    /// use dental_mcp_common::error::SynthesisError;
    ///
    /// let err = SynthesisError::status("https://api.elevenlabs.io/v1/text-to-speech/abc", 401, "invalid_api_key");
    /// assert_eq!(err.status_code(), Some(401));
    /// assert!(err.to_string().contains("invalid_api_key"));
    /// ```
    pub fn status(endpoint: impl Into<String>, status_code: u16, body: impl Into<String>) -> Self {
        SynthesisError::Status {
            endpoint: endpoint.into(),
            status_code,
            body: body.into(),
        }
    }

    /// Create a malformed-body failure.
    pub fn body(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        SynthesisError::Body {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// The endpoint the failing request was sent to.
    pub fn endpoint(&self) -> &str {
        match self {
            SynthesisError::Request { endpoint, .. }
            | SynthesisError::Status { endpoint, .. }
            | SynthesisError::Body { endpoint, .. } => endpoint,
        }
    }

    /// HTTP status, when the endpoint answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            SynthesisError::Status { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }
}

/// Authentication errors.
///
/// These errors occur while exchanging the Google OAuth refresh token for an
/// access token.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No credentials were supplied
    #[error("GOOGLE_OAUTH_CREDENTIALS not set")]
    NotConfigured,

    /// The credentials document could not be parsed
    #[error("Invalid OAuth credentials: {0}")]
    InvalidCredentials(String),

    /// Token refresh failed
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),
}

impl AuthError {
    /// Create a new token refresh failed error.
    pub fn refresh_failed(message: impl Into<String>) -> Self {
        AuthError::RefreshFailed(message.into())
    }

    /// Create a new invalid credentials error.
    pub fn invalid_credentials(message: impl Into<String>) -> Self {
        AuthError::InvalidCredentials(message.into())
    }
}

/// Result type alias using the unified Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_includes_endpoint_and_status() {
        let err = Error::api("https://www.googleapis.com/calendar/v3/calendars/primary/events", 500, "Backend error");
        let msg = err.to_string();
        assert!(msg.contains("calendar/v3"), "Should contain endpoint");
        assert!(msg.contains("500"), "Should contain status code");
        assert!(msg.contains("Backend error"), "Should contain message");
    }

    #[test]
    fn test_synthesis_status_error_includes_endpoint_and_body() {
        let err = SynthesisError::status(
            "https://api.elevenlabs.io/v1/text-to-speech/voice",
            401,
            r#"{"detail":"invalid_api_key"}"#,
        );
        let msg = err.to_string();
        assert!(msg.contains("api.elevenlabs.io"));
        assert!(msg.contains("401"));
        assert!(msg.contains("invalid_api_key"));
    }

    #[test]
    fn test_synthesis_request_error_has_no_status() {
        let err = SynthesisError::request("http://localhost:1", "connection refused");
        assert_eq!(err.status_code(), None);
        assert_eq!(err.endpoint(), "http://localhost:1");
    }

    #[test]
    fn test_config_error_includes_var_name() {
        let err = ConfigError::missing_env_var("ELEVENLABS_API_KEY");
        assert!(err.to_string().contains("ELEVENLABS_API_KEY"));
    }

    #[test]
    fn test_error_from_synthesis_error() {
        let err: Error = SynthesisError::body("x", "eof").into();
        assert!(matches!(err, Error::Synthesis(_)));
    }

    #[test]
    fn test_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_validation_error() {
        let err = Error::validation("date is required");
        assert!(err.is_validation());
        assert!(err.to_string().contains("Validation"));
        assert!(err.to_string().contains("date is required"));
    }
}
