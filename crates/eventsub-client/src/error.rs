//! Error types for Helix client operations.
//!
//! Two families reach the caller: validation failures detected before any
//! request is sent, and transport failures reported by the
//! [`HelixTransport`](crate::transport::HelixTransport). Transport failures
//! are passed through unchanged, tagged with the endpoint they came from.
//! Nothing in this crate retries; [`TransportError::is_retryable`] only
//! classifies.

use std::fmt;

use eventsub_core::ValidationError;
use thiserror::Error;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, HelixError>;

/// Failure reported by the transport collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Network-level connectivity failure.
    #[error("network connection failed: {message}")]
    NetworkError {
        /// Error message describing the network failure
        message: String,
    },

    /// Request timeout exceeded.
    #[error("request timeout after {timeout_seconds}s")]
    Timeout {
        /// Number of seconds before the request timed out
        timeout_seconds: u64,
    },

    /// Registry answered with a client error (4xx other than 429).
    #[error("client error: HTTP {status_code}: {message}")]
    ClientError {
        /// HTTP status code (4xx)
        status_code: u16,
        /// Message from the error body
        message: String,
    },

    /// Registry answered with a server error (5xx).
    #[error("server error: HTTP {status_code}: {message}")]
    ServerError {
        /// HTTP status code (5xx)
        status_code: u16,
        /// Message from the error body
        message: String,
    },

    /// Registry answered with a status outside the 2xx/4xx/5xx ranges.
    #[error("unexpected status: HTTP {status_code}")]
    UnexpectedStatus {
        /// HTTP status code
        status_code: u16,
    },

    /// Rate limit exceeded.
    #[error("rate limited: retry after {retry_after_seconds}s")]
    RateLimited {
        /// Seconds until the rate limit bucket refills
        retry_after_seconds: u64,
    },

    /// Response body did not match the expected shape.
    #[error("failed to decode response: {message}")]
    DecodeError {
        /// Decoder error message
        message: String,
    },

    /// Transport could not be configured.
    #[error("invalid transport configuration: {message}")]
    ConfigurationError {
        /// Configuration error message
        message: String,
    },
}

impl TransportError {
    /// Creates a network error from a message.
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError { message: message.into() }
    }

    /// Creates a timeout error.
    pub fn timeout(timeout_seconds: u64) -> Self {
        Self::Timeout { timeout_seconds }
    }

    /// Creates a client error from an HTTP response.
    pub fn client_error(status_code: u16, message: impl Into<String>) -> Self {
        Self::ClientError { status_code, message: message.into() }
    }

    /// Creates a server error from an HTTP response.
    pub fn server_error(status_code: u16, message: impl Into<String>) -> Self {
        Self::ServerError { status_code, message: message.into() }
    }

    /// Creates a rate limit error.
    pub fn rate_limited(retry_after_seconds: u64) -> Self {
        Self::RateLimited { retry_after_seconds }
    }

    /// Creates a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::DecodeError { message: message.into() }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError { message: message.into() }
    }

    /// HTTP status attached to the error, if the registry answered.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::ClientError { status_code, .. }
            | Self::ServerError { status_code, .. }
            | Self::UnexpectedStatus { status_code } => Some(*status_code),
            Self::RateLimited { .. } => Some(429),
            _ => None,
        }
    }

    /// Whether the failure is temporary and the caller may retry.
    ///
    /// Retrying creates is not idempotent; deletes are idempotent by effect.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NetworkError { .. }
            | Self::Timeout { .. }
            | Self::ServerError { .. }
            | Self::RateLimited { .. } => true,

            Self::ClientError { .. }
            | Self::UnexpectedStatus { .. }
            | Self::DecodeError { .. }
            | Self::ConfigurationError { .. } => false,
        }
    }

    /// Suggested delay before retrying, when the registry provided one.
    pub fn retry_after_seconds(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after_seconds } => Some(*retry_after_seconds),
            _ => None,
        }
    }
}

/// Error returned by [`HelixClient`](crate::HelixClient) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HelixError {
    /// Input rejected locally; nothing was sent.
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    /// Transport failed while calling an endpoint.
    #[error("{endpoint} failed: {source}")]
    Transport {
        /// Method and path of the failed call
        endpoint: Endpoint,
        /// Failure as reported by the transport
        #[source]
        source: TransportError,
    },
}

impl HelixError {
    /// Wraps a transport failure with the endpoint it came from.
    pub fn transport(endpoint: Endpoint, source: TransportError) -> Self {
        Self::Transport { endpoint, source }
    }

    /// Validation failure, if this error is one.
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(error) => Some(error),
            Self::Transport { .. } => None,
        }
    }

    /// Transport failure, if this error is one.
    pub fn as_transport(&self) -> Option<&TransportError> {
        match self {
            Self::Transport { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }

    /// Whether the caller may retry the same call unchanged.
    pub fn is_retryable(&self) -> bool {
        self.as_transport().is_some_and(TransportError::is_retryable)
    }
}

/// Method and path of a Helix endpoint, used as error context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    /// HTTP method name.
    pub method: &'static str,
    /// Path below the API version prefix.
    pub path: &'static str,
}

impl Endpoint {
    /// `GET` on a path.
    pub const fn get(path: &'static str) -> Self {
        Self { method: "GET", path }
    }

    /// `POST` on a path.
    pub const fn post(path: &'static str) -> Self {
        Self { method: "POST", path }
    }

    /// `PATCH` on a path.
    pub const fn patch(path: &'static str) -> Self {
        Self { method: "PATCH", path }
    }

    /// `DELETE` on a path.
    pub const fn delete(path: &'static str) -> Self {
        Self { method: "DELETE", path }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}
