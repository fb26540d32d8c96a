//! Transport abstraction for Helix requests.
//!
//! [`HelixClient`](crate::HelixClient) validates input and shapes requests;
//! a [`HelixTransport`] executes them. Production code uses
//! [`ReqwestTransport`](crate::http::ReqwestTransport); tests use
//! [`mock::MockTransport`] or the stateful fake from `eventsub-testing`.
//! Transports do not retry, refresh tokens or rate limit.

use std::{collections::HashMap, future::Future, pin::Pin};

use bytes::Bytes;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::{context::Credentials, error::TransportError};

/// Delay assumed when a 429 response carries no usable reset header.
pub const DEFAULT_RETRY_AFTER_SECONDS: u64 = 60;

/// Largest response body excerpt kept in error messages.
const MAX_ERROR_BODY: usize = 1024;

/// API generation a path belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiVersion {
    /// The Helix API.
    Helix,
}

impl ApiVersion {
    /// Path prefix appended to the base URL.
    pub const fn prefix(&self) -> &'static str {
        match self {
            Self::Helix => "/helix",
        }
    }
}

/// A fully resolved request, ready for the wire.
#[derive(Debug, Clone)]
pub struct HelixRequest {
    /// HTTP method.
    pub method: Method,
    /// Path below the API version prefix, e.g. `/eventsub/conduits`.
    pub path: &'static str,
    /// API generation.
    pub api_version: ApiVersion,
    /// Query parameters in order.
    pub query: Vec<(&'static str, String)>,
    /// JSON body, if any.
    pub body: Option<serde_json::Value>,
    /// Credentials resolved from context and settings.
    pub credentials: Credentials,
}

impl HelixRequest {
    /// First value of a query parameter.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.iter().find(|(key, _)| *key == name).map(|(_, value)| value.as_str())
    }
}

/// Raw response from the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelixResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers with lowercase names.
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: Bytes,
}

impl HelixResponse {
    /// Creates a response with a status and body.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self { status, headers: HashMap::new(), body: body.into() }
    }

    /// Creates a response with a JSON body.
    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        Self::new(status, body.to_string())
    }

    /// Creates a response without a body.
    pub fn empty(status: u16) -> Self {
        Self::new(status, Bytes::new())
    }

    /// Adds a header; the name is stored lowercased.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turns non-2xx responses into transport errors.
    ///
    /// # Errors
    ///
    /// - `RateLimited` for 429, using the `Ratelimit-Reset` header
    /// - `ClientError` for other 4xx responses
    /// - `ServerError` for 5xx responses
    /// - `UnexpectedStatus` for everything else outside 2xx
    pub fn error_for_status(self) -> Result<Self, TransportError> {
        match self.status {
            200..=299 => Ok(self),
            429 => Err(TransportError::rate_limited(
                ratelimit_reset_seconds(&self.headers).unwrap_or(DEFAULT_RETRY_AFTER_SECONDS),
            )),
            400..=499 => Err(TransportError::client_error(self.status, self.error_message())),
            500..=599 => Err(TransportError::server_error(self.status, self.error_message())),
            status_code => Err(TransportError::UnexpectedStatus { status_code }),
        }
    }

    /// Decodes the body as JSON.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, TransportError> {
        serde_json::from_slice(&self.body).map_err(|e| TransportError::decode(e.to_string()))
    }

    /// Message from a Helix error body, or a body excerpt.
    fn error_message(&self) -> String {
        #[derive(Deserialize)]
        struct ErrorBody {
            message: String,
        }

        if let Ok(error) = serde_json::from_slice::<ErrorBody>(&self.body) {
            return error.message;
        }

        let end = self.body.len().min(MAX_ERROR_BODY);
        String::from_utf8_lossy(&self.body[..end]).into_owned()
    }
}

/// Seconds until the rate limit bucket refills.
///
/// The registry sends `Ratelimit-Reset` as a Unix timestamp. Returns `None`
/// when the header is missing, and the default delay when it cannot be
/// parsed.
pub fn ratelimit_reset_seconds<S: std::hash::BuildHasher>(
    headers: &HashMap<String, String, S>,
) -> Option<u64> {
    let reset = headers.get("ratelimit-reset")?;

    let Ok(reset_at) = reset.trim().parse::<i64>() else {
        return Some(DEFAULT_RETRY_AFTER_SECONDS);
    };
    let now = chrono::Utc::now().timestamp();
    Some(u64::try_from(reset_at.saturating_sub(now)).unwrap_or(0))
}

/// Executes Helix requests.
///
/// Implementations propagate timeouts and cancellation as they occur; the
/// returned future may be dropped at any point to cancel the call.
pub trait HelixTransport: Send + Sync + 'static {
    /// Sends one request and returns the raw response.
    ///
    /// Non-2xx statuses are returned as responses, not errors; only failures
    /// to obtain a response are errors.
    fn send(
        &self,
        request: HelixRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HelixResponse, TransportError>> + Send + '_>>;
}

/// Scripted transport for tests.
pub mod mock {
    use std::{collections::VecDeque, future::Future, pin::Pin, sync::Arc};

    use tokio::sync::Mutex;

    use super::{HelixRequest, HelixResponse, HelixTransport};
    use crate::error::TransportError;

    /// Transport that replays queued responses and records every request.
    ///
    /// Responses are consumed in FIFO order. When the queue is empty, `send`
    /// fails with a configuration error so a test notices the extra call.
    #[derive(Clone, Default)]
    pub struct MockTransport {
        responses: Arc<Mutex<VecDeque<Result<HelixResponse, TransportError>>>>,
        requests: Arc<Mutex<Vec<HelixRequest>>>,
    }

    impl MockTransport {
        /// Creates a mock with no scripted responses.
        pub fn new() -> Self {
            Self::default()
        }

        /// Queues a response.
        pub async fn push_response(&self, response: HelixResponse) {
            self.responses.lock().await.push_back(Ok(response));
        }

        /// Queues a JSON response.
        pub async fn push_json(&self, status: u16, body: serde_json::Value) {
            self.push_response(HelixResponse::json(status, &body)).await;
        }

        /// Queues a response without a body.
        pub async fn push_status(&self, status: u16) {
            self.push_response(HelixResponse::empty(status)).await;
        }

        /// Queues a transport failure.
        pub async fn push_error(&self, error: TransportError) {
            self.responses.lock().await.push_back(Err(error));
        }

        /// Requests received so far.
        pub async fn requests(&self) -> Vec<HelixRequest> {
            self.requests.lock().await.clone()
        }

        /// Number of requests received so far.
        pub async fn request_count(&self) -> usize {
            self.requests.lock().await.len()
        }

        /// Number of scripted responses not yet consumed.
        pub async fn pending_responses(&self) -> usize {
            self.responses.lock().await.len()
        }
    }

    impl HelixTransport for MockTransport {
        fn send(
            &self,
            request: HelixRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HelixResponse, TransportError>> + Send + '_>>
        {
            let responses = self.responses.clone();
            let requests = self.requests.clone();
            Box::pin(async move {
                let endpoint = format!("{} {}", request.method, request.path);
                requests.lock().await.push(request);
                responses.lock().await.pop_front().unwrap_or_else(|| {
                    Err(TransportError::configuration(format!(
                        "no scripted response for {endpoint}"
                    )))
                })
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn success_passes_through() {
        let response = HelixResponse::json(200, &json!({"data": []}));
        assert!(response.clone().error_for_status().is_ok());
    }

    #[test]
    fn helix_error_body_message_extracted() {
        let response = HelixResponse::json(
            400,
            &json!({"error": "Bad Request", "status": 400, "message": "invalid transport and auth combination"}),
        );

        assert_eq!(
            response.error_for_status().unwrap_err(),
            TransportError::client_error(400, "invalid transport and auth combination")
        );
    }

    #[test]
    fn plain_body_used_when_not_json() {
        let response = HelixResponse::new(502, "Bad Gateway");
        assert_eq!(
            response.error_for_status().unwrap_err(),
            TransportError::server_error(502, "Bad Gateway")
        );
    }

    #[test]
    fn rate_limit_uses_reset_header() {
        let reset = chrono::Utc::now().timestamp() + 30;
        let response = HelixResponse::empty(429).with_header("Ratelimit-Reset", reset.to_string());

        match response.error_for_status().unwrap_err() {
            TransportError::RateLimited { retry_after_seconds } => {
                assert!((29..=30).contains(&retry_after_seconds));
            },
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn ratelimit_header_parsing() {
        let mut headers = HashMap::new();
        assert_eq!(ratelimit_reset_seconds(&headers), None);

        headers.insert("ratelimit-reset".to_string(), "invalid".to_string());
        assert_eq!(ratelimit_reset_seconds(&headers), Some(DEFAULT_RETRY_AFTER_SECONDS));

        // A reset time in the past means the bucket is already refilled
        headers.insert("ratelimit-reset".to_string(), "1000".to_string());
        assert_eq!(ratelimit_reset_seconds(&headers), Some(0));
    }

    #[test]
    fn decode_failure_is_decode_error() {
        let response = HelixResponse::new(200, "not json");
        let error = response.decode::<serde_json::Value>().unwrap_err();
        assert!(matches!(error, TransportError::DecodeError { .. }));
    }

    #[test]
    fn redirect_status_unexpected() {
        assert_eq!(
            HelixResponse::empty(304).error_for_status().unwrap_err(),
            TransportError::UnexpectedStatus { status_code: 304 }
        );
    }
}
