//! HTTP transport backed by `reqwest`.
//!
//! Builds the Helix URL from the configured base, attaches the `Client-Id`
//! and bearer headers and categorizes connection failures. Status handling
//! is left to the caller through [`HelixResponse::error_for_status`].

use std::{collections::HashMap, future::Future, pin::Pin, time::Duration};

use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use tracing::{info_span, Instrument};

use crate::{
    error::TransportError,
    transport::{HelixRequest, HelixResponse, HelixTransport},
};

/// Configuration for [`ReqwestTransport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Base URL without the API version prefix.
    pub base_url: String,
    /// Timeout for a whole request.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.twitch.tv".to_string(),
            timeout: Duration::from_secs(30),
            user_agent: format!("eventsub-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Production [`HelixTransport`] using a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    config: HttpConfig,
}

impl ReqwestTransport {
    /// Creates a transport with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::ConfigurationError` if the HTTP client cannot
    /// be built.
    pub fn new(config: HttpConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                TransportError::configuration(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self { client, config })
    }

    /// Creates a transport with default configuration.
    pub fn with_defaults() -> Result<Self, TransportError> {
        Self::new(HttpConfig::default())
    }

    /// Transport configuration.
    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    fn url(&self, request: &HelixRequest) -> String {
        format!(
            "{}{}{}",
            self.config.base_url.trim_end_matches('/'),
            request.api_version.prefix(),
            request.path
        )
    }

    async fn execute(&self, request: HelixRequest) -> Result<HelixResponse, TransportError> {
        let url = self.url(&request);
        let start_time = std::time::Instant::now();

        tracing::debug!(
            client_id = %request.credentials.client_id,
            access_token = %request.credentials.access_token_masked(),
            "Sending request"
        );

        let mut http_request = self
            .client
            .request(request.method.clone(), &url)
            .header("Client-Id", &request.credentials.client_id)
            .bearer_auth(&request.credentials.access_token);

        if !request.query.is_empty() {
            http_request = http_request.query(&request.query);
        }
        if let Some(body) = &request.body {
            http_request = http_request.json(body);
        }

        let response = match http_request.send().await {
            Ok(response) => response,
            Err(e) => {
                let duration = start_time.elapsed();
                tracing::warn!(duration_ms = duration.as_millis(), "Request failed: {}", e);

                if e.is_timeout() {
                    return Err(TransportError::timeout(self.config.timeout.as_secs()));
                }
                if e.is_connect() {
                    return Err(TransportError::network(format!("connection failed: {e}")));
                }
                return Err(TransportError::network(e.to_string()));
            },
        };

        let status = response.status().as_u16();
        let headers = extract_headers(response.headers());
        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::timeout(self.config.timeout.as_secs())
            } else {
                TransportError::network(format!("failed to read response body: {e}"))
            }
        })?;

        tracing::debug!(
            status,
            duration_ms = start_time.elapsed().as_millis(),
            "Received response"
        );

        Ok(HelixResponse { status, headers, body })
    }
}

impl HelixTransport for ReqwestTransport {
    fn send(
        &self,
        request: HelixRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HelixResponse, TransportError>> + Send + '_>> {
        let span = info_span!(
            "helix_request",
            method = %request.method,
            path = request.path,
        );
        Box::pin(self.execute(request).instrument(span))
    }
}

/// Copies response headers into a map keyed by lowercase name.
fn extract_headers(header_map: &HeaderMap) -> HashMap<String, String> {
    let mut headers = HashMap::new();

    for (key, value) in header_map {
        if let Ok(value_str) = value.to_str() {
            headers.insert(key.as_str().to_string(), value_str.to_string());
        }
    }

    headers
}

#[cfg(test)]
mod tests {
    use reqwest::Method;
    use serde_json::json;
    use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::{context::Credentials, transport::ApiVersion};

    fn transport_for(server: &MockServer) -> ReqwestTransport {
        ReqwestTransport::new(HttpConfig { base_url: server.uri(), ..HttpConfig::default() })
            .unwrap()
    }

    fn request(method: Method, path: &'static str) -> HelixRequest {
        HelixRequest {
            method,
            path,
            api_version: ApiVersion::Helix,
            query: Vec::new(),
            body: None,
            credentials: Credentials::new("client-abc", "token-0123456789"),
        }
    }

    #[tokio::test]
    async fn auth_headers_and_prefix_sent() {
        let mock_server = MockServer::start().await;

        Mock::given(matchers::method("GET"))
            .and(matchers::path("/helix/eventsub/conduits"))
            .and(matchers::header("Client-Id", "client-abc"))
            .and(matchers::header("Authorization", "Bearer token-0123456789"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .expect(1)
            .mount(&mock_server)
            .await;

        let transport = transport_for(&mock_server);
        let response = transport.send(request(Method::GET, "/eventsub/conduits")).await.unwrap();

        assert_eq!(response.status, 200);
        assert!(response.is_success());
    }

    #[tokio::test]
    async fn query_and_body_forwarded() {
        let mock_server = MockServer::start().await;

        Mock::given(matchers::method("PATCH"))
            .and(matchers::path("/helix/eventsub/conduits"))
            .and(matchers::query_param("probe", "1"))
            .and(matchers::header("content-type", "application/json"))
            .and(matchers::body_json(json!({"id": "c-1", "shard_count": 5})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .expect(1)
            .mount(&mock_server)
            .await;

        let transport = transport_for(&mock_server);
        let mut patch = request(Method::PATCH, "/eventsub/conduits");
        patch.query.push(("probe", "1".to_string()));
        patch.body = Some(json!({"id": "c-1", "shard_count": 5}));

        let response = transport.send(patch).await.unwrap();
        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn error_statuses_returned_as_responses() {
        let mock_server = MockServer::start().await;

        Mock::given(matchers::method("DELETE"))
            .respond_with(
                ResponseTemplate::new(429)
                    .set_body_string("Too Many Requests")
                    .append_header("Ratelimit-Reset", "1000"),
            )
            .mount(&mock_server)
            .await;

        let transport = transport_for(&mock_server);
        let response =
            transport.send(request(Method::DELETE, "/eventsub/subscriptions")).await.unwrap();

        assert_eq!(response.status, 429);
        assert_eq!(response.headers.get("ratelimit-reset").unwrap(), "1000");
        assert!(matches!(
            response.error_for_status(),
            Err(TransportError::RateLimited { retry_after_seconds: 0 })
        ));
    }

    #[tokio::test]
    async fn timeout_categorized() {
        let mock_server = MockServer::start().await;

        Mock::given(matchers::method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&mock_server)
            .await;

        let transport = ReqwestTransport::new(HttpConfig {
            base_url: mock_server.uri(),
            timeout: Duration::from_secs(1),
            ..HttpConfig::default()
        })
        .unwrap();

        let error = transport.send(request(Method::GET, "/eventsub/conduits")).await.unwrap_err();
        assert_eq!(error, TransportError::timeout(1));
    }

    #[tokio::test]
    async fn connection_failure_categorized() {
        // Nothing listens on port 9 (discard) in test environments
        let transport = ReqwestTransport::new(HttpConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            ..HttpConfig::default()
        })
        .unwrap();

        let error = transport.send(request(Method::GET, "/eventsub/conduits")).await.unwrap_err();
        assert!(matches!(error, TransportError::NetworkError { .. }));
        assert!(error.is_retryable());
    }

    #[test]
    fn trailing_slash_in_base_url_ignored() {
        let transport = ReqwestTransport::new(HttpConfig {
            base_url: "https://api.example.com/".to_string(),
            ..HttpConfig::default()
        })
        .unwrap();

        assert_eq!(
            transport.url(&request(Method::GET, "/eventsub/conduits")),
            "https://api.example.com/helix/eventsub/conduits"
        );
    }

    #[test]
    fn default_transport_targets_public_api() {
        let transport = ReqwestTransport::with_defaults().unwrap();

        assert_eq!(transport.config().timeout, Duration::from_secs(30));
        assert_eq!(
            transport.url(&request(Method::DELETE, "/eventsub/subscriptions")),
            "https://api.twitch.tv/helix/eventsub/subscriptions"
        );
    }
}
