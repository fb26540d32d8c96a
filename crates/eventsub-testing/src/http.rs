//! HTTP mocking utilities for Helix endpoints.

use eventsub_client::{ClientSettings, HelixClient};
use http::StatusCode;
use serde_json::Value;
use wiremock::{
    matchers::{header, method, path, query_param, query_param_is_missing},
    Mock, MockServer, Request, ResponseTemplate,
};

use crate::fixtures::{test_settings_for, TEST_CLIENT_ID};

/// Wiremock server answering on `/helix/...` paths.
///
/// Every mock requires the fixture `Client-Id` header, so a request built
/// without credentials falls through to wiremock's default 404.
pub struct MockHelixServer {
    server: MockServer,
}

impl MockHelixServer {
    /// Starts a new mock server on a random port.
    pub async fn start() -> Self {
        Self { server: MockServer::start().await }
    }

    /// Base URL of the server, without the `/helix` prefix.
    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Settings with fixture credentials pointing at this server.
    pub fn settings(&self) -> ClientSettings {
        test_settings_for(self.url())
    }

    /// Client over a real HTTP transport pointing at this server.
    pub fn client(&self) -> HelixClient {
        HelixClient::with_reqwest(self.settings()).expect("HTTP client should build")
    }

    fn mock(http_method: &str, endpoint: &str) -> wiremock::MockBuilder {
        Mock::given(method(http_method))
            .and(path(format!("/helix{endpoint}")))
            .and(header("Client-Id", TEST_CLIENT_ID))
    }

    /// Answers `http_method endpoint` with a JSON body.
    pub async fn mock_json(
        &self,
        http_method: &str,
        endpoint: &str,
        status: StatusCode,
        body: Value,
    ) {
        Self::mock(http_method, endpoint)
            .respond_with(ResponseTemplate::new(status.as_u16()).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Answers `http_method endpoint` with an empty body.
    pub async fn mock_status(&self, http_method: &str, endpoint: &str, status: StatusCode) {
        Self::mock(http_method, endpoint)
            .respond_with(ResponseTemplate::new(status.as_u16()))
            .mount(&self.server)
            .await;
    }

    /// Answers a `GET` listing page selected by its `after` cursor.
    ///
    /// `after: None` matches the first page, which carries no cursor.
    pub async fn mock_page(&self, endpoint: &str, after: Option<&str>, body: Value) {
        let mock = Self::mock("GET", endpoint);
        let mock = match after {
            Some(cursor) => mock.and(query_param("after", cursor)),
            None => mock.and(query_param_is_missing("after")),
        };

        mock.respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(&self.server)
            .await;
    }

    /// Answers a 429 with a `Ratelimit-Reset` epoch header.
    pub async fn mock_rate_limited(&self, http_method: &str, endpoint: &str, reset_epoch: i64) {
        Self::mock(http_method, endpoint)
            .respond_with(
                ResponseTemplate::new(StatusCode::TOO_MANY_REQUESTS.as_u16())
                    .insert_header("Ratelimit-Reset", reset_epoch.to_string())
                    .set_body_json(serde_json::json!({
                        "error": "Too Many Requests",
                        "status": 429,
                        "message": "rate limit exceeded"
                    })),
            )
            .mount(&self.server)
            .await;
    }

    /// Requests received by the server.
    pub async fn received_requests(&self) -> Vec<Request> {
        self.server.received_requests().await.unwrap_or_default()
    }

    /// Asserts that exactly `expected` requests were received.
    pub async fn assert_request_count(&self, expected: usize) {
        let requests = self.received_requests().await;
        assert_eq!(
            requests.len(),
            expected,
            "Expected {} requests, received {}",
            expected,
            requests.len()
        );
    }
}

/// HTTP assertions for recorded requests.
pub mod assertions {
    use super::*;

    /// Asserts that the request body matches expected JSON.
    pub fn assert_json_body(request: &Request, expected: &Value) {
        let actual: Value =
            serde_json::from_slice(&request.body).expect("Failed to parse request body as JSON");

        assert_eq!(actual, *expected, "Request body does not match expected JSON");
    }

    /// Asserts the bearer token sent with a request.
    pub fn assert_bearer(request: &Request, token: &str) {
        let value = request
            .headers
            .get("authorization")
            .unwrap_or_else(|| panic!("Header 'Authorization' not present"));

        assert_eq!(value.to_str().unwrap(), format!("Bearer {token}"));
    }
}
