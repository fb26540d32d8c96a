//! The Helix client handle.
//!
//! Operations are `impl` blocks on [`HelixClient`] spread over the
//! subscription, conduit, shard and pagination modules. Each validates its
//! input, resolves credentials from the [`RequestContext`] and hands one
//! request to the transport.

use std::{fmt, sync::Arc};

use reqwest::Method;
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    config::ClientSettings,
    context::RequestContext,
    error::{Endpoint, HelixError, Result, TransportError},
    http::ReqwestTransport,
    transport::{ApiVersion, HelixRequest, HelixResponse, HelixTransport},
};

/// Client for EventSub subscription, conduit and shard management.
///
/// Holds only immutable state; clones share the transport and settings and
/// can be used concurrently from any number of tasks.
///
/// # Example
///
/// ```no_run
/// use eventsub_client::{ClientSettings, HelixClient, RequestContext};
///
/// # async fn run() -> anyhow::Result<()> {
/// let client = HelixClient::with_reqwest(ClientSettings::load()?)?;
/// let conduit = client.create_conduit(&RequestContext::new(), 4).await?;
/// println!("created conduit {} with {} shards", conduit.id, conduit.shard_count);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct HelixClient {
    transport: Arc<dyn HelixTransport>,
    settings: Arc<ClientSettings>,
}

impl HelixClient {
    /// Creates a client over the given transport.
    pub fn new(transport: impl HelixTransport, settings: ClientSettings) -> Self {
        Self::from_arc(Arc::new(transport), settings)
    }

    /// Creates a client over a shared transport.
    pub fn from_arc(transport: Arc<dyn HelixTransport>, settings: ClientSettings) -> Self {
        Self { transport, settings: Arc::new(settings) }
    }

    /// Creates a client over a [`ReqwestTransport`] built from the settings.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::ConfigurationError` if the HTTP client cannot
    /// be built.
    pub fn with_reqwest(settings: ClientSettings) -> std::result::Result<Self, TransportError> {
        let transport = ReqwestTransport::new(settings.to_http_config())?;
        Ok(Self::new(transport, settings))
    }

    /// Settings this client was created with.
    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Sends a call and returns the raw response, whatever its status.
    pub(crate) async fn send(&self, ctx: &RequestContext, call: Call) -> Result<HelixResponse> {
        let credentials = ctx.resolve(&self.settings)?;
        let endpoint = call.endpoint;

        let method = Method::from_bytes(endpoint.method.as_bytes()).map_err(|e| {
            HelixError::transport(endpoint, TransportError::configuration(e.to_string()))
        })?;

        let request = HelixRequest {
            method,
            path: endpoint.path,
            api_version: ApiVersion::Helix,
            query: call.query,
            body: call.body,
            credentials,
        };

        self.transport.send(request).await.map_err(|e| HelixError::transport(endpoint, e))
    }

    /// Sends a call, rejects non-2xx statuses and decodes the JSON body.
    pub(crate) async fn execute_json<T: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        call: Call,
    ) -> Result<T> {
        let endpoint = call.endpoint;
        let response = self.send(ctx, call).await?;

        response
            .error_for_status()
            .and_then(|response| response.decode())
            .map_err(|e| HelixError::transport(endpoint, e))
    }
}

impl fmt::Debug for HelixClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HelixClient")
            .field("base_url", &self.settings.base_url)
            .field("client_id", &self.settings.client_id)
            .finish_non_exhaustive()
    }
}

/// One endpoint invocation before credentials are attached.
#[derive(Debug)]
pub(crate) struct Call {
    pub endpoint: Endpoint,
    pub query: Vec<(&'static str, String)>,
    pub body: Option<serde_json::Value>,
}

impl Call {
    pub fn new(endpoint: Endpoint) -> Self {
        Self { endpoint, query: Vec::new(), body: None }
    }

    pub fn query(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.query.push((key, value.into()));
        self
    }

    pub fn query_pairs(mut self, pairs: Vec<(&'static str, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    /// Adds `after=<cursor>` unless the cursor is absent or blank.
    pub fn after(self, cursor: Option<&str>) -> Self {
        match cursor.filter(|cursor| !cursor.trim().is_empty()) {
            Some(cursor) => self.query("after", cursor),
            None => self,
        }
    }

    pub fn json(mut self, body: &impl Serialize) -> Result<Self> {
        let value = serde_json::to_value(body).map_err(|e| {
            HelixError::transport(
                self.endpoint,
                TransportError::configuration(format!("failed to encode request body: {e}")),
            )
        })?;
        self.body = Some(value);
        Ok(self)
    }
}
