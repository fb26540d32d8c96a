//! Conduit operations.
//!
//! Shard counts are checked locally before any request is made. When a
//! conduit shrinks, the registry disables every shard at or above the new
//! count; this client does not emulate that.

use eventsub_core::{error::require, Conduit, CreateConduitRequest, UpdateConduitRequest};

use crate::{
    client::{Call, HelixClient},
    context::RequestContext,
    error::{Endpoint, HelixError, Result, TransportError},
    wire::DataResponse,
};

const CONDUITS: &str = "/eventsub/conduits";

impl HelixClient {
    /// Creates a conduit with `shard_count` shards.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::ShardCountOutOfRange` without contacting the
    /// registry unless `0 < shard_count <= 20000`.
    pub async fn create_conduit(&self, ctx: &RequestContext, shard_count: u32) -> Result<Conduit> {
        let request = CreateConduitRequest::new(shard_count)?;
        let endpoint = Endpoint::post(CONDUITS);

        tracing::debug!(shard_count, "Creating conduit");

        let call = Call::new(endpoint).json(&request)?;
        let conduit = first_conduit(endpoint, self.execute_json(ctx, call).await?)?;

        tracing::info!(conduit_id = %conduit.id, shard_count = conduit.shard_count, "Conduit created");
        Ok(conduit)
    }

    /// Changes the shard count of a conduit.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank id or an out-of-range count.
    pub async fn update_conduit(
        &self,
        ctx: &RequestContext,
        id: &str,
        shard_count: u32,
    ) -> Result<Conduit> {
        let request = UpdateConduitRequest::new(id, shard_count)?;
        let endpoint = Endpoint::patch(CONDUITS);

        tracing::debug!(conduit_id = id, shard_count, "Updating conduit");

        let call = Call::new(endpoint).json(&request)?;
        let conduit = first_conduit(endpoint, self.execute_json(ctx, call).await?)?;

        tracing::info!(conduit_id = %conduit.id, shard_count = conduit.shard_count, "Conduit updated");
        Ok(conduit)
    }

    /// Lists every conduit owned by the client id.
    pub async fn list_conduits(&self, ctx: &RequestContext) -> Result<Vec<Conduit>> {
        let response: DataResponse<Conduit> =
            self.execute_json(ctx, Call::new(Endpoint::get(CONDUITS))).await?;

        tracing::debug!(count = response.data.len(), "Listed conduits");
        Ok(response.data)
    }

    /// Deletes a conduit.
    ///
    /// Returns `true` only when the registry answers 204.
    pub async fn delete_conduit(&self, ctx: &RequestContext, id: &str) -> Result<bool> {
        require("id", id)?;

        let call = Call::new(Endpoint::delete(CONDUITS)).query("id", id);
        let response = self.send(ctx, call).await?;

        if response.status == 204 {
            tracing::info!(conduit_id = id, "Conduit deleted");
            Ok(true)
        } else {
            tracing::warn!(conduit_id = id, status = response.status, "Conduit delete not acknowledged");
            Ok(false)
        }
    }
}

fn first_conduit(endpoint: Endpoint, response: DataResponse<Conduit>) -> Result<Conduit> {
    response.data.into_iter().next().ok_or_else(|| {
        HelixError::transport(endpoint, TransportError::decode("response contained no conduit"))
    })
}

#[cfg(test)]
mod tests {
    use eventsub_core::ValidationError;
    use serde_json::json;

    use super::*;
    use crate::{config::ClientSettings, transport::mock::MockTransport};

    fn client(mock: &MockTransport) -> HelixClient {
        let settings = ClientSettings {
            client_id: Some("client".to_string()),
            access_token: Some("token-abcdefgh".to_string()),
            ..ClientSettings::default()
        };
        HelixClient::new(mock.clone(), settings)
    }

    #[tokio::test]
    async fn create_sends_shard_count() {
        let mock = MockTransport::new();
        mock.push_json(200, json!({"data": [{"id": "c-1", "shard_count": 5}]})).await;

        let conduit = client(&mock).create_conduit(&RequestContext::new(), 5).await.unwrap();
        assert_eq!(conduit, Conduit { id: "c-1".to_string(), shard_count: 5 });

        let sent = &mock.requests().await[0];
        assert_eq!(sent.body, Some(json!({"shard_count": 5})));
    }

    #[tokio::test]
    async fn update_sends_id_and_count() {
        let mock = MockTransport::new();
        mock.push_json(200, json!({"data": [{"id": "c-1", "shard_count": 2}]})).await;

        client(&mock).update_conduit(&RequestContext::new(), "c-1", 2).await.unwrap();

        let sent = &mock.requests().await[0];
        assert_eq!(sent.method, reqwest::Method::PATCH);
        assert_eq!(sent.body, Some(json!({"id": "c-1", "shard_count": 2})));
    }

    #[tokio::test]
    async fn update_blank_id_rejected() {
        let mock = MockTransport::new();
        let error = client(&mock).update_conduit(&RequestContext::new(), "", 2).await.unwrap_err();

        assert_eq!(error.as_validation(), Some(&ValidationError::missing("id")));
        assert_eq!(mock.request_count().await, 0);
    }

    #[tokio::test]
    async fn registry_error_surfaces_with_endpoint() {
        let mock = MockTransport::new();
        mock.push_json(400, json!({"error": "Bad Request", "status": 400, "message": "too many conduits"}))
            .await;

        let error = client(&mock).create_conduit(&RequestContext::new(), 1).await.unwrap_err();
        assert_eq!(
            error.to_string(),
            "POST /eventsub/conduits failed: client error: HTTP 400: too many conduits"
        );
    }

    #[tokio::test]
    async fn delete_conduit_contract() {
        let mock = MockTransport::new();
        mock.push_status(204).await;
        mock.push_status(404).await;
        let client = client(&mock);

        assert!(client.delete_conduit(&RequestContext::new(), "c-1").await.unwrap());
        assert!(!client.delete_conduit(&RequestContext::new(), "c-1").await.unwrap());
    }
}
