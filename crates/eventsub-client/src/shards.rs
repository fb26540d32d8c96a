//! Conduit shard operations.

use eventsub_core::{
    error::require, BatchResult, Page, Shard, ShardStatus, ShardUpdate, UpdateShardsRequest,
};

use crate::{
    client::{Call, HelixClient},
    context::RequestContext,
    error::{Endpoint, Result},
    wire::{DataResponse, UpdateShardsResponse},
};

const SHARDS: &str = "/eventsub/conduits/shards";

impl HelixClient {
    /// Fetches one page of a conduit's shards, optionally by status.
    pub async fn list_conduit_shards(
        &self,
        ctx: &RequestContext,
        conduit_id: &str,
        status: Option<ShardStatus>,
        cursor: Option<&str>,
    ) -> Result<Page<Shard>> {
        require("conduit_id", conduit_id)?;

        let mut call = Call::new(Endpoint::get(SHARDS)).query("conduit_id", conduit_id);
        if let Some(status) = status {
            call = call.query("status", status.as_str());
        }

        let response: DataResponse<Shard> = self.execute_json(ctx, call.after(cursor)).await?;
        let page = response.into_page();

        tracing::debug!(
            conduit_id,
            count = page.data.len(),
            has_next = page.has_next(),
            "Listed conduit shards"
        );

        Ok(page)
    }

    /// Assigns transports to a batch of shards.
    ///
    /// The whole batch is validated first; one bad shard aborts it before any
    /// request is made. After that the registry decides per shard: accepted
    /// shards are committed even when others fail, and nothing is retried.
    ///
    /// # Errors
    ///
    /// Validation and transport failures only. Per-shard rejections are
    /// reported in [`BatchResult::errored`].
    pub async fn update_conduit_shards(
        &self,
        ctx: &RequestContext,
        conduit_id: &str,
        updates: Vec<ShardUpdate>,
    ) -> Result<BatchResult> {
        let request = UpdateShardsRequest::new(conduit_id, updates)?;

        tracing::debug!(conduit_id, shards = request.shards().len(), "Updating conduit shards");

        let call = Call::new(Endpoint::patch(SHARDS)).json(&request)?;
        let response: UpdateShardsResponse = self.execute_json(ctx, call).await?;

        let result = BatchResult::reconcile(request.shard_ids(), response.data, response.errors);

        for error in &result.errored {
            tracing::warn!(
                conduit_id,
                shard_id = %error.id,
                code = %error.code,
                "Shard update rejected: {}",
                error.message
            );
        }
        tracing::info!(
            conduit_id,
            accepted = result.accepted.len(),
            errored = result.errored.len(),
            "Conduit shards updated"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use eventsub_core::{ShardTransport, ValidationError};
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
    async fn batch_body_matches_wire_shape() {
        let mock = MockTransport::new();
        mock.push_json(
            202,
            json!({
                "data": [{"id": "0", "status": "enabled",
                          "transport": {"method": "websocket", "session_id": "session-a"}}],
                "errors": []
            }),
        )
        .await;

        let result = client(&mock)
            .update_conduit_shards(
                &RequestContext::new(),
                "c-1",
                vec![ShardUpdate::new("0", ShardTransport::websocket("session-a"))],
            )
            .await
            .unwrap();
        assert!(result.is_complete());

        let sent = &mock.requests().await[0];
        assert_eq!(
            sent.body,
            Some(json!({
                "conduit_id": "c-1",
                "shards": [{"id": "0", "transport": {"method": "websocket", "session_id": "session-a"}}]
            }))
        );
    }

    #[tokio::test]
    async fn empty_batch_rejected_locally() {
        let mock = MockTransport::new();
        let error = client(&mock)
            .update_conduit_shards(&RequestContext::new(), "c-1", Vec::new())
            .await
            .unwrap_err();

        assert_eq!(error.as_validation(), Some(&ValidationError::EmptyBatch));
        assert_eq!(mock.request_count().await, 0);
    }

    #[tokio::test]
    async fn shard_listing_sends_status_filter() {
        let mock = MockTransport::new();
        mock.push_json(200, json!({"data": [{"id": "3", "status": "disabled"}], "pagination": {}}))
            .await;

        let page = client(&mock)
            .list_conduit_shards(&RequestContext::new(), "c-1", Some(ShardStatus::Disabled), None)
            .await
            .unwrap();
        assert_eq!(page.data[0].index(), Some(3));

        let sent = &mock.requests().await[0];
        assert_eq!(sent.query_param("conduit_id"), Some("c-1"));
        assert_eq!(sent.query_param("status"), Some("disabled"));
        assert_eq!(sent.query_param("after"), None);
    }
}
