//! Test data builders and fixtures.
//!
//! Builders produce the JSON the registry would send, so the same values
//! can feed a [`MockTransport`](eventsub_client::transport::mock::MockTransport),
//! a wiremock server or a direct deserialization.

use std::ops::Range;

use chrono::{DateTime, Utc};
use eventsub_client::ClientSettings;
use eventsub_core::{ShardStatus, ShardTransport, ShardUpdate, Subscription, SubscriptionStatus};
use serde_json::{json, Value};

/// Client id used by every fixture.
pub const TEST_CLIENT_ID: &str = "test-client-id";

/// Access token used by every fixture.
pub const TEST_ACCESS_TOKEN: &str = "test-access-token-0123";

/// Webhook secret within the accepted length bounds.
pub const TEST_SECRET: &str = "fixture-secret-0123456789";

/// Settings with test credentials and the default base URL.
pub fn test_settings() -> ClientSettings {
    ClientSettings {
        client_id: Some(TEST_CLIENT_ID.to_string()),
        access_token: Some(TEST_ACCESS_TOKEN.to_string()),
        ..ClientSettings::default()
    }
}

/// Settings with test credentials pointing at `base_url`.
pub fn test_settings_for(base_url: impl Into<String>) -> ClientSettings {
    ClientSettings { base_url: base_url.into(), ..test_settings() }
}

/// Builder for subscription records.
pub struct SubscriptionBuilder {
    id: String,
    status: SubscriptionStatus,
    subscription_type: String,
    version: String,
    condition: Value,
    transport: Value,
    created_at: DateTime<Utc>,
    cost: u32,
}

impl SubscriptionBuilder {
    /// An enabled `channel.follow` websocket subscription.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: SubscriptionStatus::Enabled,
            subscription_type: "channel.follow".to_string(),
            version: "2".to_string(),
            condition: json!({"broadcaster_user_id": "1234", "moderator_user_id": "1234"}),
            transport: json!({"method": "websocket", "session_id": "session-fixture"}),
            created_at: Utc::now(),
            cost: 0,
        }
    }

    /// Sets the status.
    #[must_use]
    pub fn status(mut self, status: SubscriptionStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets type and version.
    #[must_use]
    pub fn kind(mut self, subscription_type: impl Into<String>, version: impl Into<String>) -> Self {
        self.subscription_type = subscription_type.into();
        self.version = version.into();
        self
    }

    /// Reports a webhook transport and a cost of one.
    #[must_use]
    pub fn webhook(mut self, callback: &str) -> Self {
        self.transport = json!({"method": "webhook", "callback": callback});
        self.cost = 1;
        self
    }

    /// Reports a conduit transport.
    #[must_use]
    pub fn conduit(mut self, conduit_id: &str) -> Self {
        self.transport = json!({"method": "conduit", "conduit_id": conduit_id});
        self
    }

    /// JSON as sent by the registry.
    pub fn json(&self) -> Value {
        json!({
            "id": self.id,
            "status": self.status.as_str(),
            "type": self.subscription_type,
            "version": self.version,
            "condition": self.condition,
            "created_at": self.created_at.to_rfc3339(),
            "transport": self.transport,
            "cost": self.cost,
        })
    }

    /// Typed record.
    pub fn build(&self) -> Subscription {
        serde_json::from_value(self.json()).expect("fixture subscription should deserialize")
    }
}

/// `GET /eventsub/subscriptions` body for one page.
pub fn subscriptions_page(subscriptions: &[SubscriptionBuilder], cursor: Option<&str>) -> Value {
    let data: Vec<Value> = subscriptions.iter().map(SubscriptionBuilder::json).collect();
    let total_cost: u32 = subscriptions.iter().map(|subscription| subscription.cost).sum();
    json!({
        "data": data,
        "total": data.len(),
        "total_cost": total_cost,
        "max_total_cost": 10000,
        "pagination": pagination(cursor),
    })
}

/// Shard record JSON.
pub fn shard_json(id: u32, status: ShardStatus) -> Value {
    json!({"id": id.to_string(), "status": status.as_str()})
}

/// Shard record JSON with a websocket transport.
pub fn websocket_shard_json(id: u32, session_id: &str) -> Value {
    json!({
        "id": id.to_string(),
        "status": "enabled",
        "transport": {"method": "websocket", "session_id": session_id}
    })
}

/// Per-shard error JSON as found in `errors` of a shard update response.
pub fn shard_error_json(id: u32, code: &str, message: &str) -> Value {
    json!({"id": id.to_string(), "code": code, "message": message})
}

/// `GET /eventsub/conduits/shards` body for one page.
pub fn shards_page(shards: Vec<Value>, cursor: Option<&str>) -> Value {
    json!({"data": shards, "pagination": pagination(cursor)})
}

/// Websocket assignments for a range of shard indices, one session each.
pub fn websocket_updates(ids: Range<u32>) -> Vec<ShardUpdate> {
    ids.map(|id| {
        ShardUpdate::new(id.to_string(), ShardTransport::websocket(format!("session-{id}")))
    })
    .collect()
}

/// Webhook assignment for one shard using [`TEST_SECRET`].
pub fn webhook_update(id: u32) -> ShardUpdate {
    ShardUpdate::new(
        id.to_string(),
        ShardTransport::webhook(format!("https://example.com/eventsub/{id}"), TEST_SECRET),
    )
}

fn pagination(cursor: Option<&str>) -> Value {
    match cursor {
        Some(cursor) => json!({"cursor": cursor}),
        None => json!({}),
    }
}

#[cfg(test)]
mod tests {
    use eventsub_core::{SubscriptionPhase, TransportMethod};

    use super::*;

    #[test]
    fn subscription_fixture_deserializes() {
        let subscription = SubscriptionBuilder::new("sub-1")
            .status(SubscriptionStatus::WebhookCallbackVerificationPending)
            .webhook("https://example.com/eventsub")
            .build();

        assert_eq!(subscription.phase(), SubscriptionPhase::Pending);
        assert_eq!(subscription.transport.method(), TransportMethod::Webhook);
        assert_eq!(subscription.cost, 1);
    }

    #[test]
    fn updates_cover_range() {
        let updates = websocket_updates(3..6);
        let ids: Vec<_> = updates.iter().map(|update| update.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "4", "5"]);
        assert!(updates.iter().all(|update| update.validate().is_ok()));
        assert!(webhook_update(0).validate().is_ok());
    }
}
