//! Boundary tests for transport and request validation.

#![allow(clippy::unwrap_used)]

use eventsub_core::{
    CreateSubscriptionRequest, ShardTransport, ShardUpdate, Transport, UpdateShardsRequest,
    ValidationError,
};
use serde_json::json;

fn secret(length: usize) -> String {
    "s".repeat(length)
}

#[test]
fn webhook_secret_boundaries() {
    let callback = "https://example.com/eventsub";

    assert!(Transport::webhook(callback, secret(10)).validate().is_ok());
    assert!(Transport::webhook(callback, secret(100)).validate().is_ok());

    assert_eq!(
        Transport::webhook(callback, secret(9)).validate(),
        Err(ValidationError::SecretLength { length: 9 })
    );
    assert_eq!(
        Transport::webhook(callback, secret(101)).validate(),
        Err(ValidationError::SecretLength { length: 101 })
    );
}

#[test]
fn webhook_requires_callback() {
    let error = Transport::webhook("", secret(20)).validate().unwrap_err();
    assert_eq!(error, ValidationError::missing("transport.callback"));
}

#[test]
fn request_builder_never_yields_invalid_transport() {
    let result = CreateSubscriptionRequest::new(
        "channel.follow",
        "2",
        [("broadcaster_user_id", "1")],
        Transport::websocket(""),
    );
    assert_eq!(result.unwrap_err().field(), "transport.session_id");
}

#[test]
fn shard_batch_parsed_with_mixed_case_methods() {
    let shards: Vec<ShardUpdate> = serde_json::from_value(json!([
        {"id": "0", "transport": {"method": "WebSocket", "session_id": "session-a"}},
        {"id": "1", "transport": {"method": "WEBHOOK", "callback": "https://example.com"}}
    ]))
    .unwrap();

    assert_eq!(shards[0].transport, ShardTransport::websocket("session-a"));
    assert_eq!(shards[1].transport, ShardTransport::webhook_without_secret("https://example.com"));

    let request = UpdateShardsRequest::new("conduit-1", shards).unwrap();
    let body = serde_json::to_value(&request).unwrap();
    assert_eq!(body["shards"][0]["transport"]["method"], "websocket");
    assert_eq!(
        body["shards"][1]["transport"],
        json!({"method": "webhook", "callback": "https://example.com"})
    );
}

#[test]
fn shard_webhook_secret_optional_but_bounded() {
    let callback = "https://example.com";

    let unsigned = vec![ShardUpdate::new("0", ShardTransport::webhook_without_secret(callback))];
    assert!(UpdateShardsRequest::new("conduit-1", unsigned).is_ok());

    let short = vec![ShardUpdate::new("0", ShardTransport::webhook(callback, secret(9)))];
    let error = UpdateShardsRequest::new("conduit-1", short).unwrap_err();
    assert_eq!(error, ValidationError::in_shard("0", ValidationError::SecretLength { length: 9 }));
    assert_eq!(error.field(), "shards.transport.secret");
}

#[test]
fn conduit_transport_cannot_become_shard_transport() {
    let error = ShardTransport::try_from(Transport::conduit("other-conduit")).unwrap_err();
    assert_eq!(error.field(), "transport.method");
}

#[test]
fn update_request_preserves_order() {
    let shards: Vec<ShardUpdate> = ["4", "1", "3"]
        .into_iter()
        .map(|id| ShardUpdate::new(id, ShardTransport::webhook("https://example.com", secret(32))))
        .collect();

    let request = UpdateShardsRequest::new("conduit-1", shards).unwrap();
    assert_eq!(request.shard_ids().collect::<Vec<_>>(), vec!["4", "1", "3"]);
    assert_eq!(request.conduit_id(), "conduit-1");
}
