//! Records owned by the remote registry.
//!
//! Subscriptions, conduits and shards as the registry reports them. The
//! client never mutates these; statuses in particular are observed, not set.
//!
//! ```text
//! Pending ──verified──▶ Enabled
//!    │                     │
//!    └──failed──▶ Revoked ◀┘ (revocation)
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{request::Condition, transport::TransportInfo};

/// Lifecycle phase of a subscription, derived from its registry status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionPhase {
    /// Waiting for callback verification.
    Pending,
    /// Delivering events.
    Enabled,
    /// Terminal; the subscription will eventually disappear from listings.
    Revoked,
}

impl SubscriptionPhase {
    /// Whether the registry may move a subscription from `self` to `next`.
    ///
    /// Staying in the same phase is always allowed; `Revoked` is terminal.
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, _)
                | (Self::Enabled, Self::Enabled | Self::Revoked)
                | (Self::Revoked, Self::Revoked)
        )
    }

    /// Whether no further transition can happen.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Revoked)
    }
}

/// Subscription status as reported by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Designates that the subscription is in an operable state and is valid.
    Enabled,
    /// Webhook is pending verification of the callback.
    WebhookCallbackVerificationPending,
    /// Webhook failed verification of the callback.
    WebhookCallbackVerificationFailed,
    /// Notification delivery failure rate was too high.
    NotificationFailuresExceeded,
    /// Authorization for the user(s) in the condition was revoked.
    AuthorizationRevoked,
    /// A moderator in the condition lost moderator privileges.
    ModeratorRemoved,
    /// A user in the condition was removed.
    UserRemoved,
    /// The subscription type or version is no longer supported.
    VersionRemoved,
    /// The subscription type was paused for maintenance.
    BetaMaintenance,
    /// The client closed the websocket connection.
    WebsocketDisconnected,
    /// The client failed to respond to a ping.
    WebsocketFailedPingPong,
    /// The client sent a non-pong message.
    WebsocketReceivedInboundTraffic,
    /// The client did not subscribe within the allowed time after connecting.
    WebsocketConnectionUnused,
    /// The registry closed the connection because of an internal error.
    WebsocketInternalError,
    /// The registry closed the connection because of a network timeout.
    WebsocketNetworkTimeout,
    /// The registry closed the connection because of a network error.
    WebsocketNetworkError,
    /// The client failed to reconnect after being asked to.
    WebsocketFailedToReconnect,
    /// The conduit the subscription delivered to was deleted.
    ConduitDeleted,
    /// A status this client does not know about.
    #[serde(other)]
    Unknown,
}

impl SubscriptionStatus {
    /// Lifecycle phase for this status.
    ///
    /// Unknown statuses count as revoked: the client cannot assume the
    /// subscription still delivers.
    pub const fn phase(&self) -> SubscriptionPhase {
        match self {
            Self::Enabled => SubscriptionPhase::Enabled,
            Self::WebhookCallbackVerificationPending => SubscriptionPhase::Pending,
            _ => SubscriptionPhase::Revoked,
        }
    }

    /// Wire name, usable as a listing filter.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Enabled => "enabled",
            Self::WebhookCallbackVerificationPending => "webhook_callback_verification_pending",
            Self::WebhookCallbackVerificationFailed => "webhook_callback_verification_failed",
            Self::NotificationFailuresExceeded => "notification_failures_exceeded",
            Self::AuthorizationRevoked => "authorization_revoked",
            Self::ModeratorRemoved => "moderator_removed",
            Self::UserRemoved => "user_removed",
            Self::VersionRemoved => "version_removed",
            Self::BetaMaintenance => "beta_maintenance",
            Self::WebsocketDisconnected => "websocket_disconnected",
            Self::WebsocketFailedPingPong => "websocket_failed_ping_pong",
            Self::WebsocketReceivedInboundTraffic => "websocket_received_inbound_traffic",
            Self::WebsocketConnectionUnused => "websocket_connection_unused",
            Self::WebsocketInternalError => "websocket_internal_error",
            Self::WebsocketNetworkTimeout => "websocket_network_timeout",
            Self::WebsocketNetworkError => "websocket_network_error",
            Self::WebsocketFailedToReconnect => "websocket_failed_to_reconnect",
            Self::ConduitDeleted => "conduit_deleted",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered interest in one event type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    /// Registry-assigned identifier, immutable once created.
    pub id: String,

    /// Current registry status.
    pub status: SubscriptionStatus,

    /// Event type, e.g. `channel.follow`.
    #[serde(rename = "type")]
    pub subscription_type: String,

    /// Version of the event type.
    pub version: String,

    /// Condition parameters the subscription was created with.
    pub condition: Condition,

    /// When the registry created the subscription.
    pub created_at: DateTime<Utc>,

    /// Transport events are delivered through.
    pub transport: TransportInfo,

    /// Cost counted against the client's subscription limit.
    #[serde(default)]
    pub cost: u32,
}

impl Subscription {
    /// Lifecycle phase of the subscription.
    pub const fn phase(&self) -> SubscriptionPhase {
        self.status.phase()
    }
}

/// Filter for subscription listings; unset fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionFilter {
    /// Only subscriptions with this status.
    pub status: Option<SubscriptionStatus>,
    /// Only subscriptions of this type.
    pub subscription_type: Option<String>,
    /// Only subscriptions whose condition references this user.
    pub user_id: Option<String>,
}

impl SubscriptionFilter {
    /// Filter by status.
    pub fn with_status(mut self, status: SubscriptionStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Filter by subscription type.
    pub fn with_type(mut self, subscription_type: impl Into<String>) -> Self {
        self.subscription_type = Some(subscription_type.into());
        self
    }

    /// Filter by user id.
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Query parameters for the set fields, in a stable order.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        if let Some(subscription_type) = non_blank(self.subscription_type.as_deref()) {
            pairs.push(("type", subscription_type.to_string()));
        }
        if let Some(user_id) = non_blank(self.user_id.as_deref()) {
            pairs.push(("user_id", user_id.to_string()));
        }
        pairs
    }
}

/// A capacity-bounded delivery endpoint owning a dense range of shards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conduit {
    /// Conduit identifier.
    pub id: String,
    /// Number of shards, in `(0, 20000]`.
    pub shard_count: u32,
}

/// Shard status as reported by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShardStatus {
    /// The shard is enabled.
    Enabled,
    /// The shard is disabled, e.g. its index is at or above the shard count
    /// or it was never assigned a transport.
    Disabled,
    /// The shard is pending verification of the specified callback URL.
    WebhookCallbackVerificationPending,
    /// The specified callback URL failed verification.
    WebhookCallbackVerificationFailed,
    /// The notification delivery failure rate was too high.
    NotificationFailuresExceeded,
    /// The client closed the connection.
    WebsocketDisconnected,
    /// The client failed to respond to a ping message.
    WebsocketFailedPingPong,
    /// The client sent a non-pong message.
    WebsocketReceivedInboundTraffic,
    /// The registry closed the connection because of an internal error.
    WebsocketInternalError,
    /// The registry closed the connection because of a network timeout.
    WebsocketNetworkTimeout,
    /// The registry closed the connection because of a network error.
    WebsocketNetworkError,
    /// The client failed to reconnect after being asked to.
    WebsocketFailedToReconnect,
    /// A status this client does not know about.
    #[serde(other)]
    Unknown,
}

impl ShardStatus {
    /// Whether the shard currently receives events.
    pub const fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled)
    }

    /// Wire name, usable as a listing filter.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Enabled => "enabled",
            Self::Disabled => "disabled",
            Self::WebhookCallbackVerificationPending => "webhook_callback_verification_pending",
            Self::WebhookCallbackVerificationFailed => "webhook_callback_verification_failed",
            Self::NotificationFailuresExceeded => "notification_failures_exceeded",
            Self::WebsocketDisconnected => "websocket_disconnected",
            Self::WebsocketFailedPingPong => "websocket_failed_ping_pong",
            Self::WebsocketReceivedInboundTraffic => "websocket_received_inbound_traffic",
            Self::WebsocketInternalError => "websocket_internal_error",
            Self::WebsocketNetworkTimeout => "websocket_network_timeout",
            Self::WebsocketNetworkError => "websocket_network_error",
            Self::WebsocketFailedToReconnect => "websocket_failed_to_reconnect",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ShardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One partition of a conduit, identified by its index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shard {
    /// Shard index as a decimal string.
    pub id: String,
    /// Current registry status.
    pub status: ShardStatus,
    /// Assigned transport; `None` for a slot that was never assigned.
    #[serde(default)]
    pub transport: Option<TransportInfo>,
}

impl Shard {
    /// Numeric shard index, if the id is a valid index.
    pub fn index(&self) -> Option<u32> {
        self.id.parse().ok()
    }
}

/// A shard the registry refused to update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardError {
    /// Shard index as a decimal string.
    pub id: String,
    /// Error code reported by the registry.
    pub code: String,
    /// Human readable reason.
    pub message: String,
}

/// One page of a cursor-paginated listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Items in registry order.
    pub data: Vec<T>,
    /// Opaque cursor for the next page; `None` on the last page.
    pub cursor: Option<String>,
}

impl<T> Page<T> {
    /// Whether another page follows.
    pub fn has_next(&self) -> bool {
        self.cursor.is_some()
    }
}

/// A page of subscriptions plus the client's subscription cost totals.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionPage {
    /// Subscriptions and next cursor.
    pub page: Page<Subscription>,
    /// Total number of subscriptions matching the filter.
    pub total: u32,
    /// Sum of the costs of all enabled subscriptions.
    pub total_cost: u32,
    /// Cost limit for the client.
    pub max_total_cost: u32,
}

/// Normalizes a cursor: blank cursors mean "no more pages".
pub fn normalize_cursor(cursor: Option<String>) -> Option<String> {
    cursor.filter(|cursor| !cursor.trim().is_empty())
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.trim().is_empty())
}
