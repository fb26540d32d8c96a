//! Transport descriptors for subscriptions and conduit shards.
//!
//! A transport says how events reach the caller: a webhook callback, a
//! websocket session, or a conduit. The request-side [`Transport`] and
//! [`ShardTransport`] are tagged unions so a descriptor can never mix fields
//! of two methods; their `method` tag is read case-insensitively. The
//! response-side [`TransportInfo`] is what the registry reports back, which
//! never includes the webhook secret.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{check_secret, require, Result, ValidationError};

const SHARD_METHODS: &str = "webhook, websocket";

/// Delivery method of a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMethod {
    /// HTTPS callback signed with a shared secret.
    Webhook,
    /// Websocket session.
    Websocket,
    /// Conduit that fans events out to its shards.
    Conduit,
}

impl TransportMethod {
    /// Canonical lowercase wire name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Webhook => "webhook",
            Self::Websocket => "websocket",
            Self::Conduit => "conduit",
        }
    }
}

impl fmt::Display for TransportMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportMethod {
    type Err = ValidationError;

    /// Parses a method name case-insensitively.
    fn from_str(s: &str) -> Result<Self> {
        let method = s.trim().to_ascii_lowercase();
        match method.as_str() {
            "webhook" => Ok(Self::Webhook),
            "websocket" => Ok(Self::Websocket),
            "conduit" => Ok(Self::Conduit),
            _ => Err(ValidationError::UnsupportedMethod {
                method,
                valid: "webhook, websocket, conduit",
            }),
        }
    }
}

/// Request-side transport descriptor.
///
/// Serializes to the nested `transport` object of a request: the `method`
/// discriminator followed by the fields of the active variant only.
///
/// # Example
///
/// ```
/// use eventsub_core::transport::Transport;
///
/// let transport = Transport::websocket("AQoQexAWVYKSTIu4ec_2VAxyuhAB");
/// assert!(transport.validate().is_ok());
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase", try_from = "RawTransport")]
pub enum Transport {
    /// Deliver to an HTTPS callback.
    Webhook {
        /// Callback URL receiving notifications.
        callback: String,
        /// Secret used to sign notifications, 10 to 100 characters.
        secret: String,
    },
    /// Deliver over an open websocket session.
    Websocket {
        /// Session identifier from the websocket welcome message.
        session_id: String,
    },
    /// Deliver through a conduit.
    Conduit {
        /// Identifier of the target conduit.
        conduit_id: String,
    },
}

impl Transport {
    /// Creates a webhook transport.
    pub fn webhook(callback: impl Into<String>, secret: impl Into<String>) -> Self {
        Self::Webhook { callback: callback.into(), secret: secret.into() }
    }

    /// Creates a websocket transport.
    pub fn websocket(session_id: impl Into<String>) -> Self {
        Self::Websocket { session_id: session_id.into() }
    }

    /// Creates a conduit transport.
    pub fn conduit(conduit_id: impl Into<String>) -> Self {
        Self::Conduit { conduit_id: conduit_id.into() }
    }

    /// Method of the active variant.
    pub const fn method(&self) -> TransportMethod {
        match self {
            Self::Webhook { .. } => TransportMethod::Webhook,
            Self::Websocket { .. } => TransportMethod::Websocket,
            Self::Conduit { .. } => TransportMethod::Conduit,
        }
    }

    /// Validates the fields of the active variant.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::MissingField` for a blank callback, session
    /// or conduit id, and `ValidationError::SecretLength` for a webhook
    /// secret outside `[10, 100]` characters.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Webhook { callback, secret } => {
                require("transport.callback", callback)?;
                check_secret(secret)
            },
            Self::Websocket { session_id } => require("transport.session_id", session_id),
            Self::Conduit { conduit_id } => require("transport.conduit_id", conduit_id),
        }
    }
}

// Hand-written so webhook secrets never reach logs.
impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Webhook { callback, .. } => f
                .debug_struct("Webhook")
                .field("callback", callback)
                .field("secret", &"***")
                .finish(),
            Self::Websocket { session_id } => {
                f.debug_struct("Websocket").field("session_id", session_id).finish()
            },
            Self::Conduit { conduit_id } => {
                f.debug_struct("Conduit").field("conduit_id", conduit_id).finish()
            },
        }
    }
}

/// Transport assignable to a conduit shard.
///
/// Shards already belong to a conduit, so only webhook and websocket exist
/// here. Unlike [`Transport`], the webhook secret is optional and only
/// checked when present.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase", try_from = "RawTransport")]
pub enum ShardTransport {
    /// Deliver to an HTTPS callback.
    Webhook {
        /// Callback URL receiving notifications.
        callback: String,
        /// Secret used to sign notifications, 10 to 100 characters when set.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        secret: Option<String>,
    },
    /// Deliver over an open websocket session.
    Websocket {
        /// Session identifier from the websocket welcome message.
        session_id: String,
    },
}

impl ShardTransport {
    /// Creates a signed webhook transport.
    pub fn webhook(callback: impl Into<String>, secret: impl Into<String>) -> Self {
        Self::Webhook { callback: callback.into(), secret: Some(secret.into()) }
    }

    /// Creates a webhook transport that sends no secret.
    pub fn webhook_without_secret(callback: impl Into<String>) -> Self {
        Self::Webhook { callback: callback.into(), secret: None }
    }

    /// Creates a websocket transport.
    pub fn websocket(session_id: impl Into<String>) -> Self {
        Self::Websocket { session_id: session_id.into() }
    }

    /// Method of the active variant.
    pub const fn method(&self) -> TransportMethod {
        match self {
            Self::Webhook { .. } => TransportMethod::Webhook,
            Self::Websocket { .. } => TransportMethod::Websocket,
        }
    }

    /// Validates the fields of the active variant.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::MissingField` for a blank callback or
    /// session, and `ValidationError::SecretLength` for a secret that is set
    /// but outside `[10, 100]` characters.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Webhook { callback, secret } => {
                require("transport.callback", callback)?;
                secret.as_deref().map_or(Ok(()), check_secret)
            },
            Self::Websocket { session_id } => require("transport.session_id", session_id),
        }
    }
}

impl TryFrom<Transport> for ShardTransport {
    type Error = ValidationError;

    fn try_from(transport: Transport) -> Result<Self> {
        match transport {
            Transport::Webhook { callback, secret } => {
                Ok(Self::Webhook { callback, secret: Some(secret) })
            },
            Transport::Websocket { session_id } => Ok(Self::Websocket { session_id }),
            Transport::Conduit { .. } => Err(unsupported_for_shards(TransportMethod::Conduit)),
        }
    }
}

impl fmt::Debug for ShardTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Webhook { callback, secret } => f
                .debug_struct("Webhook")
                .field("callback", callback)
                .field("secret", &secret.as_ref().map(|_| "***"))
                .finish(),
            Self::Websocket { session_id } => {
                f.debug_struct("Websocket").field("session_id", session_id).finish()
            },
        }
    }
}

fn unsupported_for_shards(method: TransportMethod) -> ValidationError {
    ValidationError::UnsupportedMethod { method: method.to_string(), valid: SHARD_METHODS }
}

/// Wire shape shared by the request-side transports before the method is known.
#[derive(Deserialize)]
struct RawTransport {
    method: String,
    callback: Option<String>,
    secret: Option<String>,
    session_id: Option<String>,
    conduit_id: Option<String>,
}

impl RawTransport {
    fn field(value: Option<String>, name: &'static str) -> Result<String> {
        value.ok_or(ValidationError::missing(name))
    }
}

impl TryFrom<RawTransport> for Transport {
    type Error = ValidationError;

    fn try_from(raw: RawTransport) -> Result<Self> {
        match raw.method.parse::<TransportMethod>()? {
            TransportMethod::Webhook => Ok(Self::Webhook {
                callback: RawTransport::field(raw.callback, "transport.callback")?,
                secret: RawTransport::field(raw.secret, "transport.secret")?,
            }),
            TransportMethod::Websocket => Ok(Self::Websocket {
                session_id: RawTransport::field(raw.session_id, "transport.session_id")?,
            }),
            TransportMethod::Conduit => Ok(Self::Conduit {
                conduit_id: RawTransport::field(raw.conduit_id, "transport.conduit_id")?,
            }),
        }
    }
}

impl TryFrom<RawTransport> for ShardTransport {
    type Error = ValidationError;

    fn try_from(raw: RawTransport) -> Result<Self> {
        match raw.method.parse::<TransportMethod>()? {
            TransportMethod::Webhook => Ok(Self::Webhook {
                callback: RawTransport::field(raw.callback, "transport.callback")?,
                secret: raw.secret,
            }),
            TransportMethod::Websocket => Ok(Self::Websocket {
                session_id: RawTransport::field(raw.session_id, "transport.session_id")?,
            }),
            method @ TransportMethod::Conduit => Err(unsupported_for_shards(method)),
        }
    }
}

/// Transport as reported by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum TransportInfo {
    /// Webhook callback; the secret is never echoed.
    Webhook {
        /// Callback URL receiving notifications.
        callback: String,
    },
    /// Websocket session.
    Websocket {
        /// Session identifier.
        session_id: String,
        /// When the session connected.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        connected_at: Option<DateTime<Utc>>,
        /// When the session disconnected, if it has.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        disconnected_at: Option<DateTime<Utc>>,
    },
    /// Conduit.
    Conduit {
        /// Conduit identifier.
        conduit_id: String,
    },
}

impl TransportInfo {
    /// Method of the reported transport.
    pub const fn method(&self) -> TransportMethod {
        match self {
            Self::Webhook { .. } => TransportMethod::Webhook,
            Self::Websocket { .. } => TransportMethod::Websocket,
            Self::Conduit { .. } => TransportMethod::Conduit,
        }
    }
}

impl From<&Transport> for TransportInfo {
    fn from(transport: &Transport) -> Self {
        match transport {
            Transport::Webhook { callback, .. } => Self::Webhook { callback: callback.clone() },
            Transport::Websocket { session_id } => Self::Websocket {
                session_id: session_id.clone(),
                connected_at: None,
                disconnected_at: None,
            },
            Transport::Conduit { conduit_id } => Self::Conduit { conduit_id: conduit_id.clone() },
        }
    }
}

impl From<&ShardTransport> for TransportInfo {
    fn from(transport: &ShardTransport) -> Self {
        match transport {
            ShardTransport::Webhook { callback, .. } => {
                Self::Webhook { callback: callback.clone() }
            },
            ShardTransport::Websocket { session_id } => Self::Websocket {
                session_id: session_id.clone(),
                connected_at: None,
                disconnected_at: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn method_parsing_is_case_insensitive() {
        assert_eq!("WebHook".parse::<TransportMethod>().unwrap(), TransportMethod::Webhook);
        assert_eq!(" WEBSOCKET ".parse::<TransportMethod>().unwrap(), TransportMethod::Websocket);
        assert_eq!("conduit".parse::<TransportMethod>().unwrap(), TransportMethod::Conduit);

        let error = "Carrier-Pigeon".parse::<TransportMethod>().unwrap_err();
        assert_eq!(error.field(), "transport.method");
        assert!(error.to_string().contains("carrier-pigeon"));
    }

    #[test]
    fn serializes_only_active_variant_fields() {
        let webhook = serde_json::to_value(Transport::webhook("https://example.com/cb", "s3cr3t-value"))
            .unwrap();
        assert_eq!(
            webhook,
            json!({"method": "webhook", "callback": "https://example.com/cb", "secret": "s3cr3t-value"})
        );

        let websocket = serde_json::to_value(Transport::websocket("session-1")).unwrap();
        assert_eq!(websocket, json!({"method": "websocket", "session_id": "session-1"}));

        let conduit = serde_json::to_value(Transport::conduit("conduit-1")).unwrap();
        assert_eq!(conduit, json!({"method": "conduit", "conduit_id": "conduit-1"}));
    }

    #[test]
    fn blank_fields_rejected_per_variant() {
        let error = Transport::webhook(" ", "0123456789").validate().unwrap_err();
        assert_eq!(error.field(), "transport.callback");

        let error = Transport::websocket("").validate().unwrap_err();
        assert_eq!(error.field(), "transport.session_id");

        let error = Transport::conduit("").validate().unwrap_err();
        assert_eq!(error.field(), "transport.conduit_id");
    }

    #[test]
    fn method_tag_read_case_insensitively() {
        let transport: Transport = serde_json::from_value(json!({
            "method": "WebHook",
            "callback": "https://example.com/cb",
            "secret": "s3cr3t-value"
        }))
        .unwrap();
        assert_eq!(transport, Transport::webhook("https://example.com/cb", "s3cr3t-value"));

        let shard: ShardTransport =
            serde_json::from_value(json!({"method": "WEBSOCKET", "session_id": "session-1"}))
                .unwrap();
        assert_eq!(shard, ShardTransport::websocket("session-1"));

        // Serialization always writes the canonical lowercase name
        assert_eq!(serde_json::to_value(&shard).unwrap()["method"], "websocket");
    }

    #[test]
    fn unknown_or_conduit_method_rejected_for_shards() {
        let error = serde_json::from_value::<ShardTransport>(
            json!({"method": "Conduit", "conduit_id": "c"}),
        )
        .unwrap_err();
        assert!(error.to_string().contains("unsupported transport method `conduit`"));

        assert!(serde_json::from_value::<Transport>(json!({"method": "pigeon"})).is_err());

        let error = ShardTransport::try_from(Transport::conduit("c")).unwrap_err();
        assert_eq!(error.field(), "transport.method");
    }

    #[test]
    fn shard_webhook_secret_checked_only_when_present() {
        let unsigned = ShardTransport::webhook_without_secret("https://example.com/cb");
        assert!(unsigned.validate().is_ok());
        assert_eq!(
            serde_json::to_value(&unsigned).unwrap(),
            json!({"method": "webhook", "callback": "https://example.com/cb"})
        );

        assert_eq!(
            ShardTransport::webhook("https://example.com/cb", "s".repeat(9)).validate(),
            Err(ValidationError::SecretLength { length: 9 })
        );
        let ten = ShardTransport::webhook("https://example.com/cb", "s".repeat(10));
        assert!(ten.validate().is_ok());

        let raw = json!({"method": "webhook", "callback": "https://example.com/cb"});
        let parsed: ShardTransport = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed, unsigned);
    }

    #[test]
    fn debug_output_masks_secret() {
        let debug = format!("{:?}", Transport::webhook("https://example.com/cb", "super-secret-value"));
        assert!(!debug.contains("super-secret-value"));
        assert!(debug.contains("***"));
    }

    #[test]
    fn reported_websocket_transport_parses_timestamps() {
        let info: TransportInfo = serde_json::from_value(json!({
            "method": "websocket",
            "session_id": "session-1",
            "connected_at": "2023-04-11T10:11:12.123Z"
        }))
        .unwrap();

        match info {
            TransportInfo::Websocket { session_id, connected_at, disconnected_at } => {
                assert_eq!(session_id, "session-1");
                assert!(connected_at.is_some());
                assert!(disconnected_at.is_none());
            },
            other => panic!("unexpected transport {other:?}"),
        }
    }
}
