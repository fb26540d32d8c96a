//! Validated request payloads for subscription creation.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    error::{require, Result, ValidationError},
    transport::Transport,
};

/// Subscription condition: parameter values specific to a subscription type.
pub type Condition = BTreeMap<String, String>;

/// Serialization-ready body for `POST /eventsub/subscriptions`.
///
/// Can only be obtained through [`CreateSubscriptionRequest::new`], so every
/// value of this type has passed validation. Fields are read-only.
///
/// # Example
///
/// ```
/// use eventsub_core::{request::CreateSubscriptionRequest, transport::Transport};
///
/// let request = CreateSubscriptionRequest::new(
///     "channel.follow",
///     "2",
///     [("broadcaster_user_id", "1337"), ("moderator_user_id", "1337")],
///     Transport::websocket("AQoQexAWVYKSTIu4ec_2VAxyuhAB"),
/// )
/// .expect("valid request");
///
/// assert_eq!(request.subscription_type(), "channel.follow");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateSubscriptionRequest {
    #[serde(rename = "type")]
    subscription_type: String,
    version: String,
    condition: Condition,
    transport: Transport,
}

impl CreateSubscriptionRequest {
    /// Builds and validates a subscription request.
    ///
    /// Checks run in order: type, version, condition, then transport.
    ///
    /// # Errors
    ///
    /// Returns the first `ValidationError` found. No request exists on
    /// failure, so nothing can be sent.
    pub fn new<I, K, V>(
        subscription_type: impl Into<String>,
        version: impl Into<String>,
        condition: I,
        transport: Transport,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let subscription_type = subscription_type.into();
        let version = version.into();
        let condition: Condition =
            condition.into_iter().map(|(key, value)| (key.into(), value.into())).collect();

        require("type", &subscription_type)?;
        require("version", &version)?;
        if condition.is_empty() {
            return Err(ValidationError::missing("condition"));
        }
        transport.validate()?;

        Ok(Self { subscription_type, version, condition, transport })
    }

    /// Subscription type, e.g. `channel.follow`.
    pub fn subscription_type(&self) -> &str {
        &self.subscription_type
    }

    /// Version of the subscription type.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Condition parameters.
    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    /// Transport the subscription will deliver through.
    pub fn transport(&self) -> &Transport {
        &self.transport
    }
}
