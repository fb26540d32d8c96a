//! Subscription registry operations.

use eventsub_core::{
    error::require, CreateSubscriptionRequest, Subscription, SubscriptionFilter, SubscriptionPage,
};

use crate::{
    client::{Call, HelixClient},
    context::RequestContext,
    error::{Endpoint, HelixError, Result, TransportError},
    wire::{DataResponse, SubscriptionsResponse},
};

const SUBSCRIPTIONS: &str = "/eventsub/subscriptions";

impl HelixClient {
    /// Registers a subscription.
    ///
    /// The request was validated when it was built, so every call reaches
    /// the registry. A new subscription usually starts as pending and moves
    /// to enabled or revoked on the registry's side.
    ///
    /// # Errors
    ///
    /// Returns `HelixError::Transport` when the registry rejects the request
    /// or cannot be reached.
    pub async fn create_subscription(
        &self,
        ctx: &RequestContext,
        request: &CreateSubscriptionRequest,
    ) -> Result<Subscription> {
        let endpoint = Endpoint::post(SUBSCRIPTIONS);

        tracing::debug!(
            subscription_type = request.subscription_type(),
            version = request.version(),
            method = %request.transport().method(),
            "Creating subscription"
        );

        let call = Call::new(endpoint).json(request)?;
        let response: DataResponse<Subscription> = self.execute_json(ctx, call).await?;

        let subscription = response.data.into_iter().next().ok_or_else(|| {
            HelixError::transport(endpoint, TransportError::decode("response contained no subscription"))
        })?;

        tracing::info!(
            subscription_id = %subscription.id,
            status = %subscription.status,
            cost = subscription.cost,
            "Subscription created"
        );

        Ok(subscription)
    }

    /// Fetches one page of subscriptions.
    ///
    /// `cursor` is the opaque value from a previous page; `None` or a blank
    /// cursor starts from the beginning.
    pub async fn list_subscriptions(
        &self,
        ctx: &RequestContext,
        filter: &SubscriptionFilter,
        cursor: Option<&str>,
    ) -> Result<SubscriptionPage> {
        let call = Call::new(Endpoint::get(SUBSCRIPTIONS))
            .query_pairs(filter.query_pairs())
            .after(cursor);

        let response: SubscriptionsResponse = self.execute_json(ctx, call).await?;
        let page = SubscriptionPage::from(response);

        tracing::debug!(
            count = page.page.data.len(),
            total = page.total,
            has_next = page.page.has_next(),
            "Listed subscriptions"
        );

        Ok(page)
    }

    /// Deletes a subscription.
    ///
    /// Returns `true` only when the registry answers 204. Any other status,
    /// including 404 for an unknown id, yields `false`.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank id and a transport error when
    /// no response was obtained.
    pub async fn delete_subscription(&self, ctx: &RequestContext, id: &str) -> Result<bool> {
        require("id", id)?;

        let call = Call::new(Endpoint::delete(SUBSCRIPTIONS)).query("id", id);
        let response = self.send(ctx, call).await?;

        if response.status == 204 {
            tracing::info!(subscription_id = id, "Subscription deleted");
            Ok(true)
        } else {
            tracing::warn!(
                subscription_id = id,
                status = response.status,
                "Subscription delete not acknowledged"
            );
            Ok(false)
        }
    }
}
