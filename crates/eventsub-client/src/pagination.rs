//! Cursor-driven listing streams.
//!
//! Streams fetch lazily: a page is requested only when the previous one has
//! been consumed. They move forward only, hold nothing but the next cursor,
//! and end after the first page without a cursor or after the first error.
//! A listing can be resumed from any persisted cursor.

use std::future::Future;

use eventsub_core::{Page, Shard, ShardStatus, Subscription, SubscriptionFilter, SubscriptionPage};
use futures::{
    stream::{self, BoxStream},
    StreamExt, TryStreamExt,
};

use crate::{
    client::HelixClient,
    context::RequestContext,
    error::{HelixError, Result},
};

enum Cursor {
    Next(Option<String>),
    Done,
}

/// Pages from `fetch`, starting at `start`, until a page has no cursor.
fn paginate<P, F, Fut>(
    start: Option<String>,
    mut fetch: F,
    next_cursor: fn(&P) -> Option<String>,
) -> BoxStream<'static, Result<P>>
where
    P: Send + 'static,
    F: FnMut(Option<String>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<P>> + Send + 'static,
{
    stream::try_unfold(Cursor::Next(start), move |cursor| {
        let request = match cursor {
            Cursor::Next(cursor) => Some(fetch(cursor)),
            Cursor::Done => None,
        };
        async move {
            let Some(request) = request else {
                return Ok(None);
            };
            let page = request.await?;
            let next = match next_cursor(&page) {
                Some(cursor) => Cursor::Next(Some(cursor)),
                None => Cursor::Done,
            };
            Ok::<_, HelixError>(Some((page, next)))
        }
    })
    .boxed()
}

impl HelixClient {
    /// Streams subscription pages, starting from `cursor` (or the beginning).
    pub fn subscription_pages(
        &self,
        ctx: &RequestContext,
        filter: SubscriptionFilter,
        cursor: Option<String>,
    ) -> BoxStream<'static, Result<SubscriptionPage>> {
        let client = self.clone();
        let ctx = ctx.clone();
        paginate(
            cursor,
            move |cursor| {
                let client = client.clone();
                let ctx = ctx.clone();
                let filter = filter.clone();
                async move { client.list_subscriptions(&ctx, &filter, cursor.as_deref()).await }
            },
            |page: &SubscriptionPage| page.page.cursor.clone(),
        )
    }

    /// Streams individual subscriptions across all pages.
    ///
    /// Each item is yielded exactly once, in page order.
    pub fn subscriptions(
        &self,
        ctx: &RequestContext,
        filter: SubscriptionFilter,
        cursor: Option<String>,
    ) -> BoxStream<'static, Result<Subscription>> {
        self.subscription_pages(ctx, filter, cursor)
            .map_ok(|page| stream::iter(page.page.data.into_iter().map(Ok::<_, HelixError>)))
            .try_flatten()
            .boxed()
    }

    /// Streams the shard pages of a conduit.
    pub fn conduit_shard_pages(
        &self,
        ctx: &RequestContext,
        conduit_id: impl Into<String>,
        status: Option<ShardStatus>,
        cursor: Option<String>,
    ) -> BoxStream<'static, Result<Page<Shard>>> {
        let client = self.clone();
        let ctx = ctx.clone();
        let conduit_id = conduit_id.into();
        paginate(
            cursor,
            move |cursor| {
                let client = client.clone();
                let ctx = ctx.clone();
                let conduit_id = conduit_id.clone();
                async move {
                    client.list_conduit_shards(&ctx, &conduit_id, status, cursor.as_deref()).await
                }
            },
            |page: &Page<Shard>| page.cursor.clone(),
        )
    }
}
