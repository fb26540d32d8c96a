//! Helix client for EventSub subscriptions, conduits and conduit shards.
//!
//! [`HelixClient`] validates every request locally with the types from
//! `eventsub-core`, resolves credentials from a per-call [`RequestContext`]
//! and delegates the wire call to a [`HelixTransport`]. Listings are exposed
//! both page by page and as lazy streams.
//!
//! The client never retries, refreshes tokens or throttles. Errors carry
//! enough classification ([`HelixError::is_retryable`],
//! [`TransportError::retry_after_seconds`]) for the caller to decide.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod transport;

mod conduits;
mod pagination;
mod shards;
mod subscriptions;
mod wire;

pub use client::HelixClient;
pub use config::ClientSettings;
pub use context::{Credentials, RequestContext};
pub use error::{Endpoint, HelixError, Result, TransportError};
pub use http::{HttpConfig, ReqwestTransport};
pub use transport::{ApiVersion, HelixRequest, HelixResponse, HelixTransport};
