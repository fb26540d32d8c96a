//! Core types for EventSub subscription and conduit management.
//!
//! Provides the tagged transport descriptors, validated request payloads,
//! shard batch reconciliation and the records the remote registry reports.
//! Nothing in this crate performs I/O: every check here runs before a
//! request leaves the process.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod batch;
pub mod conduit;
pub mod error;
pub mod models;
pub mod request;
pub mod transport;

pub use batch::{BatchResult, ShardUpdate, UpdateShardsRequest};
pub use conduit::{CreateConduitRequest, UpdateConduitRequest, MAX_SHARD_COUNT};
pub use error::{Result, ValidationError};
pub use models::{
    Conduit, Page, Shard, ShardError, ShardStatus, Subscription, SubscriptionFilter,
    SubscriptionPage, SubscriptionPhase, SubscriptionStatus,
};
pub use request::{Condition, CreateSubscriptionRequest};
pub use transport::{ShardTransport, Transport, TransportInfo, TransportMethod};
