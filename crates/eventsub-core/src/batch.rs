//! Bulk shard reassignment: validation and result reconciliation.
//!
//! A batch is validated as a whole before it is sent. The registry may still
//! refuse single shards, so the outcome is a [`BatchResult`] holding both the
//! accepted and the errored shards rather than an error.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{
    error::{require, Result, ValidationError},
    models::{Shard, ShardError},
    transport::ShardTransport,
};

/// New transport assignment for one shard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardUpdate {
    /// Shard index as a decimal string.
    pub id: String,
    /// Transport to assign.
    pub transport: ShardTransport,
}

impl ShardUpdate {
    /// Creates a shard update.
    pub fn new(id: impl Into<String>, transport: ShardTransport) -> Self {
        Self { id: id.into(), transport }
    }

    /// Validates this shard on its own.
    ///
    /// # Errors
    ///
    /// Returns a missing field error for a blank id, otherwise whatever
    /// [`ShardTransport::validate`] reports.
    pub fn validate(&self) -> Result<()> {
        require("id", &self.id)?;
        self.transport.validate()
    }
}

/// Body for `PATCH /eventsub/conduits/shards`.
///
/// Only constructed from a batch in which every shard validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateShardsRequest {
    conduit_id: String,
    shards: Vec<ShardUpdate>,
}

impl UpdateShardsRequest {
    /// Validates a batch, failing closed on the first invalid shard.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::Shard` naming the first offending shard,
    /// `ValidationError::EmptyBatch` for an empty batch, or a missing field
    /// error for a blank conduit id.
    pub fn new(conduit_id: impl Into<String>, shards: Vec<ShardUpdate>) -> Result<Self> {
        let conduit_id = conduit_id.into();
        require("conduit_id", &conduit_id)?;
        if shards.is_empty() {
            return Err(ValidationError::EmptyBatch);
        }
        for shard in &shards {
            shard.validate().map_err(|e| ValidationError::in_shard(shard.id.clone(), e))?;
        }
        Ok(Self { conduit_id, shards })
    }

    /// Conduit owning the shards.
    pub fn conduit_id(&self) -> &str {
        &self.conduit_id
    }

    /// Shard updates in submission order.
    pub fn shards(&self) -> &[ShardUpdate] {
        &self.shards
    }

    /// Shard ids in submission order.
    pub fn shard_ids(&self) -> impl Iterator<Item = &str> {
        self.shards.iter().map(|shard| shard.id.as_str())
    }
}

/// Combined outcome of a shard batch.
///
/// Accepted shards are committed remotely and never rolled back. A batch
/// where every shard errored is still an `Ok` outcome; callers inspect both
/// collections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    /// Shards the registry updated, in submission order.
    pub accepted: Vec<Shard>,
    /// Shards the registry refused, in submission order.
    pub errored: Vec<ShardError>,
}

impl BatchResult {
    /// Orders remote outcomes by the position of each shard in the submitted
    /// batch.
    ///
    /// Entries for ids that were not submitted are kept after the known ones
    /// in the order the registry reported them.
    pub fn reconcile<'a>(
        submitted: impl IntoIterator<Item = &'a str>,
        accepted: Vec<Shard>,
        errored: Vec<ShardError>,
    ) -> Self {
        let submitted: Vec<&str> = submitted.into_iter().collect();
        let positions: HashMap<&str, usize> =
            submitted.iter().enumerate().map(|(position, id)| (*id, position)).collect();

        let result = Self {
            accepted: order_by_submission(&positions, accepted, |shard| &shard.id),
            errored: order_by_submission(&positions, errored, |error| &error.id),
        };

        let reported: HashSet<&str> = result
            .accepted
            .iter()
            .map(|shard| shard.id.as_str())
            .chain(result.errored_ids())
            .collect();
        for id in submitted.iter().filter(|id| !reported.contains(*id)) {
            tracing::warn!(shard_id = %id, "registry reported no outcome for shard");
        }

        result
    }

    /// Whether every submitted shard was accepted.
    pub fn is_complete(&self) -> bool {
        self.errored.is_empty()
    }

    /// Ids of errored shards, e.g. to build a retry batch.
    pub fn errored_ids(&self) -> impl Iterator<Item = &str> {
        self.errored.iter().map(|error| error.id.as_str())
    }
}

fn order_by_submission<T>(
    positions: &HashMap<&str, usize>,
    items: Vec<T>,
    id: impl Fn(&T) -> &String,
) -> Vec<T> {
    let mut keyed: Vec<(usize, usize, T)> = items
        .into_iter()
        .enumerate()
        .map(|(reported, item)| {
            let position = positions.get(id(&item).as_str()).copied().unwrap_or(usize::MAX);
            (position, reported, item)
        })
        .collect();
    keyed.sort_by_key(|(position, reported, _)| (*position, *reported));
    keyed.into_iter().map(|(_, _, item)| item).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ShardStatus;

    fn websocket_update(id: &str) -> ShardUpdate {
        ShardUpdate::new(id, ShardTransport::websocket(format!("session-{id}")))
    }

    fn shard(id: &str) -> Shard {
        Shard { id: id.to_string(), status: ShardStatus::Enabled, transport: None }
    }

    fn shard_error(id: &str) -> ShardError {
        ShardError {
            id: id.to_string(),
            code: "400".to_string(),
            message: "The shard is already assigned".to_string(),
        }
    }

    #[test]
    fn unsigned_webhook_shard_accepted() {
        let shards = vec![
            websocket_update("0"),
            ShardUpdate::new("1", ShardTransport::webhook_without_secret("https://example.com")),
        ];

        let request = UpdateShardsRequest::new("conduit-1", shards).unwrap();
        assert_eq!(request.shards().len(), 2);
    }

    #[test]
    fn one_invalid_shard_rejects_batch() {
        let mut shards: Vec<ShardUpdate> = (0..5).map(|i| websocket_update(&i.to_string())).collect();
        let short_secret = ShardTransport::webhook("https://example.com", "short");
        shards.insert(2, ShardUpdate::new("9", short_secret));

        let error = UpdateShardsRequest::new("conduit-1", shards).unwrap_err();
        match error {
            ValidationError::Shard { shard_id, source } => {
                assert_eq!(shard_id, "9");
                assert_eq!(*source, ValidationError::SecretLength { length: 5 });
            },
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn empty_batch_rejected() {
        assert_eq!(UpdateShardsRequest::new("conduit-1", vec![]), Err(ValidationError::EmptyBatch));
    }

    #[test]
    fn reconcile_restores_submission_order() {
        let submitted = ["0", "1", "2", "3"];
        let result = BatchResult::reconcile(
            submitted,
            vec![shard("3"), shard("0")],
            vec![shard_error("2"), shard_error("1")],
        );

        let accepted: Vec<&str> = result.accepted.iter().map(|s| s.id.as_str()).collect();
        let errored: Vec<&str> = result.errored_ids().collect();
        assert_eq!(accepted, vec!["0", "3"]);
        assert_eq!(errored, vec!["1", "2"]);
        assert!(!result.is_complete());
    }

    #[test]
    fn unsubmitted_ids_kept_last() {
        let result =
            BatchResult::reconcile(["1", "2"], vec![shard("99"), shard("2"), shard("1")], vec![]);

        let accepted: Vec<&str> = result.accepted.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(accepted, vec!["1", "2", "99"]);
    }
}
