//! Conduit request payloads and shard count bounds.

use serde::Serialize;

use crate::error::{require, Result, ValidationError};

/// Largest shard count a conduit may have.
pub const MAX_SHARD_COUNT: u32 = 20_000;

/// Checks that a shard count lies in `(0, MAX_SHARD_COUNT]`.
pub fn check_shard_count(shard_count: u32) -> Result<()> {
    if shard_count == 0 || shard_count > MAX_SHARD_COUNT {
        return Err(ValidationError::ShardCountOutOfRange { shard_count });
    }
    Ok(())
}

/// Body for `POST /eventsub/conduits`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CreateConduitRequest {
    shard_count: u32,
}

impl CreateConduitRequest {
    /// Builds a create request after checking the shard count bound.
    pub fn new(shard_count: u32) -> Result<Self> {
        check_shard_count(shard_count)?;
        Ok(Self { shard_count })
    }

    /// Requested shard count.
    pub fn shard_count(&self) -> u32 {
        self.shard_count
    }
}

/// Body for `PATCH /eventsub/conduits`.
///
/// Lowering the count makes the registry disable every shard whose index is
/// at or above the new count; raising it adds unassigned shard slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateConduitRequest {
    id: String,
    shard_count: u32,
}

impl UpdateConduitRequest {
    /// Builds an update request after checking id and shard count.
    pub fn new(id: impl Into<String>, shard_count: u32) -> Result<Self> {
        let id = id.into();
        require("id", &id)?;
        check_shard_count(shard_count)?;
        Ok(Self { id, shard_count })
    }

    /// Conduit being updated.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// New shard count.
    pub fn shard_count(&self) -> u32 {
        self.shard_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shard_count_boundaries() {
        assert_eq!(
            check_shard_count(0),
            Err(ValidationError::ShardCountOutOfRange { shard_count: 0 })
        );
        assert!(check_shard_count(1).is_ok());
        assert!(check_shard_count(MAX_SHARD_COUNT).is_ok());
        assert_eq!(
            check_shard_count(20_001),
            Err(ValidationError::ShardCountOutOfRange { shard_count: 20_001 })
        );
    }

    #[test]
    fn update_requires_conduit_id() {
        let error = UpdateConduitRequest::new("", 5).unwrap_err();
        assert_eq!(error.field(), "id");
    }

    #[test]
    fn update_body_shape() {
        let request = UpdateConduitRequest::new("conduit-1", 50).unwrap();
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({"id": "conduit-1", "shard_count": 50})
        );
    }
}
