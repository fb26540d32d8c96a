//! Validation errors for locally checked EventSub requests.
//!
//! Every failure here is detected before any network call, is deterministic,
//! and names the field that caused it. Callers must fix the input; these
//! errors are never worth retrying.

use thiserror::Error;

/// Result type alias using `ValidationError`.
pub type Result<T> = std::result::Result<T, ValidationError>;

/// Minimum webhook secret length in characters.
pub const SECRET_MIN_LENGTH: usize = 10;

/// Maximum webhook secret length in characters.
pub const SECRET_MAX_LENGTH: usize = 100;

/// Locally detected, pre-network request validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is absent or blank.
    #[error("{field} must be set")]
    MissingField {
        /// Name of the missing field
        field: &'static str,
    },

    /// Webhook secret length outside the accepted range.
    #[error("secret must be between 10 (inclusive) and 100 (inclusive) characters, got {length}")]
    SecretLength {
        /// Length of the rejected secret in characters
        length: usize,
    },

    /// Conduit shard count outside `(0, 20000]`.
    #[error("shard_count must be greater than 0 and at most 20000, got {shard_count}")]
    ShardCountOutOfRange {
        /// The rejected shard count
        shard_count: u32,
    },

    /// Transport method not accepted in this position.
    #[error("unsupported transport method `{method}`, valid values: {valid}")]
    UnsupportedMethod {
        /// Method as supplied (lowercased when it parsed)
        method: String,
        /// Comma separated list of accepted methods
        valid: &'static str,
    },

    /// Shard batch contains no shards.
    #[error("shards must contain at least one shard update")]
    EmptyBatch,

    /// One shard of a batch failed validation; the whole batch is rejected.
    #[error("shard {shard_id}: {source}")]
    Shard {
        /// Identifier of the offending shard
        shard_id: String,
        /// Underlying validation failure
        #[source]
        source: Box<ValidationError>,
    },
}

impl ValidationError {
    /// Creates a missing field error.
    pub fn missing(field: &'static str) -> Self {
        Self::MissingField { field }
    }

    /// Wraps a failure with the shard it belongs to.
    pub fn in_shard(shard_id: impl Into<String>, source: Self) -> Self {
        Self::Shard { shard_id: shard_id.into(), source: Box::new(source) }
    }

    /// Name of the offending field.
    ///
    /// Shard failures report the field of the wrapped error, prefixed with
    /// the shard path.
    pub fn field(&self) -> String {
        match self {
            Self::MissingField { field } => (*field).to_string(),
            Self::SecretLength { .. } => "transport.secret".to_string(),
            Self::ShardCountOutOfRange { .. } => "shard_count".to_string(),
            Self::UnsupportedMethod { .. } => "transport.method".to_string(),
            Self::EmptyBatch => "shards".to_string(),
            Self::Shard { source, .. } => format!("shards.{}", source.field()),
        }
    }
}

/// Checks that a string field is present and not blank.
pub fn require(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::missing(field));
    }
    Ok(())
}

/// Checks a webhook secret against the accepted length range.
pub fn check_secret(secret: &str) -> Result<()> {
    let length = secret.chars().count();
    if !(SECRET_MIN_LENGTH..=SECRET_MAX_LENGTH).contains(&length) {
        return Err(ValidationError::SecretLength { length });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_rejected() {
        assert_eq!(require("type", ""), Err(ValidationError::missing("type")));
        assert_eq!(require("type", "   "), Err(ValidationError::missing("type")));
        assert!(require("type", "channel.follow").is_ok());
    }

    #[test]
    fn secret_length_counts_characters() {
        // 10 characters, 21 bytes
        assert!(check_secret("ééééééééé€").is_ok());
        assert_eq!(check_secret("short"), Err(ValidationError::SecretLength { length: 5 }));
    }

    #[test]
    fn shard_errors_report_nested_field() {
        let error = ValidationError::in_shard("3", ValidationError::SecretLength { length: 4 });
        assert_eq!(error.field(), "shards.transport.secret");
        assert_eq!(
            error.to_string(),
            "shard 3: secret must be between 10 (inclusive) and 100 (inclusive) characters, got 4"
        );
    }
}
