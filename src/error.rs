//! Error handling utilities shared across the crate.

use std::path::PathBuf;

use thiserror::Error;

use crate::token::DisplayType;

/// Convenient result type used throughout the crate.
pub type Result<T, E = RarityError> = std::result::Result<T, E>;

/// Domain-specific error raised while validating or ranking a collection.
#[derive(Debug, Error)]
pub enum RarityError {
    /// Raw token input failed validation.
    #[error("invalid tokens: {0}")]
    Validation(String),
    /// One attribute name was declared with display types that cannot be reconciled.
    #[error(
        "attribute {name:?} is declared both as {first} and as {second}; numeric and textual display types cannot be mixed"
    )]
    Schema {
        /// Attribute name carrying the clash.
        name: String,
        /// First display type observed.
        first: DisplayType,
        /// Conflicting display type observed later.
        second: DisplayType,
    },
    /// Probabilities were requested against a non-positive total supply.
    #[error("cannot compute probabilities: total supply is {total_supply}")]
    Division {
        /// Offending total supply.
        total_supply: u64,
    },
    /// Pipeline stages disagreed about a row; always a bug.
    #[error(
        "internal consistency error for token {token_id} attribute {name:?} = {value}: {reason}"
    )]
    InternalConsistency {
        /// Token carrying the unmatched row.
        token_id: String,
        /// Attribute name of the unmatched row.
        name: String,
        /// Attribute value (or bin) of the unmatched row.
        value: String,
        /// What failed to line up.
        reason: &'static str,
    },
    /// A derived view was read before the stage producing it ran.
    #[error("statistics are not available yet; call `{method}()` first")]
    NotReady {
        /// Method that produces the requested view.
        method: &'static str,
    },
    /// Ranking configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Filesystem IO error with optional context path.
    #[error("io error while processing {path:?}: {source}")]
    Io {
        /// Underlying IO error returned by the standard library.
        source: std::io::Error,
        /// Target path associated with the IO failure if available.
        path: Option<PathBuf>,
    },
    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for RarityError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl RarityError {
    /// Helper constructor that attaches an optional path when wrapping IO errors.
    pub fn io(source: std::io::Error, path: Option<PathBuf>) -> Self {
        Self::Io { source, path }
    }

    /// Returns `true` for errors raised while checking raw input at construction time.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Schema { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_ready_names_the_producing_method() {
        let err = RarityError::NotReady {
            method: "rank_collection",
        };
        assert!(err.to_string().contains("rank_collection()"));
        assert!(!err.is_validation());
    }

    #[test]
    fn consistency_error_reports_offending_row() {
        let err = RarityError::InternalConsistency {
            token_id: "7".into(),
            name: "hat".into(),
            value: "cap".into(),
            reason: "no matching attribute statistic",
        };
        let message = err.to_string();
        assert!(message.contains('7'));
        assert!(message.contains("hat"));
        assert!(message.contains("cap"));
    }

    #[test]
    fn schema_clash_is_a_validation_error() {
        let err = RarityError::Schema {
            name: "level".into(),
            first: DisplayType::Number,
            second: DisplayType::String,
        };
        assert!(err.is_validation());
        assert!(err.to_string().contains("level"));
    }
}
