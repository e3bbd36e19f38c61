//! Domain error types.

use std::fmt::Display;

use thiserror::Error;
use uuid::Uuid;

use crate::aggregate::Version;

/// Top-level error type shared by use cases, stores and the dispatcher.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An aggregate was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Aggregate kind, e.g. `"case"` or `"slide"`.
        kind: &'static str,
        /// The identifier that was looked up.
        id: Uuid,
    },

    /// Optimistic concurrency conflict: the stored version no longer matches.
    #[error("version conflict on {aggregate_id}: expected version {expected} is stale")]
    VersionConflict {
        /// The aggregate that had the conflict.
        aggregate_id: Uuid,
        /// The version the writer expected to find.
        expected: Version,
    },

    /// A storage or transport failure, prefixed with the failing operation.
    #[error("storage error: {0}")]
    Storage(String),

    /// An event handler failed while a batch was being dispatched.
    #[error("handler error: {0}")]
    Handler(String),
}

impl DomainError {
    /// Wraps a lower-level failure with the name of the operation that hit it.
    pub fn storage(operation: &str, source: impl Display) -> Self {
        Self::Storage(format!("{operation}: {source}"))
    }

    /// Returns `true` for [`DomainError::NotFound`].
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` for [`DomainError::VersionConflict`].
    #[must_use]
    pub const fn is_version_conflict(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }
}
