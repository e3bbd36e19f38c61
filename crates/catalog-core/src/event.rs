//! Domain event abstractions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;
use crate::outbox::OutboxRecord;

/// Metadata attached to every domain event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Aggregate that raised the event.
    pub aggregate_id: Uuid,
    /// Timestamp of event creation; orders the outbox.
    pub occurred_at: DateTime<Utc>,
}

/// Trait that all domain events implement.
pub trait DomainEvent: Send + Sync + std::fmt::Debug {
    /// Returns the dotted event name (used in logs).
    fn event_type(&self) -> &'static str;

    /// Returns the small-integer code stored in the outbox `type` column.
    fn type_code(&self) -> i16;

    /// Returns the metadata for this event.
    fn metadata(&self) -> &EventMetadata;

    /// Converts the event into an unpublished outbox row.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Storage` if the payload cannot be serialized.
    fn to_record(&self) -> Result<OutboxRecord, DomainError>;
}
