//! Transactional outbox (event log) abstraction.
//!
//! Events are appended through the same unit-of-work scope as the aggregate
//! write that raised them, so a state change and its notification are never
//! recorded independently. The dispatcher side reads unpublished rows and
//! flips their `published` flag; that flag is the only mutable column.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DomainError;
use crate::unit_of_work::UnitOfWork;

/// Stored representation of a domain event.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboxRecord {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Event type code (see the catalog's `EventType`).
    pub event_type: i16,
    /// Case that owns the slide the event is about.
    pub case_id: Uuid,
    /// Slide that raised the event.
    pub slide_id: Uuid,
    /// Serialized variant-specific fields.
    pub payload: serde_json::Value,
    /// Creation timestamp; primary fetch order.
    pub created_at: DateTime<Utc>,
    /// Whether every registered handler has processed the event.
    pub published: bool,
}

/// Append-only event log with a one-way `published` flag.
#[async_trait]
pub trait Outbox: UnitOfWork {
    /// Inserts one unpublished row per record inside `scope`.
    ///
    /// Appending an empty slice is a no-op.
    async fn append(
        &self,
        scope: &mut Self::Scope,
        records: &[OutboxRecord],
    ) -> Result<(), DomainError>;

    /// Returns at most `limit` unpublished rows, oldest `created_at` first,
    /// ties broken by append order. Never returns a published row.
    async fn fetch_unpublished(&self, limit: usize) -> Result<Vec<OutboxRecord>, DomainError>;

    /// Flips `published` to true for the given ids.
    ///
    /// Idempotent: ids that are already published (or unknown) are ignored.
    async fn mark_published(&self, event_ids: &[Uuid]) -> Result<(), DomainError>;
}
