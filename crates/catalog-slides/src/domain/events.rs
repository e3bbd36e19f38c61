//! Domain events for the catalog context.

use catalog_core::error::DomainError;
use catalog_core::event::{DomainEvent, EventMetadata};
use catalog_core::outbox::OutboxRecord;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::CasePreparationStatus;

/// Emitted when a slide is registered under a case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideCreated {
    /// The owning case.
    pub case_id: Uuid,
    /// The new slide.
    pub slide_id: Uuid,
    /// Case status including the new slide, computed at emission time.
    pub case_preparation_status: CasePreparationStatus,
}

/// Emitted when a slide's preparation finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideFinished {
    /// The owning case.
    pub case_id: Uuid,
    /// The finished slide.
    pub slide_id: Uuid,
    /// Case status after the slide finished, computed at emission time.
    pub case_preparation_status: CasePreparationStatus,
}

/// Event payload variants for the catalog context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogEventKind {
    /// A slide was created.
    SlideCreated(SlideCreated),
    /// A slide finished preparation.
    SlideFinished(SlideFinished),
}

/// Discriminant of [`CatalogEventKind`]; the key handlers register under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventType {
    /// See [`SlideCreated`].
    SlideCreated,
    /// See [`SlideFinished`].
    SlideFinished,
}

impl EventType {
    /// Every event type, in code order.
    pub const ALL: [Self; 2] = [Self::SlideCreated, Self::SlideFinished];

    /// Stored small-integer code.
    #[must_use]
    pub const fn code(self) -> i16 {
        match self {
            Self::SlideCreated => 1,
            Self::SlideFinished => 2,
        }
    }

    /// Dotted name used in logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SlideCreated => "catalog.slide_created",
            Self::SlideFinished => "catalog.slide_finished",
        }
    }
}

impl TryFrom<i16> for EventType {
    type Error = DomainError;

    fn try_from(code: i16) -> Result<Self, DomainError> {
        match code {
            1 => Ok(Self::SlideCreated),
            2 => Ok(Self::SlideFinished),
            other => Err(DomainError::storage(
                "decode event type",
                format!("unknown code {other}"),
            )),
        }
    }
}

/// Domain event envelope for the catalog context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEvent {
    /// Event metadata. `aggregate_id` is the slide.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: CatalogEventKind,
}

impl CatalogEvent {
    /// Returns the handler-registry key for this event.
    #[must_use]
    pub const fn kind_type(&self) -> EventType {
        match &self.kind {
            CatalogEventKind::SlideCreated(_) => EventType::SlideCreated,
            CatalogEventKind::SlideFinished(_) => EventType::SlideFinished,
        }
    }

    /// Returns the owning case.
    #[must_use]
    pub const fn case_id(&self) -> Uuid {
        match &self.kind {
            CatalogEventKind::SlideCreated(payload) => payload.case_id,
            CatalogEventKind::SlideFinished(payload) => payload.case_id,
        }
    }

    /// Returns the case status captured when the event was raised.
    #[must_use]
    pub const fn case_preparation_status(&self) -> CasePreparationStatus {
        match &self.kind {
            CatalogEventKind::SlideCreated(payload) => payload.case_preparation_status,
            CatalogEventKind::SlideFinished(payload) => payload.case_preparation_status,
        }
    }

    /// Rebuilds an event from an outbox row.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Storage` if the type code is unknown or the
    /// payload does not match the variant's fields.
    pub fn from_record(record: &OutboxRecord) -> Result<Self, DomainError> {
        let event_type = EventType::try_from(record.event_type)?;
        let kind = match event_type {
            EventType::SlideCreated => {
                CatalogEventKind::SlideCreated(decode_payload(event_type, record)?)
            }
            EventType::SlideFinished => {
                CatalogEventKind::SlideFinished(decode_payload(event_type, record)?)
            }
        };

        Ok(Self {
            metadata: EventMetadata {
                event_id: record.event_id,
                aggregate_id: record.slide_id,
                occurred_at: record.created_at,
            },
            kind,
        })
    }
}

fn decode_payload<T>(event_type: EventType, record: &OutboxRecord) -> Result<T, DomainError>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_value(record.payload.clone()).map_err(|e| {
        DomainError::storage(
            &format!("decode {} payload of {}", event_type.name(), record.event_id),
            e,
        )
    })
}

impl DomainEvent for CatalogEvent {
    fn event_type(&self) -> &'static str {
        self.kind_type().name()
    }

    fn type_code(&self) -> i16 {
        self.kind_type().code()
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    fn to_record(&self) -> Result<OutboxRecord, DomainError> {
        let payload = match &self.kind {
            CatalogEventKind::SlideCreated(payload) => serde_json::to_value(payload),
            CatalogEventKind::SlideFinished(payload) => serde_json::to_value(payload),
        }
        .map_err(|e| DomainError::storage("encode event payload", e))?;

        Ok(OutboxRecord {
            event_id: self.metadata.event_id,
            event_type: self.type_code(),
            case_id: self.case_id(),
            slide_id: self.metadata.aggregate_id,
            payload,
            created_at: self.metadata.occurred_at,
            published: false,
        })
    }
}
