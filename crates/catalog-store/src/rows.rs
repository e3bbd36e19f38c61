//! Row models and their mapping to domain types.

use catalog_core::aggregate::Version;
use catalog_core::error::DomainError;
use catalog_core::outbox::OutboxRecord;
use catalog_slides::domain::aggregates::{Case, Slide};
use catalog_slides::domain::status::SlidePreparationStatus;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, FromRow)]
pub(crate) struct CaseRow {
    pub id: Uuid,
    pub version: i64,
}

impl From<CaseRow> for Case {
    fn from(row: CaseRow) -> Self {
        Case::restore(row.id, Version::new(row.version))
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct SlideRow {
    pub id: Uuid,
    pub version: i64,
    pub case_id: Uuid,
    pub preparation_status: i16,
}

impl TryFrom<SlideRow> for Slide {
    type Error = DomainError;

    fn try_from(row: SlideRow) -> Result<Self, DomainError> {
        Ok(Slide::restore(
            row.id,
            row.case_id,
            Version::new(row.version),
            SlidePreparationStatus::try_from(row.preparation_status)?,
        ))
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct EventRow {
    pub id: Uuid,
    #[sqlx(rename = "type")]
    pub event_type: i16,
    pub case_id: Uuid,
    pub slide_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub published: bool,
    pub payload: serde_json::Value,
}

impl From<EventRow> for OutboxRecord {
    fn from(row: EventRow) -> Self {
        OutboxRecord {
            event_id: row.id,
            event_type: row.event_type,
            case_id: row.case_id,
            slide_id: row.slide_id,
            payload: row.payload,
            created_at: row.created_at,
            published: row.published,
        }
    }
}
