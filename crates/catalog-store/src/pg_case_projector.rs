//! Case-status projection kept in `case_projections`.

use async_trait::async_trait;
use catalog_core::error::DomainError;
use catalog_slides::application::handlers::EventHandler;
use catalog_slides::domain::events::CatalogEvent;
use catalog_slides::domain::status::CasePreparationStatus;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

/// Projects each event's case-preparation status into `case_projections`.
///
/// The upsert inserts a missing row and rewrites an existing one only when
/// the status differs, so replaying an event leaves the table unchanged.
#[derive(Debug, Clone)]
pub struct PgCaseProjector {
    pool: PgPool,
}

impl PgCaseProjector {
    /// Creates a new `PgCaseProjector`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Reads the projected status of a case.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Storage` if the read fails or the stored code is
    /// unknown.
    pub async fn status(&self, case_id: Uuid) -> Result<Option<CasePreparationStatus>, DomainError> {
        let code: Option<i16> =
            sqlx::query_scalar("SELECT status FROM case_projections WHERE id = $1")
                .bind(case_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| DomainError::storage("select case projection", e))?;

        code.map(CasePreparationStatus::try_from).transpose()
    }
}

#[async_trait]
impl EventHandler for PgCaseProjector {
    fn name(&self) -> &'static str {
        "case_projection"
    }

    #[instrument(skip_all, fields(event_id = %event.metadata.event_id, case_id = %event.case_id()))]
    async fn handle(&self, event: &CatalogEvent) -> Result<(), DomainError> {
        sqlx::query(
            r"
            INSERT INTO case_projections (id, status)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE
            SET status = EXCLUDED.status
            WHERE case_projections.status IS DISTINCT FROM EXCLUDED.status
            ",
        )
        .bind(event.case_id())
        .bind(event.case_preparation_status().code())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage("upsert case projection", e))?;

        Ok(())
    }
}
