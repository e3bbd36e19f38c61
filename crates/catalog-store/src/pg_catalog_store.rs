//! `PostgreSQL` implementation of the catalog repositories and outbox.

use async_trait::async_trait;
use catalog_core::aggregate::{AggregateRoot, Version};
use catalog_core::error::DomainError;
use catalog_core::outbox::{Outbox, OutboxRecord};
use catalog_core::unit_of_work::UnitOfWork;
use catalog_slides::domain::aggregates::{Case, Slide};
use catalog_slides::domain::repository::{CaseRepository, SlideRepository};
use sqlx::postgres::PgQueryResult;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::rows::{CaseRow, EventRow, SlideRow};

/// PostgreSQL-backed catalog store.
///
/// A scope is a `sqlx` transaction; dropping it without committing rolls it
/// back.
#[derive(Debug, Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    /// Creates a new `PgCatalogStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The connection pool used outside of scopes.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn db_error(operation: &'static str) -> impl FnOnce(sqlx::Error) -> DomainError {
    move |err| DomainError::storage(operation, err)
}

/// Turns a zero-row save into a version conflict.
fn ensure_written(
    result: &PgQueryResult,
    aggregate_id: Uuid,
    expected: Version,
) -> Result<Version, DomainError> {
    if result.rows_affected() == 0 {
        return Err(DomainError::VersionConflict {
            aggregate_id,
            expected,
        });
    }
    Ok(expected.next())
}

#[async_trait]
impl UnitOfWork for PgCatalogStore {
    type Scope = Transaction<'static, Postgres>;

    async fn begin(&self) -> Result<Self::Scope, DomainError> {
        self.pool.begin().await.map_err(db_error("begin transaction"))
    }

    async fn commit(&self, scope: Self::Scope) -> Result<(), DomainError> {
        scope.commit().await.map_err(db_error("commit"))
    }

    async fn rollback(&self, scope: Self::Scope) -> Result<(), DomainError> {
        scope.rollback().await.map_err(db_error("rollback"))
    }
}

#[async_trait]
impl CaseRepository for PgCatalogStore {
    #[instrument(skip(self, scope))]
    async fn get_case(&self, scope: &mut Self::Scope, id: Uuid) -> Result<Case, DomainError> {
        let row: Option<CaseRow> = sqlx::query_as("SELECT id, version FROM cases WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut **scope)
            .await
            .map_err(db_error("select case"))?;

        row.map(Case::from)
            .ok_or(DomainError::NotFound { kind: "case", id })
    }

    #[instrument(skip_all, fields(case_id = %case.id, expected = %case.version()))]
    async fn save_case(
        &self,
        scope: &mut Self::Scope,
        case: &mut Case,
    ) -> Result<Version, DomainError> {
        let expected = case.version();

        let result = if expected.is_new() {
            sqlx::query(
                r"
                INSERT INTO cases (id, version)
                VALUES ($1, 1)
                ON CONFLICT (id) DO NOTHING
                ",
            )
            .bind(case.id)
            .execute(&mut **scope)
            .await
            .map_err(db_error("insert case"))?
        } else {
            sqlx::query(
                r"
                UPDATE cases
                SET version = version + 1
                WHERE id = $1 AND version = $2
                ",
            )
            .bind(case.id)
            .bind(expected.get())
            .execute(&mut **scope)
            .await
            .map_err(db_error("update case"))?
        };

        let version = ensure_written(&result, case.id, expected)?;
        case.set_version(version);
        Ok(version)
    }
}

#[async_trait]
impl SlideRepository for PgCatalogStore {
    #[instrument(skip(self, scope))]
    async fn get_slide(&self, scope: &mut Self::Scope, id: Uuid) -> Result<Slide, DomainError> {
        let row: Option<SlideRow> = sqlx::query_as(
            r"
            SELECT id, version, case_id, preparation_status
            FROM slides
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&mut **scope)
        .await
        .map_err(db_error("select slide"))?;

        row.ok_or(DomainError::NotFound { kind: "slide", id })?
            .try_into()
    }

    #[instrument(skip(self, scope))]
    async fn slides_for_case(
        &self,
        scope: &mut Self::Scope,
        case_id: Uuid,
    ) -> Result<Vec<Slide>, DomainError> {
        let rows: Vec<SlideRow> = sqlx::query_as(
            r"
            SELECT id, version, case_id, preparation_status
            FROM slides
            WHERE case_id = $1
            ORDER BY id
            ",
        )
        .bind(case_id)
        .fetch_all(&mut **scope)
        .await
        .map_err(db_error("select slides by case"))?;

        rows.into_iter().map(Slide::try_from).collect()
    }

    #[instrument(skip_all, fields(slide_id = %slide.id, expected = %slide.version()))]
    async fn save_slide(
        &self,
        scope: &mut Self::Scope,
        slide: &mut Slide,
    ) -> Result<Version, DomainError> {
        let expected = slide.version();
        let status = slide.preparation_status().code();

        let result = if expected.is_new() {
            sqlx::query(
                r"
                INSERT INTO slides (id, version, case_id, preparation_status)
                VALUES ($1, 1, $2, $3)
                ON CONFLICT (id) DO NOTHING
                ",
            )
            .bind(slide.id)
            .bind(slide.case_id)
            .bind(status)
            .execute(&mut **scope)
            .await
            .map_err(db_error("insert slide"))?
        } else {
            sqlx::query(
                r"
                UPDATE slides
                SET version = version + 1,
                    preparation_status = $3
                WHERE id = $1 AND version = $2
                ",
            )
            .bind(slide.id)
            .bind(expected.get())
            .bind(status)
            .execute(&mut **scope)
            .await
            .map_err(db_error("update slide"))?
        };

        let version = ensure_written(&result, slide.id, expected)?;
        slide.set_version(version);
        Ok(version)
    }
}

#[async_trait]
impl Outbox for PgCatalogStore {
    #[instrument(skip_all, fields(count = records.len()))]
    async fn append(
        &self,
        scope: &mut Self::Scope,
        records: &[OutboxRecord],
    ) -> Result<(), DomainError> {
        if records.is_empty() {
            return Ok(());
        }

        let mut qb = QueryBuilder::<Postgres>::new(
            "INSERT INTO events (id, type, case_id, slide_id, created_at, published, payload) ",
        );
        qb.push_values(records, |mut b, record| {
            b.push_bind(record.event_id);
            b.push_bind(record.event_type);
            b.push_bind(record.case_id);
            b.push_bind(record.slide_id);
            b.push_bind(record.created_at);
            b.push_bind(false);
            b.push_bind(record.payload.clone());
        });

        qb.build()
            .execute(&mut **scope)
            .await
            .map_err(db_error("insert events"))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn fetch_unpublished(&self, limit: usize) -> Result<Vec<OutboxRecord>, DomainError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let rows: Vec<EventRow> = sqlx::query_as(
            r"
            SELECT id, type, case_id, slide_id, created_at, published, payload
            FROM events
            WHERE published = FALSE
            ORDER BY created_at, seq
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("select unpublished events"))?;

        Ok(rows.into_iter().map(OutboxRecord::from).collect())
    }

    #[instrument(skip_all, fields(count = event_ids.len()))]
    async fn mark_published(&self, event_ids: &[Uuid]) -> Result<(), DomainError> {
        if event_ids.is_empty() {
            return Ok(());
        }

        let result = sqlx::query(
            r"
            UPDATE events
            SET published = TRUE
            WHERE id = ANY($1) AND published = FALSE
            ",
        )
        .bind(event_ids)
        .execute(&self.pool)
        .await
        .map_err(db_error("mark events published"))?;

        debug!(updated = result.rows_affected(), "events marked published");
        Ok(())
    }
}
