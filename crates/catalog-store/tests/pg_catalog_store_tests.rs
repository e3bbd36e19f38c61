//! Integration tests for `PgCatalogStore` and `PgCaseProjector`.
//!
//! These need a reachable PostgreSQL server in `DATABASE_URL`.

use std::sync::Arc;

use catalog_core::aggregate::{AggregateRoot, Version};
use catalog_core::clock::{Clock, SystemClock};
use catalog_core::error::DomainError;
use catalog_core::outbox::{Outbox, OutboxRecord};
use catalog_core::unit_of_work::UnitOfWork;
use catalog_slides::application::catalog::Catalog;
use catalog_slides::application::dispatcher::TickOutcome;
use catalog_slides::application::handlers::{EventHandler, HandlerRegistry};
use catalog_slides::domain::aggregates::Case;
use catalog_slides::domain::events::{CatalogEvent, EventType};
use catalog_slides::domain::repository::{CaseRepository, SlideRepository};
use catalog_slides::domain::status::{CasePreparationStatus, SlidePreparationStatus};
use catalog_store::{PgCaseProjector, PgCatalogStore};
use chrono::{Duration, TimeZone, Utc};
use sqlx::PgPool;
use uuid::Uuid;

fn catalog(pool: &PgPool) -> (Catalog<PgCatalogStore>, Arc<PgCatalogStore>) {
    let store = Arc::new(PgCatalogStore::new(pool.clone()));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    (Catalog::new(Arc::clone(&store), clock), store)
}

async fn count(pool: &PgPool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .unwrap()
}

fn record(created_at: chrono::DateTime<Utc>) -> OutboxRecord {
    OutboxRecord {
        event_id: Uuid::new_v4(),
        event_type: EventType::SlideCreated.code(),
        case_id: Uuid::new_v4(),
        slide_id: Uuid::new_v4(),
        payload: serde_json::json!({}),
        created_at,
        published: false,
    }
}

// --- aggregate store ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_save_case_chains_versions_and_rejects_stale_copy(pool: PgPool) {
    let store = PgCatalogStore::new(pool);
    let mut case = Case::create();
    let mut stale = case.clone();

    let mut scope = store.begin().await.unwrap();
    let first = store.save_case(&mut scope, &mut case).await.unwrap();
    let second = store.save_case(&mut scope, &mut case).await.unwrap();
    store.commit(scope).await.unwrap();

    let mut scope = store.begin().await.unwrap();
    let result = store.save_case(&mut scope, &mut stale).await;
    store.rollback(scope).await.unwrap();

    assert_eq!(first, Version::new(1));
    assert_eq!(second, Version::new(2));
    match result {
        Err(DomainError::VersionConflict { aggregate_id, .. }) => {
            assert_eq!(aggregate_id, case.id);
        }
        other => panic!("expected VersionConflict, got {other:?}"),
    }

    let mut scope = store.begin().await.unwrap();
    let stored = store.get_case(&mut scope, case.id).await.unwrap();
    assert_eq!(stored.version(), Version::new(2));
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_stale_slide_update_is_a_version_conflict(pool: PgPool) {
    let (catalog, store) = catalog(&pool);
    let case_id = catalog.create_case().await.unwrap();
    let slide_id = catalog.add_slide(case_id).await.unwrap();

    let mut scope = store.begin().await.unwrap();
    let mut stale = store.get_slide(&mut scope, slide_id).await.unwrap();
    store.rollback(scope).await.unwrap();
    catalog.finish_slide(slide_id).await.unwrap();

    let mut scope = store.begin().await.unwrap();
    let result = store.save_slide(&mut scope, &mut stale).await;

    match result {
        Err(DomainError::VersionConflict { expected, .. }) => {
            assert_eq!(expected, Version::new(1));
        }
        other => panic!("expected VersionConflict, got {other:?}"),
    }
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_sibling_writers_conflict_on_the_case_row(pool: PgPool) {
    let (catalog, store) = catalog(&pool);
    let case_id = catalog.create_case().await.unwrap();
    let first_slide = catalog.add_slide(case_id).await.unwrap();
    let second_slide = catalog.add_slide(case_id).await.unwrap();

    let mut stale_scope = store.begin().await.unwrap();
    let mut stale_case = store.get_case(&mut stale_scope, case_id).await.unwrap();

    catalog.finish_slide(first_slide).await.unwrap();

    let result = store.save_case(&mut stale_scope, &mut stale_case).await;
    store.rollback(stale_scope).await.unwrap();

    match result {
        Err(DomainError::VersionConflict {
            aggregate_id,
            expected,
        }) => {
            assert_eq!(aggregate_id, case_id);
            assert_eq!(expected, Version::new(3));
        }
        other => panic!("expected VersionConflict, got {other:?}"),
    }
    let records = catalog.finish_slide(second_slide).await.unwrap();
    let event = CatalogEvent::from_record(&records[0]).unwrap();
    assert_eq!(event.case_preparation_status(), CasePreparationStatus::Done);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_get_unknown_slide_is_not_found(pool: PgPool) {
    let store = PgCatalogStore::new(pool);
    let missing = Uuid::new_v4();

    let mut scope = store.begin().await.unwrap();
    let result = store.get_slide(&mut scope, missing).await;

    assert!(result.is_err_and(|e| e.is_not_found()));
}

// --- unit of work ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_add_slide_to_unknown_case_leaves_no_rows(pool: PgPool) {
    let (catalog, _store) = catalog(&pool);

    let result = catalog.add_slide(Uuid::new_v4()).await;

    assert!(result.is_err_and(|e| e.is_not_found()));
    assert_eq!(count(&pool, "slides").await, 0);
    assert_eq!(count(&pool, "events").await, 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_rolled_back_scope_discards_save_and_append(pool: PgPool) {
    let store = PgCatalogStore::new(pool.clone());
    let mut case = Case::create();

    let mut scope = store.begin().await.unwrap();
    store.save_case(&mut scope, &mut case).await.unwrap();
    store
        .append(&mut scope, &[record(Utc::now())])
        .await
        .unwrap();
    store.rollback(scope).await.unwrap();

    assert_eq!(count(&pool, "cases").await, 0);
    assert_eq!(count(&pool, "events").await, 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_finish_slide_persists_status_and_event_together(pool: PgPool) {
    let (catalog, store) = catalog(&pool);
    let case_id = catalog.create_case().await.unwrap();
    let slide_id = catalog.add_slide(case_id).await.unwrap();

    let records = catalog.finish_slide(slide_id).await.unwrap();

    let mut scope = store.begin().await.unwrap();
    let slide = store.get_slide(&mut scope, slide_id).await.unwrap();
    assert_eq!(slide.preparation_status(), SlidePreparationStatus::Done);
    assert_eq!(slide.version(), Version::new(2));
    assert_eq!(records.len(), 1);
    assert_eq!(count(&pool, "events").await, 2);
}

// --- outbox ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_fetch_unpublished_orders_by_time_then_append_order(pool: PgPool) {
    let store = PgCatalogStore::new(pool);
    let t0 = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
    let late = record(t0 + Duration::seconds(5));
    let tie_a = record(t0);
    let tie_b = record(t0);

    let mut scope = store.begin().await.unwrap();
    store
        .append(&mut scope, &[late.clone(), tie_a.clone(), tie_b.clone()])
        .await
        .unwrap();
    store.commit(scope).await.unwrap();

    let fetched: Vec<Uuid> = store
        .fetch_unpublished(10)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.event_id)
        .collect();
    let limited = store.fetch_unpublished(2).await.unwrap();

    assert_eq!(fetched, vec![tie_a.event_id, tie_b.event_id, late.event_id]);
    assert_eq!(limited.len(), 2);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_mark_published_is_idempotent_and_hides_rows(pool: PgPool) {
    let store = PgCatalogStore::new(pool);
    let first = record(Utc::now());
    let second = record(Utc::now());

    let mut scope = store.begin().await.unwrap();
    store
        .append(&mut scope, &[first.clone(), second.clone()])
        .await
        .unwrap();
    store.commit(scope).await.unwrap();

    store.mark_published(&[first.event_id]).await.unwrap();
    store.mark_published(&[first.event_id]).await.unwrap();
    store.mark_published(&[]).await.unwrap();

    let remaining = store.fetch_unpublished(10).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].event_id, second.event_id);
    assert!(!remaining[0].published);
}

// --- projection ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_dispatch_projects_case_status(pool: PgPool) {
    let (catalog, _store) = catalog(&pool);
    let projector = Arc::new(PgCaseProjector::new(pool.clone()));
    let registry = HandlerRegistry::builder()
        .register(EventType::SlideCreated, Arc::clone(&projector) as Arc<dyn EventHandler>)
        .register(EventType::SlideFinished, Arc::clone(&projector) as Arc<dyn EventHandler>)
        .build();
    let dispatcher = catalog.dispatcher(registry, 10);
    let case_id = catalog.create_case().await.unwrap();
    let slide_id = catalog.add_slide(case_id).await.unwrap();

    let created = dispatcher.tick().await.unwrap();
    let after_created = projector.status(case_id).await.unwrap();
    catalog.finish_slide(slide_id).await.unwrap();
    let finished = dispatcher.tick().await.unwrap();
    let idle = dispatcher.tick().await.unwrap();

    assert_eq!(created, TickOutcome::Published(1));
    assert_eq!(after_created, Some(CasePreparationStatus::Processing));
    assert_eq!(finished, TickOutcome::Published(1));
    assert_eq!(idle, TickOutcome::Idle);
    assert_eq!(
        projector.status(case_id).await.unwrap(),
        Some(CasePreparationStatus::Done)
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_projector_replay_is_harmless(pool: PgPool) {
    let (catalog, store) = catalog(&pool);
    let projector = PgCaseProjector::new(pool.clone());
    let case_id = catalog.create_case().await.unwrap();
    let slide_id = catalog.add_slide(case_id).await.unwrap();
    let records = catalog.finish_slide(slide_id).await.unwrap();
    let event = CatalogEvent::from_record(&records[0]).unwrap();

    projector.handle(&event).await.unwrap();
    projector.handle(&event).await.unwrap();

    assert_eq!(
        projector.status(case_id).await.unwrap(),
        Some(CasePreparationStatus::Done)
    );
    assert_eq!(count(&pool, "case_projections").await, 1);
    assert_eq!(store.fetch_unpublished(10).await.unwrap().len(), 2);
}
