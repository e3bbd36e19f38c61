//! Command handlers for the catalog context.
//!
//! Each handler runs in exactly one unit of work: load the aggregate,
//! execute the intent, drain its pending events, then save the aggregate and
//! append the events through the same scope. Either both land or neither.
//!
//! Slide writes also save the owning case. Its version is bumped on every
//! change to the slide set, so two writers that derived the case status from
//! the same snapshot cannot both commit.

use std::sync::Arc;

use catalog_core::aggregate::AggregateRoot;
use catalog_core::clock::Clock;
use catalog_core::command::Command;
use catalog_core::error::DomainError;
use catalog_core::event::DomainEvent;
use catalog_core::outbox::OutboxRecord;
use catalog_core::unit_of_work::run_in_scope;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::aggregates::{Case, Slide};
use crate::domain::commands::{AddSlide, CreateCase, FinishSlide};
use crate::domain::events::CatalogEvent;
use crate::domain::repository::CatalogStore;

/// Serializes drained events and appends them through `scope`.
async fn append_events<S>(
    store: &S,
    scope: &mut S::Scope,
    events: &[CatalogEvent],
) -> Result<Vec<OutboxRecord>, DomainError>
where
    S: CatalogStore,
{
    let records = events
        .iter()
        .map(DomainEvent::to_record)
        .collect::<Result<Vec<_>, _>>()?;
    store.append(scope, &records).await?;
    Ok(records)
}

/// Handles the `CreateCase` command: persists a fresh case at version 1.
///
/// # Errors
///
/// Returns `DomainError` if the insert or commit fails.
#[instrument(skip_all, fields(command = command.command_type()))]
pub async fn handle_create_case<S>(command: &CreateCase, store: &Arc<S>) -> Result<Uuid, DomainError>
where
    S: CatalogStore + 'static,
{
    let tx_store = Arc::clone(store);

    let case_id = run_in_scope(store.as_ref(), move |scope| {
        Box::pin(async move {
            let mut case = Case::create();
            tx_store.save_case(scope, &mut case).await?;
            Ok(case.id)
        })
    })
    .await?;

    info!(%case_id, "case created");
    Ok(case_id)
}

/// Handles the `AddSlide` command: loads the case, creates the slide, and
/// persists both together with the `SlideCreated` event.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the case does not exist (nothing is
/// written), `DomainError::VersionConflict` if another writer changed the
/// case's slides first, or a storage error if any statement or the commit
/// fails.
#[instrument(skip_all, fields(command = command.command_type(), case_id = %command.case_id))]
pub async fn handle_add_slide<S>(
    command: &AddSlide,
    clock: &Arc<dyn Clock>,
    store: &Arc<S>,
) -> Result<Uuid, DomainError>
where
    S: CatalogStore + 'static,
{
    let case_id = command.case_id;
    let clock = Arc::clone(clock);
    let tx_store = Arc::clone(store);

    let slide_id = run_in_scope(store.as_ref(), move |scope| {
        Box::pin(async move {
            let mut case = tx_store.get_case(scope, case_id).await?;
            let case_slides = tx_store.slides_for_case(scope, case_id).await?;

            let mut slide = Slide::create(case_id, &case_slides, clock.as_ref());
            let events = slide.pull_events();

            tx_store.save_case(scope, &mut case).await?;
            tx_store.save_slide(scope, &mut slide).await?;
            append_events(tx_store.as_ref(), scope, &events).await?;
            Ok(slide.id)
        })
    })
    .await?;

    info!(%slide_id, "slide added");
    Ok(slide_id)
}

/// Handles the `FinishSlide` command: marks the slide done and persists it
/// together with its `SlideFinished` event.
///
/// Returns the outbox rows that were appended.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the slide does not exist,
/// `DomainError::VersionConflict` if another writer saved the slide or any
/// sibling first, or a storage error. Nothing is written in any of these
/// cases.
#[instrument(skip_all, fields(command = command.command_type(), slide_id = %command.slide_id))]
pub async fn handle_finish_slide<S>(
    command: &FinishSlide,
    clock: &Arc<dyn Clock>,
    store: &Arc<S>,
) -> Result<Vec<OutboxRecord>, DomainError>
where
    S: CatalogStore + 'static,
{
    let slide_id = command.slide_id;
    let clock = Arc::clone(clock);
    let tx_store = Arc::clone(store);

    let records = run_in_scope(store.as_ref(), move |scope| {
        Box::pin(async move {
            let mut slide = tx_store.get_slide(scope, slide_id).await?;
            let mut case = tx_store.get_case(scope, slide.case_id).await?;
            let case_slides = tx_store.slides_for_case(scope, case.id).await?;

            slide.finish(&case_slides, clock.as_ref());
            let events = slide.pull_events();

            tx_store.save_case(scope, &mut case).await?;
            tx_store.save_slide(scope, &mut slide).await?;
            append_events(tx_store.as_ref(), scope, &events).await
        })
    })
    .await?;

    info!(events = records.len(), "slide finished");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use catalog_core::command::Command;

    use crate::domain::commands::{AddSlide, CreateCase, FinishSlide};

    #[test]
    fn test_command_types_are_namespaced() {
        let id = uuid::Uuid::new_v4();

        assert_eq!(CreateCase.command_type(), "catalog.create_case");
        assert_eq!(AddSlide { case_id: id }.command_type(), "catalog.add_slide");
        assert_eq!(
            FinishSlide { slide_id: id }.command_type(),
            "catalog.finish_slide"
        );
    }
}
