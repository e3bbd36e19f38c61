//! Query handlers for the catalog context.
//!
//! Queries read aggregates through a unit of work like commands do, so a
//! view never mixes a case with slides from a different commit.

use std::sync::Arc;

use catalog_core::aggregate::AggregateRoot;
use catalog_core::error::DomainError;
use catalog_core::unit_of_work::run_in_scope;
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use crate::domain::repository::CatalogStore;
use crate::domain::status::{CasePreparationStatus, SlidePreparationStatus, case_preparation_status};

/// Read-only view of one slide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlideView {
    /// The slide identifier.
    pub slide_id: Uuid,
    /// Stored version.
    pub version: i64,
    /// Current preparation status.
    pub preparation_status: SlidePreparationStatus,
}

/// Read-only view of a case and its slides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseView {
    /// The case identifier.
    pub case_id: Uuid,
    /// Stored version.
    pub version: i64,
    /// Status derived from the current slides.
    pub preparation_status: CasePreparationStatus,
    /// Every slide of the case.
    pub slides: Vec<SlideView>,
}

/// Loads a case together with its slides and derived status.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the case does not exist, or a storage
/// error if the reads fail.
#[instrument(skip(store))]
pub async fn get_case_overview<S>(case_id: Uuid, store: &Arc<S>) -> Result<CaseView, DomainError>
where
    S: CatalogStore + 'static,
{
    let tx_store = Arc::clone(store);

    run_in_scope(store.as_ref(), move |scope| {
        Box::pin(async move {
            let case = tx_store.get_case(scope, case_id).await?;
            let slides = tx_store.slides_for_case(scope, case_id).await?;

            Ok(CaseView {
                case_id,
                version: case.version().get(),
                preparation_status: case_preparation_status(
                    slides.iter().map(|s| s.preparation_status()),
                ),
                slides: slides
                    .iter()
                    .map(|s| SlideView {
                        slide_id: s.id,
                        version: s.version().get(),
                        preparation_status: s.preparation_status(),
                    })
                    .collect(),
            })
        })
    })
    .await
}
