//! Repository ports for the catalog aggregates.
//!
//! Every method takes the unit-of-work scope explicitly; implementations
//! must run the statement on that transaction and nowhere else. Saves use
//! the aggregate's version as the optimistic-concurrency token and never
//! take row locks ahead of the write.

use async_trait::async_trait;
use catalog_core::aggregate::Version;
use catalog_core::error::DomainError;
use catalog_core::outbox::Outbox;
use catalog_core::unit_of_work::UnitOfWork;
use uuid::Uuid;

use super::aggregates::{Case, Slide};

/// Persistence for [`Case`] aggregates.
#[async_trait]
pub trait CaseRepository: UnitOfWork {
    /// Loads a case.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if no case has this id.
    async fn get_case(&self, scope: &mut Self::Scope, id: Uuid) -> Result<Case, DomainError>;

    /// Inserts a new case at version 1, or bumps an existing one by 1 if its
    /// stored version still equals `case.version()`. On success the new
    /// version is written back into `case` and returned.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::VersionConflict` if the stored version moved on
    /// (or, for a new case, the id is already taken); nothing is written.
    async fn save_case(&self, scope: &mut Self::Scope, case: &mut Case)
    -> Result<Version, DomainError>;
}

/// Persistence for [`Slide`] aggregates.
#[async_trait]
pub trait SlideRepository: UnitOfWork {
    /// Loads a slide.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if no slide has this id.
    async fn get_slide(&self, scope: &mut Self::Scope, id: Uuid) -> Result<Slide, DomainError>;

    /// Loads every slide of a case (empty if the case has none).
    async fn slides_for_case(
        &self,
        scope: &mut Self::Scope,
        case_id: Uuid,
    ) -> Result<Vec<Slide>, DomainError>;

    /// Same contract as [`CaseRepository::save_case`], also writing the
    /// slide's preparation status. Pending events are not touched.
    async fn save_slide(
        &self,
        scope: &mut Self::Scope,
        slide: &mut Slide,
    ) -> Result<Version, DomainError>;
}

/// Everything the catalog use cases and dispatcher need from storage.
pub trait CatalogStore: CaseRepository + SlideRepository + Outbox {}

impl<T> CatalogStore for T where T: CaseRepository + SlideRepository + Outbox + ?Sized {}
