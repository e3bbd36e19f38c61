//! Entry point bundling the catalog use cases with their dependencies.

use std::sync::Arc;

use catalog_core::clock::Clock;
use catalog_core::error::DomainError;
use catalog_core::outbox::OutboxRecord;
use uuid::Uuid;

use super::command_handlers;
use super::dispatcher::{Dispatcher, DispatcherConfig, DispatcherHandle};
use super::handlers::HandlerRegistry;
use super::query_handlers::{self, CaseView};
use crate::domain::commands::{AddSlide, CreateCase, FinishSlide};
use crate::domain::repository::CatalogStore;

/// The catalog's use-case boundary over a store and a clock.
pub struct Catalog<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S> Clone for Catalog<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S> Catalog<S>
where
    S: CatalogStore + 'static,
{
    /// Creates a new `Catalog`.
    #[must_use]
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Creates an empty case and returns its id.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the case cannot be written.
    pub async fn create_case(&self) -> Result<Uuid, DomainError> {
        command_handlers::handle_create_case(&CreateCase, &self.store).await
    }

    /// Adds a slide to `case_id` and returns the slide's id.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the case does not exist.
    pub async fn add_slide(&self, case_id: Uuid) -> Result<Uuid, DomainError> {
        command_handlers::handle_add_slide(&AddSlide { case_id }, &self.clock, &self.store).await
    }

    /// Marks `slide_id` finished and returns the appended outbox rows.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` or `DomainError::VersionConflict`.
    pub async fn finish_slide(&self, slide_id: Uuid) -> Result<Vec<OutboxRecord>, DomainError> {
        command_handlers::handle_finish_slide(&FinishSlide { slide_id }, &self.clock, &self.store)
            .await
    }

    /// Reads a case with its slides.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the case does not exist.
    pub async fn case_overview(&self, case_id: Uuid) -> Result<CaseView, DomainError> {
        query_handlers::get_case_overview(case_id, &self.store).await
    }

    /// Builds a dispatcher over this catalog's outbox without starting it.
    #[must_use]
    pub fn dispatcher(&self, registry: HandlerRegistry, batch_size: usize) -> Dispatcher<S> {
        Dispatcher::new(Arc::clone(&self.store), registry, batch_size)
    }

    /// Starts the background dispatcher.
    #[must_use]
    pub fn start_dispatcher(
        &self,
        registry: HandlerRegistry,
        config: DispatcherConfig,
    ) -> DispatcherHandle {
        self.dispatcher(registry, config.batch_size)
            .spawn(config.interval)
    }
}

impl<S> std::fmt::Debug for Catalog<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog").finish_non_exhaustive()
    }
}
