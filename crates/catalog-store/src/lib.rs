//! PostgreSQL adapters for the slide catalog.
//!
//! Every write made through a [`PgCatalogStore`] scope runs on one
//! `sqlx::Transaction`; the outbox reads and flag updates used by the
//! dispatcher run on the pool directly.

pub mod pg_case_projector;
pub mod pg_catalog_store;
mod rows;

pub use pg_case_projector::PgCaseProjector;
pub use pg_catalog_store::PgCatalogStore;
