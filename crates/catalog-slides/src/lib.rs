//! Slide Catalog: cases, slides and their outbox.
//!
//! Responsible for the case and slide aggregates, the events their intent
//! operations raise, the use cases that persist both atomically, and the
//! dispatcher that delivers outbox events to projection handlers.

pub mod application;
pub mod domain;
