//! Catalog Core: shared persistence abstractions.
//!
//! This crate defines the aggregate, event, outbox and unit-of-work
//! contracts that the catalog context and its storage adapters agree on.
//! It contains no infrastructure code.

pub mod aggregate;
pub mod clock;
pub mod command;
pub mod error;
pub mod event;
pub mod outbox;
pub mod unit_of_work;
