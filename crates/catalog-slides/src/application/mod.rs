//! Application services for the catalog context.

pub mod catalog;
pub mod command_handlers;
pub mod dispatcher;
pub mod handlers;
pub mod query_handlers;
