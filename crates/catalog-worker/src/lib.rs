//! Slide catalog worker: configuration and wiring for the dispatcher
//! process.

pub mod config;
pub mod error;
pub mod worker;
