//! Shared test doubles for the slide catalog.
//!
//! Helpers here lock internal mutexes with `unwrap`; a poisoned mutex means
//! another test thread already panicked.

mod clock;
mod handlers;
mod store;

pub use clock::{FixedClock, SteppingClock};
pub use handlers::{InMemoryCaseProjection, RecordingHandler};
pub use store::{InMemoryCatalogStore, MemoryScope};
