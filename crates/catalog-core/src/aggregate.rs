//! Aggregate root abstraction and the optimistic-concurrency version token.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::DomainEvent;

/// Optimistic-concurrency token of a state-stored aggregate.
///
/// An aggregate that has never been written carries [`Version::NEW`] (0).
/// The first successful save stamps 1 and every later save adds exactly 1,
/// so a stored version always equals the number of successful writes.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Version(i64);

impl Version {
    /// Version of an aggregate that has not been persisted yet.
    pub const NEW: Self = Self(0);

    /// Wraps a raw stored version.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the raw version number.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Returns `true` if the aggregate has never been persisted.
    #[must_use]
    pub const fn is_new(self) -> bool {
        self.0 == 0
    }

    /// Returns the version a successful write will stamp.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trait for aggregate roots persisted as current state plus an outbox of
/// the events their intent operations raised.
pub trait AggregateRoot: Send + Sync {
    /// The event type this aggregate raises.
    type Event: DomainEvent;

    /// Returns the aggregate identifier.
    fn aggregate_id(&self) -> Uuid;

    /// Returns the version the aggregate was loaded (or last saved) at.
    fn version(&self) -> Version;

    /// Records the version stamped by a successful save.
    fn set_version(&mut self, version: Version);

    /// Returns events raised since the aggregate was loaded.
    fn uncommitted_events(&self) -> &[Self::Event];

    /// Drains the pending-event buffer.
    ///
    /// Called exactly once per unit of work, by the code that appends the
    /// events to the outbox.
    fn pull_events(&mut self) -> Vec<Self::Event>;
}
