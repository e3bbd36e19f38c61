//! Time source for event timestamps.

use chrono::{DateTime, Utc};

/// Supplies `created_at` stamps for raised events.
///
/// Injected so tests can pin or step time and assert outbox ordering.
pub trait Clock: Send + Sync {
    /// Returns the current instant in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock backed by [`Utc::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
