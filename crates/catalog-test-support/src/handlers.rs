//! Test event handlers: an in-memory case projection and a recorder.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use catalog_core::error::DomainError;
use catalog_slides::application::handlers::EventHandler;
use catalog_slides::domain::events::{CatalogEvent, EventType};
use catalog_slides::domain::status::CasePreparationStatus;
use uuid::Uuid;

#[derive(Debug, Default)]
struct ProjectionState {
    statuses: HashMap<Uuid, CasePreparationStatus>,
    calls: usize,
    writes: usize,
}

/// Idempotent case-status projection kept in memory.
///
/// Upserts the status carried by each event, writing only when the value
/// changes. Can be told to fail on its `n`th call (1-based, counting every
/// call) to simulate a handler error mid-batch.
#[derive(Debug, Default)]
pub struct InMemoryCaseProjection {
    state: Mutex<ProjectionState>,
    fail_on_call: Option<usize>,
}

impl InMemoryCaseProjection {
    /// Creates a projection that never fails.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a projection whose `n`th call fails without writing.
    #[must_use]
    pub fn failing_on_call(n: usize) -> Self {
        Self {
            fail_on_call: Some(n),
            ..Self::default()
        }
    }

    /// Projected status of a case.
    pub fn status(&self, case_id: Uuid) -> Option<CasePreparationStatus> {
        self.state.lock().unwrap().statuses.get(&case_id).copied()
    }

    /// Number of projected cases.
    pub fn len(&self) -> usize {
        self.state.lock().unwrap().statuses.len()
    }

    /// Returns `true` if nothing has been projected.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `handle` calls, failed ones included.
    pub fn calls(&self) -> usize {
        self.state.lock().unwrap().calls
    }

    /// Number of calls that changed a stored status.
    pub fn writes(&self) -> usize {
        self.state.lock().unwrap().writes
    }
}

#[async_trait]
impl EventHandler for InMemoryCaseProjection {
    fn name(&self) -> &'static str {
        "in_memory_case_projection"
    }

    async fn handle(&self, event: &CatalogEvent) -> Result<(), DomainError> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;

        if self.fail_on_call == Some(state.calls) {
            return Err(DomainError::Handler(format!(
                "projection unavailable on call {}",
                state.calls
            )));
        }

        let status = event.case_preparation_status();
        if state.statuses.get(&event.case_id()) != Some(&status) {
            state.statuses.insert(event.case_id(), status);
            state.writes += 1;
        }
        Ok(())
    }
}

/// Records every event it receives, in order.
#[derive(Debug)]
pub struct RecordingHandler {
    name: &'static str,
    seen: Mutex<Vec<(EventType, Uuid)>>,
}

impl RecordingHandler {
    /// Creates a recorder reporting `name` in dispatch logs.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Event types and ids received so far.
    pub fn seen(&self) -> Vec<(EventType, Uuid)> {
        self.seen.lock().unwrap().clone()
    }

    /// Ids received so far.
    pub fn event_ids(&self) -> Vec<Uuid> {
        self.seen().into_iter().map(|(_, id)| id).collect()
    }
}

#[async_trait]
impl EventHandler for RecordingHandler {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn handle(&self, event: &CatalogEvent) -> Result<(), DomainError> {
        self.seen
            .lock()
            .unwrap()
            .push((event.kind_type(), event.metadata.event_id));
        Ok(())
    }
}
