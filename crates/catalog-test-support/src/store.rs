//! In-memory catalog store with real commit/rollback semantics.
//!
//! A scope works on a private copy of the aggregates taken at `begin`, so
//! reads inside the scope see its own writes and nothing it wrote is visible
//! to anyone else until `commit`. Commit re-checks every save against the
//! shared state and applies either all of the scope's writes or none.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use catalog_core::aggregate::{AggregateRoot, Version};
use catalog_core::error::DomainError;
use catalog_core::outbox::{Outbox, OutboxRecord};
use catalog_core::unit_of_work::UnitOfWork;
use catalog_slides::domain::aggregates::{Case, Slide};
use catalog_slides::domain::repository::{CaseRepository, SlideRepository};
use catalog_slides::domain::status::SlidePreparationStatus;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StoredSlide {
    case_id: Uuid,
    version: i64,
    status: SlidePreparationStatus,
}

#[derive(Debug, Clone)]
struct StoredEvent {
    seq: u64,
    record: OutboxRecord,
}

#[derive(Debug, Default)]
struct State {
    cases: HashMap<Uuid, i64>,
    slides: HashMap<Uuid, StoredSlide>,
    events: Vec<StoredEvent>,
    next_seq: u64,
}

#[derive(Debug)]
enum Write {
    Case { id: Uuid, expected: i64 },
    Slide { id: Uuid, expected: i64, row: StoredSlide },
    Events(Vec<OutboxRecord>),
}

/// Transaction handle of [`InMemoryCatalogStore`].
#[derive(Debug)]
pub struct MemoryScope {
    cases: HashMap<Uuid, i64>,
    slides: HashMap<Uuid, StoredSlide>,
    writes: Vec<Write>,
}

/// A [`catalog_slides::domain::repository::CatalogStore`] held in memory.
///
/// Failure switches make the next matching call fail once with a storage
/// error, for exercising rollback paths.
#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    state: Mutex<State>,
    fail_next_append: AtomicBool,
    fail_next_slide_save: AtomicBool,
    fail_next_commit: AtomicBool,
    fail_next_mark_published: AtomicBool,
    yield_after_slide_reads: AtomicBool,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
}

fn take_flag(flag: &AtomicBool) -> bool {
    flag.swap(false, Ordering::AcqRel)
}

fn conflict(id: Uuid, expected: i64) -> DomainError {
    DomainError::VersionConflict {
        aggregate_id: id,
        expected: Version::new(expected),
    }
}

/// Applies one save to a version map, returning the new version.
fn bump(versions: &mut HashMap<Uuid, i64>, id: Uuid, expected: i64) -> Result<i64, DomainError> {
    match (expected, versions.get(&id).copied()) {
        (0, None) => {
            versions.insert(id, 1);
            Ok(1)
        }
        (0, Some(_)) | (_, None) => Err(conflict(id, expected)),
        (expected, Some(stored)) if stored == expected => {
            versions.insert(id, stored + 1);
            Ok(stored + 1)
        }
        (expected, Some(_)) => Err(conflict(id, expected)),
    }
}

/// Re-checks every save of a scope against committed state, in order.
fn validate(state: &State, writes: &[Write]) -> Result<(), DomainError> {
    let mut cases = state.cases.clone();
    let mut slides: HashMap<Uuid, i64> = state
        .slides
        .iter()
        .map(|(id, row)| (*id, row.version))
        .collect();

    for write in writes {
        match write {
            Write::Case { id, expected } => {
                bump(&mut cases, *id, *expected)?;
            }
            Write::Slide { id, expected, .. } => {
                bump(&mut slides, *id, *expected)?;
            }
            Write::Events(_) => {}
        }
    }
    Ok(())
}

impl InMemoryCatalogStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `append` fail.
    pub fn fail_next_append(&self) {
        self.fail_next_append.store(true, Ordering::Release);
    }

    /// Makes the next `save_slide` fail.
    pub fn fail_next_slide_save(&self) {
        self.fail_next_slide_save.store(true, Ordering::Release);
    }

    /// Makes the next `commit` fail; its scope is discarded.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::Release);
    }

    /// Makes the next `mark_published` fail.
    pub fn fail_next_mark_published(&self) {
        self.fail_next_mark_published.store(true, Ordering::Release);
    }

    /// Makes every `slides_for_case` yield to the runtime before returning,
    /// so writers joined on one task interleave between read and save.
    pub fn yield_after_slide_reads(&self) {
        self.yield_after_slide_reads.store(true, Ordering::Release);
    }

    /// Committed version of a case, if it exists.
    pub fn case_version(&self, id: Uuid) -> Option<i64> {
        self.state.lock().unwrap().cases.get(&id).copied()
    }

    /// Committed copy of a slide, if it exists.
    pub fn slide(&self, id: Uuid) -> Option<Slide> {
        self.state
            .lock()
            .unwrap()
            .slides
            .get(&id)
            .map(|row| Slide::restore(id, row.case_id, Version::new(row.version), row.status))
    }

    /// Number of committed slides.
    pub fn slide_count(&self) -> usize {
        self.state.lock().unwrap().slides.len()
    }

    /// Every committed event, in append order.
    pub fn events(&self) -> Vec<OutboxRecord> {
        self.state
            .lock()
            .unwrap()
            .events
            .iter()
            .map(|e| e.record.clone())
            .collect()
    }

    /// Number of committed events not yet published.
    pub fn unpublished_count(&self) -> usize {
        self.state
            .lock()
            .unwrap()
            .events
            .iter()
            .filter(|e| !e.record.published)
            .count()
    }

    /// Number of successful commits.
    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::Acquire)
    }

    /// Number of rollbacks, including scopes discarded by a failed commit.
    pub fn rollbacks(&self) -> usize {
        self.rollbacks.load(Ordering::Acquire)
    }
}

#[async_trait]
impl UnitOfWork for InMemoryCatalogStore {
    type Scope = MemoryScope;

    async fn begin(&self) -> Result<MemoryScope, DomainError> {
        let state = self.state.lock().unwrap();
        Ok(MemoryScope {
            cases: state.cases.clone(),
            slides: state.slides.clone(),
            writes: Vec::new(),
        })
    }

    async fn commit(&self, scope: MemoryScope) -> Result<(), DomainError> {
        if take_flag(&self.fail_next_commit) {
            self.rollbacks.fetch_add(1, Ordering::AcqRel);
            return Err(DomainError::storage("commit", "injected failure"));
        }

        let mut state = self.state.lock().unwrap();
        if let Err(err) = validate(&state, &scope.writes) {
            self.rollbacks.fetch_add(1, Ordering::AcqRel);
            return Err(err);
        }

        for write in scope.writes {
            match write {
                Write::Case { id, expected } => {
                    state.cases.insert(id, expected + 1);
                }
                Write::Slide { id, row, .. } => {
                    state.slides.insert(id, row);
                }
                Write::Events(records) => {
                    for record in records {
                        let seq = state.next_seq;
                        state.next_seq += 1;
                        state.events.push(StoredEvent { seq, record });
                    }
                }
            }
        }

        self.commits.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    async fn rollback(&self, _scope: MemoryScope) -> Result<(), DomainError> {
        self.rollbacks.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}

#[async_trait]
impl CaseRepository for InMemoryCatalogStore {
    async fn get_case(&self, scope: &mut MemoryScope, id: Uuid) -> Result<Case, DomainError> {
        scope
            .cases
            .get(&id)
            .map(|version| Case::restore(id, Version::new(*version)))
            .ok_or(DomainError::NotFound { kind: "case", id })
    }

    async fn save_case(
        &self,
        scope: &mut MemoryScope,
        case: &mut Case,
    ) -> Result<Version, DomainError> {
        let expected = case.version().get();
        let version = Version::new(bump(&mut scope.cases, case.id, expected)?);

        scope.writes.push(Write::Case {
            id: case.id,
            expected,
        });
        case.set_version(version);
        Ok(version)
    }
}

#[async_trait]
impl SlideRepository for InMemoryCatalogStore {
    async fn get_slide(&self, scope: &mut MemoryScope, id: Uuid) -> Result<Slide, DomainError> {
        scope
            .slides
            .get(&id)
            .map(|row| Slide::restore(id, row.case_id, Version::new(row.version), row.status))
            .ok_or(DomainError::NotFound { kind: "slide", id })
    }

    async fn slides_for_case(
        &self,
        scope: &mut MemoryScope,
        case_id: Uuid,
    ) -> Result<Vec<Slide>, DomainError> {
        let mut slides: Vec<Slide> = scope
            .slides
            .iter()
            .filter(|(_, row)| row.case_id == case_id)
            .map(|(id, row)| Slide::restore(*id, row.case_id, Version::new(row.version), row.status))
            .collect();
        slides.sort_by_key(|s| s.id);

        if self.yield_after_slide_reads.load(Ordering::Acquire) {
            tokio::task::yield_now().await;
        }
        Ok(slides)
    }

    async fn save_slide(
        &self,
        scope: &mut MemoryScope,
        slide: &mut Slide,
    ) -> Result<Version, DomainError> {
        if take_flag(&self.fail_next_slide_save) {
            return Err(DomainError::storage("save slide", "injected failure"));
        }

        let expected = slide.version().get();
        let mut versions: HashMap<Uuid, i64> =
            scope.slides.iter().map(|(id, row)| (*id, row.version)).collect();
        let version = bump(&mut versions, slide.id, expected)?;

        let row = StoredSlide {
            case_id: slide.case_id,
            version,
            status: slide.preparation_status(),
        };
        scope.slides.insert(slide.id, row);
        scope.writes.push(Write::Slide {
            id: slide.id,
            expected,
            row,
        });

        let version = Version::new(version);
        slide.set_version(version);
        Ok(version)
    }
}

#[async_trait]
impl Outbox for InMemoryCatalogStore {
    async fn append(
        &self,
        scope: &mut MemoryScope,
        records: &[OutboxRecord],
    ) -> Result<(), DomainError> {
        if take_flag(&self.fail_next_append) {
            return Err(DomainError::storage("insert events", "injected failure"));
        }
        if records.is_empty() {
            return Ok(());
        }

        let records = records
            .iter()
            .cloned()
            .map(|mut record| {
                record.published = false;
                record
            })
            .collect();
        scope.writes.push(Write::Events(records));
        Ok(())
    }

    async fn fetch_unpublished(&self, limit: usize) -> Result<Vec<OutboxRecord>, DomainError> {
        let state = self.state.lock().unwrap();
        let mut pending: Vec<&StoredEvent> =
            state.events.iter().filter(|e| !e.record.published).collect();
        pending.sort_by_key(|e| (e.record.created_at, e.seq));

        Ok(pending
            .into_iter()
            .take(limit)
            .map(|e| e.record.clone())
            .collect())
    }

    async fn mark_published(&self, event_ids: &[Uuid]) -> Result<(), DomainError> {
        if take_flag(&self.fail_next_mark_published) {
            return Err(DomainError::storage("mark events published", "injected failure"));
        }

        let mut state = self.state.lock().unwrap();
        for event in &mut state.events {
            if event_ids.contains(&event.record.event_id) {
                event.record.published = true;
            }
        }
        Ok(())
    }
}
