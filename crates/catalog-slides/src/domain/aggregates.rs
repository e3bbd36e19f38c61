//! Aggregate roots for the catalog context.

use catalog_core::aggregate::{AggregateRoot, Version};
use catalog_core::clock::Clock;
use catalog_core::event::EventMetadata;
use uuid::Uuid;

use super::events::{CatalogEvent, CatalogEventKind, SlideCreated, SlideFinished};
use super::status::{CasePreparationStatus, SlidePreparationStatus, case_preparation_status};

/// The aggregate root for a case. Owns slides by reference only.
///
/// A case raises no events of its own. Its version is the concurrency guard
/// for its slide set: every slide write saves the case too.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Case {
    /// Aggregate identifier.
    pub id: Uuid,
    version: Version,
}

impl Case {
    /// Creates a case that has not been persisted yet.
    #[must_use]
    pub fn create() -> Self {
        Self {
            id: Uuid::now_v7(),
            version: Version::NEW,
        }
    }

    /// Rebuilds a case from its stored columns.
    #[must_use]
    pub const fn restore(id: Uuid, version: Version) -> Self {
        Self { id, version }
    }
}

impl AggregateRoot for Case {
    type Event = CatalogEvent;

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn uncommitted_events(&self) -> &[Self::Event] {
        &[]
    }

    fn pull_events(&mut self) -> Vec<Self::Event> {
        Vec::new()
    }
}

/// The aggregate root for a slide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slide {
    /// Aggregate identifier.
    pub id: Uuid,
    /// The case this slide belongs to.
    pub case_id: Uuid,
    version: Version,
    preparation_status: SlidePreparationStatus,
    /// Uncommitted events pending persistence.
    uncommitted_events: Vec<CatalogEvent>,
}

impl Slide {
    /// Registers a new slide under `case_id`, raising `SlideCreated`.
    ///
    /// `case_slides` are the slides the case already has; the event carries
    /// the case status with the new slide included.
    #[must_use]
    pub fn create(case_id: Uuid, case_slides: &[Slide], clock: &dyn Clock) -> Self {
        let mut slide = Self {
            id: Uuid::now_v7(),
            case_id,
            version: Version::NEW,
            preparation_status: SlidePreparationStatus::NotStarted,
            uncommitted_events: Vec::new(),
        };

        let case_preparation_status = slide.case_status_with(case_slides);
        slide.raise(
            CatalogEventKind::SlideCreated(SlideCreated {
                case_id,
                slide_id: slide.id,
                case_preparation_status,
            }),
            clock,
        );
        slide
    }

    /// Rebuilds a slide from its stored columns.
    #[must_use]
    pub const fn restore(
        id: Uuid,
        case_id: Uuid,
        version: Version,
        preparation_status: SlidePreparationStatus,
    ) -> Self {
        Self {
            id,
            case_id,
            version,
            preparation_status,
            uncommitted_events: Vec::new(),
        }
    }

    /// Returns the slide's preparation status.
    #[must_use]
    pub const fn preparation_status(&self) -> SlidePreparationStatus {
        self.preparation_status
    }

    /// Marks the slide done, raising `SlideFinished`.
    ///
    /// `case_slides` may include this slide; its stored copy is ignored in
    /// favour of the in-memory state.
    pub fn finish(&mut self, case_slides: &[Slide], clock: &dyn Clock) {
        self.preparation_status = SlidePreparationStatus::Done;

        let case_preparation_status = self.case_status_with(case_slides);
        self.raise(
            CatalogEventKind::SlideFinished(SlideFinished {
                case_id: self.case_id,
                slide_id: self.id,
                case_preparation_status,
            }),
            clock,
        );
    }

    fn case_status_with(&self, case_slides: &[Slide]) -> CasePreparationStatus {
        let siblings = case_slides
            .iter()
            .filter(|other| other.id != self.id)
            .map(Slide::preparation_status);
        case_preparation_status(siblings.chain(std::iter::once(self.preparation_status)))
    }

    fn raise(&mut self, kind: CatalogEventKind, clock: &dyn Clock) {
        self.uncommitted_events.push(CatalogEvent {
            metadata: EventMetadata {
                event_id: Uuid::now_v7(),
                aggregate_id: self.id,
                occurred_at: clock.now(),
            },
            kind,
        });
    }
}

impl AggregateRoot for Slide {
    type Event = CatalogEvent;

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn uncommitted_events(&self) -> &[Self::Event] {
        &self.uncommitted_events
    }

    fn pull_events(&mut self) -> Vec<Self::Event> {
        std::mem::take(&mut self.uncommitted_events)
    }
}
