//! Shared helpers for catalog integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use catalog_core::clock::Clock;
use catalog_slides::application::catalog::Catalog;
use catalog_test_support::{FixedClock, InMemoryCatalogStore, SteppingClock};
use chrono::{DateTime, Duration, TimeZone, Utc};

/// Fixed timestamp used as the starting instant across tests.
pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
}

/// A catalog over a fresh in-memory store whose clock never moves.
pub fn fixed_catalog() -> (Catalog<InMemoryCatalogStore>, Arc<InMemoryCatalogStore>) {
    let clock: Arc<dyn Clock> = Arc::new(FixedClock(start()));
    build(clock)
}

/// A catalog over a fresh in-memory store whose clock moves one second per
/// event, so outbox order follows emission order by timestamp.
pub fn stepping_catalog() -> (Catalog<InMemoryCatalogStore>, Arc<InMemoryCatalogStore>) {
    let clock: Arc<dyn Clock> = Arc::new(SteppingClock::new(start(), Duration::seconds(1)));
    build(clock)
}

fn build(clock: Arc<dyn Clock>) -> (Catalog<InMemoryCatalogStore>, Arc<InMemoryCatalogStore>) {
    let store = Arc::new(InMemoryCatalogStore::new());
    (Catalog::new(Arc::clone(&store), clock), store)
}

/// Creates a case with `slides` slides and returns the case and slide ids.
pub async fn seed_case(
    catalog: &Catalog<InMemoryCatalogStore>,
    slides: usize,
) -> (uuid::Uuid, Vec<uuid::Uuid>) {
    let case_id = catalog.create_case().await.unwrap();
    let mut slide_ids = Vec::with_capacity(slides);
    for _ in 0..slides {
        slide_ids.push(catalog.add_slide(case_id).await.unwrap());
    }
    (case_id, slide_ids)
}
