//! Background dispatcher that drains the outbox into registered handlers.
//!
//! One dispatcher owns one periodic task. Each tick fetches a bounded batch of
//! unpublished events, runs every registered handler for each event in fetch
//! order, and marks the whole batch published only if nothing failed. A
//! failed batch stays unpublished and is re-dispatched in full on the next
//! tick.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use catalog_core::error::DomainError;
use catalog_core::outbox::Outbox;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::handlers::HandlerRegistry;
use crate::domain::events::CatalogEvent;

/// Dispatcher tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Wall-clock period between ticks.
    pub interval: Duration,
    /// Maximum number of events fetched per tick.
    pub batch_size: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            batch_size: 10,
        }
    }
}

/// Result of one dispatch tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No unpublished events were waiting.
    Idle,
    /// This many events were dispatched and marked published.
    Published(usize),
    /// Another tick was still running; nothing was done.
    Skipped,
}

/// Drains an [`Outbox`] into the handlers of a [`HandlerRegistry`].
pub struct Dispatcher<O> {
    outbox: Arc<O>,
    registry: HandlerRegistry,
    batch_size: usize,
    busy: AtomicBool,
}

/// Clears the busy flag when a tick ends, including when its future is
/// dropped mid-batch.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<O> Dispatcher<O>
where
    O: Outbox + 'static,
{
    /// Creates a dispatcher over `outbox` with a frozen handler registry.
    /// A `batch_size` of zero is treated as one.
    #[must_use]
    pub fn new(outbox: Arc<O>, registry: HandlerRegistry, batch_size: usize) -> Self {
        Self {
            outbox,
            registry,
            batch_size: batch_size.max(1),
            busy: AtomicBool::new(false),
        }
    }

    /// Maximum number of events fetched per tick.
    #[must_use]
    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Runs one dispatch cycle.
    ///
    /// Returns [`TickOutcome::Skipped`] without touching the outbox if a
    /// previous tick on this dispatcher has not finished.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Handler` if any handler fails,
    /// `DomainError::Storage` if a record cannot be decoded or the outbox
    /// cannot be read or updated. In every error case the fetched batch is
    /// left unpublished.
    pub async fn tick(&self) -> Result<TickOutcome, DomainError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("dispatch tick already in progress, skipping");
            return Ok(TickOutcome::Skipped);
        }
        let _guard = BusyGuard(&self.busy);

        self.dispatch_batch().await
    }

    #[instrument(skip_all, fields(batch_size = self.batch_size))]
    async fn dispatch_batch(&self) -> Result<TickOutcome, DomainError> {
        let records = self.outbox.fetch_unpublished(self.batch_size).await?;
        if records.is_empty() {
            return Ok(TickOutcome::Idle);
        }

        for record in &records {
            let event = CatalogEvent::from_record(record)?;
            let event_type = event.kind_type();

            for handler in self.registry.handlers_for(event_type) {
                debug!(
                    event_id = %record.event_id,
                    event_type = event_type.name(),
                    handler = handler.name(),
                    "dispatching event"
                );
                handler.handle(&event).await.map_err(|e| {
                    DomainError::Handler(format!(
                        "{} failed on {} {}: {e}",
                        handler.name(),
                        event_type.name(),
                        record.event_id
                    ))
                })?;
            }
        }

        let ids: Vec<Uuid> = records.iter().map(|r| r.event_id).collect();
        self.outbox.mark_published(&ids).await?;

        info!(count = ids.len(), "batch published");
        Ok(TickOutcome::Published(ids.len()))
    }

    /// Moves the dispatcher onto its own task, ticking every `interval`
    /// until the returned handle is shut down.
    ///
    /// The first tick fires one `interval` after spawning. The next tick is
    /// only scheduled once the current one resolves.
    #[must_use]
    pub fn spawn(self, interval: Duration) -> DispatcherHandle {
        // interval_at panics on a zero period
        let period = interval.max(Duration::from_millis(1));
        let (shutdown, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval = ?period, batch_size = self.batch_size, "dispatcher started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match self.tick().await {
                            Ok(TickOutcome::Published(count)) => debug!(count, "tick finished"),
                            Ok(_) => {}
                            Err(err) => error!(error = %err, "dispatch tick failed, batch left unpublished"),
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("dispatcher stopped");
        });

        DispatcherHandle { shutdown, task }
    }
}

impl<O> std::fmt::Debug for Dispatcher<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("batch_size", &self.batch_size)
            .field("busy", &self.busy.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// Handle to a running dispatcher task.
#[derive(Debug)]
pub struct DispatcherHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl DispatcherHandle {
    /// Returns `true` once the dispatcher task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Signals the loop to stop and waits for it. A tick already in flight
    /// is allowed to finish first.
    pub async fn shutdown(self) {
        // The receiver is gone only if the task already exited.
        let _ = self.shutdown.send(true);

        if let Err(err) = self.task.await {
            error!(error = %err, "dispatcher task did not exit cleanly");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_ticks_every_five_seconds_in_batches_of_ten() {
        let config = DispatcherConfig::default();

        assert_eq!(config.interval, Duration::from_secs(5));
        assert_eq!(config.batch_size, 10);
    }
}
