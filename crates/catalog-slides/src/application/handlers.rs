//! Event handler contract and the immutable handler registry.
//!
//! Delivery is at-least-once: a handler may see the same event again after
//! any failure in its batch, so every handler must be idempotent and must
//! not depend on being called exactly once.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use catalog_core::error::DomainError;

use crate::domain::events::{CatalogEvent, EventType};

/// A consumer of outbox events, typically a projection.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Short name used in dispatch logs.
    fn name(&self) -> &'static str;

    /// Processes one event.
    ///
    /// # Errors
    ///
    /// Any error leaves the whole dispatch batch unpublished.
    async fn handle(&self, event: &CatalogEvent) -> Result<(), DomainError>;
}

/// Handlers keyed by event type, in registration order.
///
/// Built once at start-up through [`HandlerRegistry::builder`] and then
/// shared read-only with the dispatcher.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<EventType, Vec<Arc<dyn EventHandler>>>,
}

impl HandlerRegistry {
    /// Starts an empty registry.
    #[must_use]
    pub fn builder() -> HandlerRegistryBuilder {
        HandlerRegistryBuilder::default()
    }

    /// Handlers registered for `event_type`, in registration order.
    #[must_use]
    pub fn handlers_for(&self, event_type: EventType) -> &[Arc<dyn EventHandler>] {
        self.handlers
            .get(&event_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Total number of registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.values().map(Vec::len).sum()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for event_type in EventType::ALL {
            let names: Vec<&str> = self
                .handlers_for(event_type)
                .iter()
                .map(|h| h.name())
                .collect();
            map.entry(&event_type.name(), &names);
        }
        map.finish()
    }
}

/// Collects registrations for a [`HandlerRegistry`].
#[derive(Default)]
pub struct HandlerRegistryBuilder {
    handlers: HashMap<EventType, Vec<Arc<dyn EventHandler>>>,
}

impl HandlerRegistryBuilder {
    /// Registers `handler` for `event_type`. The same handler may be
    /// registered for several types, and a type may have several handlers.
    #[must_use]
    pub fn register(mut self, event_type: EventType, handler: Arc<dyn EventHandler>) -> Self {
        self.handlers.entry(event_type).or_default().push(handler);
        self
    }

    /// Freezes the registrations.
    #[must_use]
    pub fn build(self) -> HandlerRegistry {
        HandlerRegistry {
            handlers: self.handlers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    #[async_trait]
    impl EventHandler for Named {
        fn name(&self) -> &'static str {
            self.0
        }

        async fn handle(&self, _event: &CatalogEvent) -> Result<(), DomainError> {
            Ok(())
        }
    }

    #[test]
    fn test_handlers_keep_registration_order_per_type() {
        // Arrange
        let registry = HandlerRegistry::builder()
            .register(EventType::SlideCreated, Arc::new(Named("first")))
            .register(EventType::SlideFinished, Arc::new(Named("other")))
            .register(EventType::SlideCreated, Arc::new(Named("second")))
            .build();

        // Act
        let names: Vec<&str> = registry
            .handlers_for(EventType::SlideCreated)
            .iter()
            .map(|h| h.name())
            .collect();

        // Assert
        assert_eq!(names, vec!["first", "second"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_unregistered_type_has_no_handlers() {
        let registry = HandlerRegistry::builder()
            .register(EventType::SlideCreated, Arc::new(Named("only")))
            .build();

        assert!(registry.handlers_for(EventType::SlideFinished).is_empty());
        assert!(!registry.is_empty());
        assert!(HandlerRegistry::default().is_empty());
    }
}
