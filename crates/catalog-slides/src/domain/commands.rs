//! Commands for the catalog context.

use catalog_core::command::Command;
use uuid::Uuid;

/// Command to register a new, empty case.
#[derive(Debug, Clone, Default)]
pub struct CreateCase;

impl Command for CreateCase {
    fn command_type(&self) -> &'static str {
        "catalog.create_case"
    }
}

/// Command to add a slide to an existing case.
#[derive(Debug, Clone)]
pub struct AddSlide {
    /// The case that will own the slide.
    pub case_id: Uuid,
}

impl Command for AddSlide {
    fn command_type(&self) -> &'static str {
        "catalog.add_slide"
    }
}

/// Command to mark a slide's preparation as finished.
#[derive(Debug, Clone)]
pub struct FinishSlide {
    /// The slide to finish.
    pub slide_id: Uuid,
}

impl Command for FinishSlide {
    fn command_type(&self) -> &'static str {
        "catalog.finish_slide"
    }
}
