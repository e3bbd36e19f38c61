//! Command abstractions.

/// Trait that all intent commands implement.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// The dotted command name, recorded on the handler's tracing span.
    fn command_type(&self) -> &'static str;
}
