//! Completion-service health tracking and selection.

mod registry;

pub use registry::ServiceRegistry;
