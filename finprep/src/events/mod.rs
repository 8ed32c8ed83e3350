//! Lifecycle events emitted while a pipeline runs.
//!
//! The chain reports progress through an [`EventSink`] held by the run
//! context. Event type names are collected in [`types`].

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

/// Event type names.
pub mod types {
    /// The chain started executing.
    pub const PIPELINE_STARTED: &str = "pipeline.started";
    /// Every stage finished.
    pub const PIPELINE_COMPLETED: &str = "pipeline.completed";
    /// A stage failed and the run stopped.
    pub const PIPELINE_FAILED: &str = "pipeline.failed";
    /// A stage is about to run.
    pub const STAGE_STARTED: &str = "stage.started";
    /// A stage returned a table.
    pub const STAGE_COMPLETED: &str = "stage.completed";
    /// A stage returned an error.
    pub const STAGE_FAILED: &str = "stage.failed";
}
