//! Observability utilities.

pub mod logging;
mod tracing;

pub use logging::{init_default, init_logging, LoggingConfig};
pub use tracing::{PipelineSpanAttributes, SpanTimer, StageSpanAttributes};
