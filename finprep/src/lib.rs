//! # Finprep
//!
//! A compliance-aware preprocessing pipeline for financial-profile records.
//!
//! Records flow through a fixed chain of stages that share one run context:
//!
//! - **Load** from a CSV file or an HTTP endpoint
//! - **Anonymize** sensitive columns (hash, mask or delete)
//! - **Analyze** descriptive statistics and missing values
//! - **Detect outliers** with IQR, z-score or an isolation forest
//! - **Clean** by imputing gaps and dropping flagged rows
//! - **Filter** down to the five allow-listed columns
//! - **Normalize** and standardize numeric columns
//! - **Score** the final table and **save** it with a JSON run report
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use finprep::prelude::*;
//! use std::path::Path;
//!
//! let orchestrator = PipelineOrchestrator::new(PipelineConfig::default())?;
//! let run = orchestrator
//!     .run(Some(Path::new("profiles.csv")), Some(Path::new("clean.csv")))
//!     .await?;
//! if let Some(summary) = run.compliance {
//!     println!("{summary}");
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod analysis;
pub mod config;
pub mod context;
pub mod core;
pub mod errors;
pub mod events;
pub mod io;
pub mod observability;
pub mod pipeline;
pub mod processing;
pub mod stages;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::analysis::{OutlierMethod, QualityMetrics};
    pub use crate::config::PipelineConfig;
    pub use crate::context::{ContextScope, RunContext, RunIdentity};
    pub use crate::core::{Column, ColumnType, StageKind, StageStatus, Table, Value};
    pub use crate::errors::{ErrorCategory, PipelineError, PipelineValidationError};
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::io::{CsvFileSource, RecordSource, RunReport};
    pub use crate::observability::{init_logging, LoggingConfig};
    pub use crate::pipeline::{
        ChainBuilder, ComplianceSummary, PipelineOrchestrator, PipelineRun, ProcessingChain,
    };
    pub use crate::processing::{
        AnonymizationStrategy, MissingValueStrategy, NormalizationMethod, NumericImputation,
    };
    pub use crate::stages::{Stage, StageResult};
}
