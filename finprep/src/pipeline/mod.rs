//! Pipeline building and execution.
//!
//! This module provides:
//! - The sequential processing chain and its validating builder
//! - The orchestrator that assembles the fixed preprocessing chain

mod builder;
mod chain;
mod orchestrator;

pub use builder::ChainBuilder;
pub use chain::ProcessingChain;
pub use orchestrator::{ComplianceSummary, PipelineOrchestrator, PipelineRun, PIPELINE_NAME};
