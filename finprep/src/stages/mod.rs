//! Stage trait and implementations.
//!
//! Stages are the units of work of a processing chain. Each one receives the
//! current table plus the run context, may update both, and returns the
//! table for its successor.

pub mod anonymize;
pub mod clean;
pub mod final_analysis;
pub mod loader;
pub mod normalize;
pub mod outliers;
pub mod relevance;
mod result;
pub mod save;
pub mod statistics;

pub use anonymize::AnonymizeStage;
pub use clean::CleanStage;
pub use final_analysis::FinalAnalysisStage;
pub use loader::LoadStage;
pub use normalize::NormalizeStage;
pub use outliers::OutlierDetectionStage;
pub use relevance::RelevanceFilterStage;
pub use result::StageResult;
pub use save::SaveStage;
pub use statistics::StatisticsStage;

use crate::context::RunContext;
use crate::core::{StageKind, Table};
use crate::errors::PipelineError;
use async_trait::async_trait;
use std::fmt::Debug;

/// Trait for pipeline stages.
#[async_trait]
pub trait Stage: Send + Sync + Debug {
    /// Returns the name of the stage, also used as its result key.
    fn name(&self) -> &str;

    /// Returns the stage kind.
    fn kind(&self) -> StageKind {
        StageKind::Transform
    }

    /// Transforms the table.
    ///
    /// # Errors
    ///
    /// Any error stops the chain; no successor runs.
    async fn process(&self, table: Table, ctx: &mut RunContext) -> Result<Table, PipelineError>;
}

/// A simple function-based stage.
pub struct FnStage<F>
where
    F: Fn(Table, &mut RunContext) -> Result<Table, PipelineError> + Send + Sync,
{
    name: String,
    func: F,
}

impl<F> FnStage<F>
where
    F: Fn(Table, &mut RunContext) -> Result<Table, PipelineError> + Send + Sync,
{
    /// Creates a new function-based stage.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Debug for FnStage<F>
where
    F: Fn(Table, &mut RunContext) -> Result<Table, PipelineError> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnStage").field("name", &self.name).finish()
    }
}

#[async_trait]
impl<F> Stage for FnStage<F>
where
    F: Fn(Table, &mut RunContext) -> Result<Table, PipelineError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(&self, table: Table, ctx: &mut RunContext) -> Result<Table, PipelineError> {
        (self.func)(table, ctx)
    }
}

/// A stage that hands the table through untouched.
#[derive(Debug, Clone)]
pub struct NoOpStage {
    name: String,
}

impl NoOpStage {
    /// Creates a new no-op stage.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Stage for NoOpStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(&self, table: Table, _ctx: &mut RunContext) -> Result<Table, PipelineError> {
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Column;

    fn table() -> Table {
        Table::new(vec![Column::numeric("x", vec![Some(1.0), Some(2.0)])]).unwrap()
    }

    #[tokio::test]
    async fn test_fn_stage() {
        let stage = FnStage::new("double", |table: Table, ctx: &mut RunContext| {
            ctx.add_statistic("rows_seen", table.n_rows());
            Ok(table)
        });
        let mut ctx = RunContext::default();

        assert_eq!(stage.name(), "double");
        assert_eq!(stage.kind(), StageKind::Transform);

        let out = stage.process(table(), &mut ctx).await.unwrap();
        assert_eq!(out.n_rows(), 2);
        assert_eq!(ctx.get("rows_seen", serde_json::Value::Null), 2);
    }

    #[tokio::test]
    async fn test_fn_stage_error() {
        let stage = FnStage::new("broken", |_table: Table, _ctx: &mut RunContext| {
            Err(PipelineError::Internal("boom".to_string()))
        });
        let mut ctx = RunContext::default();
        assert!(stage.process(table(), &mut ctx).await.is_err());
    }

    #[tokio::test]
    async fn test_noop_stage() {
        let stage = NoOpStage::new("noop");
        let mut ctx = RunContext::default();

        assert_eq!(stage.name(), "noop");
        let out = stage.process(table(), &mut ctx).await.unwrap();
        assert_eq!(out, table());
    }
}
