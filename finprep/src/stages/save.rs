//! Final stage: writes the table and the run report.

use super::Stage;
use crate::context::RunContext;
use crate::core::{StageKind, Table};
use crate::errors::PipelineError;
use crate::io::{write_csv, RunReport};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Stage name.
pub const NAME: &str = "save";

/// Persists the table to the run's output file and the report to `report_path`.
///
/// A failed table write aborts the run. A failed report write is recorded in
/// the context's errors and the run continues.
#[derive(Debug, Clone)]
pub struct SaveStage {
    report_path: PathBuf,
}

impl SaveStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(report_path: impl Into<PathBuf>) -> Self {
        Self {
            report_path: report_path.into(),
        }
    }

    /// Where the report goes.
    #[must_use]
    pub fn report_path(&self) -> &Path {
        &self.report_path
    }
}

impl Default for SaveStage {
    fn default() -> Self {
        Self::new(crate::io::DEFAULT_REPORT_PATH)
    }
}

#[async_trait]
impl Stage for SaveStage {
    fn name(&self) -> &str {
        NAME
    }

    fn kind(&self) -> StageKind {
        StageKind::Persist
    }

    async fn process(&self, table: Table, ctx: &mut RunContext) -> Result<Table, PipelineError> {
        if let Some(output) = ctx.output_file() {
            write_csv(&table, output)?;
            info!(path = %output.display(), shape = ?table.shape(), "Processed data saved");
        }

        let report = RunReport::from_context(ctx);
        if let Err(e) = report.write(&self.report_path) {
            error!(error = %e, "Report generation failed");
            ctx.add_error(format!("Report generation failed: {e}"));
        }

        info!(
            completeness = report.quality_metric("completeness"),
            quality_score = report.quality_metric("quality_score"),
            final_precision = report.quality_metric("final_precision"),
            errors = ctx.errors().len(),
            "Pipeline finished"
        );
        Ok(table)
    }
}
