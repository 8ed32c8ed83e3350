//! Quality scoring of the finished table.

use super::Stage;
use crate::analysis::{assess, describe};
use crate::context::RunContext;
use crate::core::{StageKind, Table};
use crate::errors::PipelineError;
use async_trait::async_trait;
use serde_json::json;
use tracing::info;

/// Stage name and result key.
pub const NAME: &str = "final_analysis";

/// Scores the final table and copies each metric into the statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct FinalAnalysisStage;

impl FinalAnalysisStage {
    /// Creates the stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Stage for FinalAnalysisStage {
    fn name(&self) -> &str {
        NAME
    }

    fn kind(&self) -> StageKind {
        StageKind::Analyze
    }

    async fn process(&self, table: Table, ctx: &mut RunContext) -> Result<Table, PipelineError> {
        let metrics = assess(&table);
        for (name, value) in metrics.entries() {
            ctx.add_statistic(name, value);
        }
        info!(
            completeness = metrics.completeness,
            quality_score = metrics.quality_score,
            final_precision = metrics.final_precision,
            "Final analysis completed"
        );

        ctx.add_result(
            NAME,
            json!({
                "final_stats": serde_json::to_value(describe(&table))?,
                "quality_metrics": serde_json::to_value(metrics)?,
            }),
        );
        Ok(table)
    }
}
