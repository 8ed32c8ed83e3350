//! Descriptive statistics and missing-value analysis.

use super::Stage;
use crate::analysis::descriptive::{analyze_missing, describe};
use crate::context::RunContext;
use crate::core::{StageKind, Table};
use crate::errors::PipelineError;
use async_trait::async_trait;
use serde_json::json;
use tracing::info;

/// Stage name and result key.
pub const NAME: &str = "statistical_analysis";

/// Records statistics without touching the table.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatisticsStage;

impl StatisticsStage {
    /// Creates the stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Stage for StatisticsStage {
    fn name(&self) -> &str {
        NAME
    }

    fn kind(&self) -> StageKind {
        StageKind::Analyze
    }

    async fn process(&self, table: Table, ctx: &mut RunContext) -> Result<Table, PipelineError> {
        let descriptive = describe(&table);
        let missing = analyze_missing(&table);
        info!(
            rows = table.n_rows(),
            numeric = descriptive.numerical_stats.len(),
            missing_percentage = missing.overall_missing_percentage,
            "Statistical analysis completed"
        );

        ctx.add_statistic("missing_percentage", missing.overall_missing_percentage);
        ctx.add_result(
            NAME,
            json!({
                "descriptive_stats": serde_json::to_value(&descriptive)?,
                "missing_analysis": serde_json::to_value(&missing)?,
            }),
        );
        Ok(table)
    }
}
