//! Outlier detection stage. Flags only; removal happens in cleaning.

use super::Stage;
use crate::analysis::{DetectorSettings, OutlierDetector};
use crate::context::RunContext;
use crate::core::{StageKind, Table};
use crate::errors::PipelineError;
use async_trait::async_trait;
use tracing::info;

/// Stage name and result key.
pub const NAME: &str = "outlier_detection";

/// Runs the outlier detector and stores its report.
#[derive(Debug, Clone, Default)]
pub struct OutlierDetectionStage {
    detector: OutlierDetector,
}

impl OutlierDetectionStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(settings: DetectorSettings) -> Self {
        Self {
            detector: OutlierDetector::new(settings),
        }
    }
}

#[async_trait]
impl Stage for OutlierDetectionStage {
    fn name(&self) -> &str {
        NAME
    }

    fn kind(&self) -> StageKind {
        StageKind::Analyze
    }

    async fn process(&self, table: Table, ctx: &mut RunContext) -> Result<Table, PipelineError> {
        let report = self.detector.detect(&table);
        let total = report.total_outliers();
        info!(total_outliers = total, "Outlier detection completed");

        ctx.add_statistic("total_outliers", total);
        ctx.add_result(NAME, serde_json::to_value(&report)?);
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{OutlierInfo, OutlierMethod};
    use crate::core::Column;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn test_flags_without_removing() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 100.0].map(Some).to_vec();
        let table = Table::new(vec![Column::numeric("montant_pret", values)]).unwrap();
        let mut ctx = RunContext::default();

        let out = OutlierDetectionStage::default()
            .process(table.clone(), &mut ctx)
            .await
            .unwrap();

        assert_eq!(out, table);
        assert_eq!(ctx.get("total_outliers", json!(null)), json!(1));

        let info: OutlierInfo = ctx
            .get_as("outlier_detection.outlier_info")
            .unwrap()
            .unwrap();
        assert_eq!(info["montant_pret"][&OutlierMethod::Iqr].outlier_indices, vec![5]);
        let methods = ctx.get("outlier_detection.methods", json!(null));
        assert_eq!(methods, json!(["iqr", "zscore"]));
    }
}
