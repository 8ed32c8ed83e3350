//! Missing-value handling and outlier removal.

use super::Stage;
use crate::analysis::OutlierInfo;
use crate::context::RunContext;
use crate::core::Table;
use crate::errors::PipelineError;
use crate::processing::{CleanerSettings, DataCleaner};
use async_trait::async_trait;
use serde_json::json;
use tracing::info;

/// Stage name and result key.
pub const NAME: &str = "data_cleaning";

/// Where the outlier stage leaves its per-column findings.
const OUTLIER_INFO_KEY: &str = "outlier_detection.outlier_info";

/// Imputes or drops missing values, then removes flagged rows.
#[derive(Debug, Clone, Default)]
pub struct CleanStage {
    cleaner: DataCleaner,
}

impl CleanStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(settings: CleanerSettings) -> Self {
        Self {
            cleaner: DataCleaner::new(settings),
        }
    }
}

#[async_trait]
impl Stage for CleanStage {
    fn name(&self) -> &str {
        NAME
    }

    async fn process(&self, table: Table, ctx: &mut RunContext) -> Result<Table, PipelineError> {
        let outliers: OutlierInfo = ctx.get_as(OUTLIER_INFO_KEY)?.unwrap_or_default();
        let (table, report) = self.cleaner.clean(table, &outliers)?;

        let (rows, cols) = table.shape();
        info!(rows, cols, "Data cleaning completed");
        ctx.add_statistic("final_shape_after_cleaning", json!([rows, cols]));
        ctx.add_result(
            NAME,
            json!({
                "cleaning_report": serde_json::to_value(&report)?,
                "final_shape": [rows, cols],
            }),
        );
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Column, Value};
    use pretty_assertions::assert_eq;

    fn loans() -> Table {
        Table::new(vec![
            Column::numeric(
                "montant_pret",
                vec![Some(1.0), Some(2.0), None, Some(4.0), Some(5.0), Some(100.0)],
            ),
            Column::text(
                "ville",
                vec![Some("Lyon"), None, Some("Lyon"), Some("Paris"), Some("Nice"), Some("Lyon")],
            ),
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn test_without_outlier_findings_only_imputes() {
        let mut ctx = RunContext::default();
        let out = CleanStage::default().process(loans(), &mut ctx).await.unwrap();

        assert_eq!(out.shape(), (6, 2));
        assert_eq!(out.missing_cells(), 0);
        assert_eq!(out.column("montant_pret").unwrap().values()[2], Value::number(22.4));
        assert_eq!(out.column("ville").unwrap().values()[1], Value::text("Lyon"));
        assert_eq!(ctx.get("final_shape_after_cleaning", json!(null)), json!([6, 2]));
    }

    #[tokio::test]
    async fn test_removes_rows_flagged_upstream() {
        let mut ctx = RunContext::default();
        ctx.add_result(
            "outlier_detection",
            json!({"outlier_info": {"montant_pret": {
                "iqr": {"outlier_count": 1, "outlier_percentage": 20.0, "outlier_indices": [5]},
                "zscore": {"outlier_count": 1, "outlier_percentage": 20.0, "outlier_indices": [0]}
            }}}),
        );

        let out = CleanStage::default().process(loans(), &mut ctx).await.unwrap();

        assert_eq!(out.labels(), &[0, 1, 2, 3, 4]);
        let result = ctx.results().get(NAME).unwrap();
        assert_eq!(result["final_shape"], json!([5, 2]));
        assert_eq!(
            result["cleaning_report"]["outlier_removal"]["rows_removed"],
            json!(1)
        );
    }
}
