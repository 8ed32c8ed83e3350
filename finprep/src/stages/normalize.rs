//! Normalization followed by standardization.

use super::Stage;
use crate::context::RunContext;
use crate::core::{ColumnType, Table};
use crate::errors::PipelineError;
use crate::processing::{Normalizer, Standardizer, TransformationReport};
use async_trait::async_trait;
use serde_json::json;
use std::collections::BTreeMap;
use tracing::info;

/// Stage name and result key.
pub const NAME: &str = "data_transformation";

/// Scales numeric columns in two passes.
#[derive(Debug, Clone, Default)]
pub struct NormalizeStage {
    normalizer: Normalizer,
    standardizer: Standardizer,
}

impl NormalizeStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(normalizer: Normalizer) -> Self {
        Self {
            normalizer,
            standardizer: Standardizer,
        }
    }
}

#[async_trait]
impl Stage for NormalizeStage {
    fn name(&self) -> &str {
        NAME
    }

    async fn process(&self, table: Table, ctx: &mut RunContext) -> Result<Table, PipelineError> {
        let (table, normalization) = self.normalizer.normalize(table)?;
        let (table, standardization) = self.standardizer.standardize(table)?;
        let report = TransformationReport {
            normalization,
            standardization,
        };

        let data_types: BTreeMap<String, ColumnType> = table
            .columns()
            .iter()
            .map(|c| (c.name().to_string(), c.kind()))
            .collect();
        let (rows, cols) = table.shape();
        info!(rows, cols, "Data transformation completed");

        ctx.add_result(
            NAME,
            json!({
                "transformation_report": serde_json::to_value(&report)?,
                "final_data_info": {
                    "shape": [rows, cols],
                    "columns": table.column_names(),
                    "data_types": serde_json::to_value(&data_types)?,
                },
            }),
        );
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Column, Value};
    use crate::processing::NormalizationMethod;
    use pretty_assertions::assert_eq;

    fn table() -> Table {
        Table::new(vec![
            Column::numeric("loyer_mensuel", vec![Some(500.0), Some(700.0), None, Some(900.0)]),
            Column::text("nom", vec![Some("a"), Some("b"), Some("c"), Some("d")]),
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn test_minmax_then_standardize() {
        let mut ctx = RunContext::default();
        let out = NormalizeStage::default().process(table(), &mut ctx).await.unwrap();

        let loyer = out.column("loyer_mensuel").unwrap();
        assert!(loyer.values()[2].is_missing());
        assert_eq!(loyer.values()[1], Value::number(0.0));
        assert_eq!(out.column("nom"), table().column("nom"));

        let result = ctx.results().get(NAME).unwrap();
        let report = &result["transformation_report"];
        assert_eq!(report["normalization"]["method"], json!("minmax"));
        assert_eq!(report["normalization"]["data_min"], json!([500.0]));
        assert_eq!(report["standardization"]["method"], json!("standard_scaler"));
        assert_eq!(result["final_data_info"]["shape"], json!([4, 2]));
        assert_eq!(
            result["final_data_info"]["columns"],
            json!(["loyer_mensuel", "nom"])
        );
    }

    #[tokio::test]
    async fn test_maxabs_reports_peaks() {
        let mut ctx = RunContext::default();
        NormalizeStage::new(Normalizer::new(NormalizationMethod::MaxAbs))
            .process(table(), &mut ctx)
            .await
            .unwrap();

        let report = ctx.get("data_transformation.transformation_report", json!(null));
        assert_eq!(report["normalization"]["max_abs"], json!([900.0]));
        assert!(report["normalization"].get("data_min").is_none());
    }
}
