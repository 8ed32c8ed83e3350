//! Sensitive-column redaction stage.

use super::Stage;
use crate::context::{ContextScope, RunContext};
use crate::core::Table;
use crate::errors::PipelineError;
use crate::processing::{AnonymizationStrategy, Anonymizer};
use async_trait::async_trait;
use serde_json::json;

/// Stage name and result key.
pub const NAME: &str = "anonymization";

/// Config key holding caller-supplied sensitive columns.
const EXPLICIT_COLUMNS_KEY: &str = "anonymization.explicit_sensitive_columns";

/// Redacts sensitive columns with one strategy for the whole run.
#[derive(Debug, Clone, Default)]
pub struct AnonymizeStage {
    strategy: AnonymizationStrategy,
}

impl AnonymizeStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(strategy: AnonymizationStrategy) -> Self {
        Self { strategy }
    }

    fn explicit_columns(ctx: &RunContext) -> Result<Vec<String>, PipelineError> {
        ctx.resolve_in(ContextScope::Config, EXPLICIT_COLUMNS_KEY)
            .map(serde_json::from_value)
            .transpose()
            .map(Option::unwrap_or_default)
            .map_err(PipelineError::from)
    }
}

#[async_trait]
impl Stage for AnonymizeStage {
    fn name(&self) -> &str {
        NAME
    }

    async fn process(&self, table: Table, ctx: &mut RunContext) -> Result<Table, PipelineError> {
        let anonymizer =
            Anonymizer::new(self.strategy).with_explicit_columns(Self::explicit_columns(ctx)?);
        let (table, report) = anonymizer.anonymize(table)?;

        if let Some(report) = report {
            ctx.add_result(
                NAME,
                json!({
                    "sensitive_columns": report.sensitive_columns_detected,
                    "strategy": self.strategy,
                    "anonymization_report": serde_json::to_value(&report)?,
                }),
            );
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Column;
    use pretty_assertions::assert_eq;

    fn profiles() -> Table {
        Table::new(vec![
            Column::text("nom", vec![Some("Martin"), Some("Durand")]),
            Column::text("ville", vec![Some("Lyon"), Some("Paris")]),
            Column::numeric("montant_pret", vec![Some(1000.0), Some(2500.0)]),
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn test_records_result_for_detected_columns() {
        let mut ctx = RunContext::default();
        let out = AnonymizeStage::default()
            .process(profiles(), &mut ctx)
            .await
            .unwrap();

        assert_eq!(out.shape(), (2, 3));
        let result = ctx.results().get(NAME).unwrap();
        assert_eq!(result["sensitive_columns"], json!(["nom"]));
        assert_eq!(result["strategy"], json!("hash"));
        assert_eq!(
            result["anonymization_report"]["anonymization_details"]["nom"]["action"],
            json!("hashed")
        );
    }

    #[tokio::test]
    async fn test_explicit_columns_come_from_config() {
        let config = json!({"anonymization": {"explicit_sensitive_columns": ["ville"]}});
        let mut ctx = RunContext::new(config);
        let out = AnonymizeStage::new(AnonymizationStrategy::Delete)
            .process(profiles(), &mut ctx)
            .await
            .unwrap();

        assert_eq!(out.column_names(), vec!["montant_pret"]);
        let result = ctx.results().get(NAME).unwrap();
        assert_eq!(
            result["anonymization_report"]["detections"]["ville"]["method"],
            json!("explicit")
        );
    }

    #[tokio::test]
    async fn test_no_result_when_nothing_detected() {
        let table = Table::new(vec![Column::numeric("loyer_mensuel", vec![Some(700.0)])]).unwrap();
        let mut ctx = RunContext::default();
        AnonymizeStage::default().process(table, &mut ctx).await.unwrap();
        assert!(ctx.results().get(NAME).is_none());
    }
}
