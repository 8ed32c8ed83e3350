//! The fixed nine-stage preprocessing pipeline.

use super::{ChainBuilder, ProcessingChain};
use crate::config::PipelineConfig;
use crate::context::{RunContext, RunIdentity};
use crate::core::Table;
use crate::errors::PipelineError;
use crate::events::{EventSink, NoOpEventSink};
use crate::io::RecordSource;
use crate::processing::{AnonymizationCheck, Normalizer, RelevanceReport};
use crate::stages::{
    relevance::REPORT_ATTRIBUTE, AnonymizeStage, CleanStage, FinalAnalysisStage, LoadStage,
    NormalizeStage, OutlierDetectionStage, RelevanceFilterStage, SaveStage, StatisticsStage,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Chain name used in events and run identity.
pub const PIPELINE_NAME: &str = "finprep";

/// Data-minimization outcome of a run, taken from the relevance filter report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceSummary {
    /// Number of columns before filtering.
    pub original_column_count: usize,
    /// Number of columns kept.
    pub final_column_count: usize,
    /// Columns dropped.
    pub removed_columns: Vec<String>,
    /// Columns kept.
    pub preserved_columns: Vec<String>,
    /// Identity-column uniqueness verdict.
    pub anonymization: AnonymizationCheck,
}

impl From<RelevanceReport> for ComplianceSummary {
    fn from(report: RelevanceReport) -> Self {
        Self {
            original_column_count: report.original_columns.len(),
            final_column_count: report.final_columns.len(),
            removed_columns: report.removed_columns,
            preserved_columns: report.final_columns,
            anonymization: report.anonymization_verified,
        }
    }
}

impl fmt::Display for ComplianceSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Compliance report")?;
        writeln!(f, "  Original columns:  {}", self.original_column_count)?;
        writeln!(f, "  Final columns:     {}", self.final_column_count)?;
        writeln!(
            f,
            "  Data minimization: {} columns removed {:?}",
            self.removed_columns.len(),
            self.removed_columns
        )?;
        writeln!(f, "  Preserved columns: {:?}", self.preserved_columns)?;
        write!(f, "  Anonymization:     {}", self.anonymization)
    }
}

/// Everything a successful run hands back.
#[derive(Debug)]
pub struct PipelineRun {
    /// The final table.
    pub table: Table,
    /// The run context with results, statistics and errors.
    pub context: RunContext,
    /// Present when the relevance filter ran.
    pub compliance: Option<ComplianceSummary>,
}

/// Builds the fixed chain from one configuration and runs it.
///
/// Load, anonymize, analyze, detect outliers, clean, filter, normalize,
/// score, save.
#[derive(Clone)]
pub struct PipelineOrchestrator {
    config: PipelineConfig,
    chain: ProcessingChain,
    event_sink: Arc<dyn EventSink>,
}

impl fmt::Debug for PipelineOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineOrchestrator")
            .field("config", &self.config)
            .field("chain", &self.chain)
            .finish_non_exhaustive()
    }
}

impl PipelineOrchestrator {
    /// Validates the configuration and assembles the chain.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown method names, an invalid feature range,
    /// or an HTTP client that cannot be built.
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let chain = build_chain(&config, None)?;
        Ok(Self {
            config,
            chain,
            event_sink: Arc::new(NoOpEventSink),
        })
    }

    /// Replaces the loader's remote source.
    ///
    /// # Errors
    ///
    /// Returns an error if the chain cannot be rebuilt.
    pub fn with_remote_source(
        mut self,
        source: Arc<dyn RecordSource>,
    ) -> Result<Self, PipelineError> {
        self.chain = build_chain(&self.config, Some(source))?;
        Ok(self)
    }

    /// Sends lifecycle events to a sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Returns the assembled chain.
    #[must_use]
    pub fn chain(&self) -> &ProcessingChain {
        &self.chain
    }

    /// Runs the chain, loading from `input_file` or the configured API.
    ///
    /// # Errors
    ///
    /// Returns the first stage error, already logged.
    pub async fn run(
        &self,
        input_file: Option<&Path>,
        output_file: Option<&Path>,
    ) -> Result<PipelineRun, PipelineError> {
        info!(input = ?input_file, output = ?output_file, "Starting preprocessing pipeline");
        let mut ctx = self.context(output_file);
        if let Some(path) = input_file {
            ctx = ctx.with_input_file(path);
        }
        self.execute(Table::empty(), ctx).await
    }

    /// Runs the chain on a table the caller already holds.
    ///
    /// # Errors
    ///
    /// Returns the first stage error, already logged.
    pub async fn run_with_table(
        &self,
        table: Table,
        output_file: Option<&Path>,
    ) -> Result<PipelineRun, PipelineError> {
        info!(shape = ?table.shape(), "Starting preprocessing pipeline with pre-loaded data");
        let ctx = self.context(output_file);
        self.execute(table, ctx).await
    }

    fn context(&self, output_file: Option<&Path>) -> RunContext {
        let mut ctx = RunContext::new(self.config.to_value())
            .with_identity(RunIdentity::new().with_pipeline_name(PIPELINE_NAME))
            .with_event_sink(Arc::clone(&self.event_sink));
        if let Some(path) = output_file {
            ctx = ctx.with_output_file(path);
        }
        ctx
    }

    async fn execute(
        &self,
        table: Table,
        mut ctx: RunContext,
    ) -> Result<PipelineRun, PipelineError> {
        match self.chain.execute(table, &mut ctx).await {
            Ok(table) => {
                let compliance = compliance_summary(&ctx);
                if let Some(summary) = &compliance {
                    log_compliance(summary);
                }
                info!(
                    run_id = %ctx.identity().run_id,
                    shape = ?table.shape(),
                    errors = ctx.errors().len(),
                    "Pipeline completed successfully"
                );
                Ok(PipelineRun {
                    table,
                    context: ctx,
                    compliance,
                })
            }
            Err(e) => {
                error!(
                    run_id = %ctx.identity().run_id,
                    stage = e.stage().unwrap_or("unknown"),
                    category = %e.category(),
                    error = %e,
                    "Pipeline failed"
                );
                Err(e)
            }
        }
    }
}

fn build_chain(
    config: &PipelineConfig,
    remote: Option<Arc<dyn RecordSource>>,
) -> Result<ProcessingChain, PipelineError> {
    let mut loader = LoadStage::new(config.loader.clone())?;
    if let Some(source) = remote {
        loader = loader.with_remote_source(source);
    }
    let normalizer = Normalizer::new(config.normalization.method()?)
        .with_feature_range(config.normalization.feature_range);

    let chain = ChainBuilder::new(PIPELINE_NAME)
        .stage(loader)
        .stage(AnonymizeStage::new(config.anonymization.strategy()?))
        .stage(StatisticsStage::new())
        .stage(OutlierDetectionStage::new(config.outlier_detection.settings()?))
        .stage(CleanStage::new(config.cleaning.settings()?))
        .stage(RelevanceFilterStage::new())
        .stage(NormalizeStage::new(normalizer))
        .stage(FinalAnalysisStage::new())
        .stage(SaveStage::new(&config.output.report_path))
        .build()?;
    Ok(chain)
}

fn compliance_summary(ctx: &RunContext) -> Option<ComplianceSummary> {
    let value = ctx.attributes().get(REPORT_ATTRIBUTE)?;
    match serde_json::from_value::<RelevanceReport>(value.clone()) {
        Ok(report) => Some(report.into()),
        Err(e) => {
            warn!(error = %e, "Relevance filter report is unreadable");
            None
        }
    }
}

fn log_compliance(summary: &ComplianceSummary) {
    info!(
        original_columns = summary.original_column_count,
        final_columns = summary.final_column_count,
        removed = summary.removed_columns.len(),
        preserved = ?summary.preserved_columns,
        anonymization = %summary.anonymization,
        "Compliance report"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::NormalizationMethod;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builds_fixed_chain() {
        let orchestrator = PipelineOrchestrator::new(PipelineConfig::default()).unwrap();
        assert_eq!(
            orchestrator.chain().stage_names(),
            vec![
                "data_loading",
                "anonymization",
                "statistical_analysis",
                "outlier_detection",
                "data_cleaning",
                "relevance_filter",
                "data_transformation",
                "final_analysis",
                "save",
            ]
        );
    }

    #[test]
    fn test_unknown_method_fails_construction() {
        let mut config = PipelineConfig::default();
        config.normalization.method = "robust".to_string();
        let err = PipelineOrchestrator::new(config).unwrap_err();
        assert_eq!(err.to_string(), "Unknown normalization method: robust");

        let config = PipelineConfig::default().with_normalization(NormalizationMethod::MaxAbs);
        assert!(PipelineOrchestrator::new(config).is_ok());
    }

    #[test]
    fn test_compliance_summary_from_report() {
        let report = RelevanceReport {
            original_columns: vec!["nom".into(), "age".into()],
            final_columns: vec!["nom".into()],
            removed_columns: vec!["age".into()],
            removal_reasons: std::collections::BTreeMap::new(),
            anonymization_verified: AnonymizationCheck::LikelyOk,
        };
        let summary = ComplianceSummary::from(report);
        assert_eq!(summary.original_column_count, 2);
        assert_eq!(summary.preserved_columns, vec!["nom"]);
        assert!(summary.to_string().contains("1 columns removed [\"age\"]"));
    }
}
