//! The JSON run report written after a run.

use crate::context::{ContextScope, RunContext};
use crate::errors::PipelineError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::info;

/// Default report file name.
pub const DEFAULT_REPORT_PATH: &str = "pipeline_report.json";

/// Everything a run produced, minus the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Run identifier.
    pub run_id: String,
    /// The configuration tree the run used.
    pub pipeline_configuration: serde_json::Value,
    /// Results by stage name.
    pub processing_results: serde_json::Value,
    /// Flat metrics.
    pub statistics: serde_json::Value,
    /// `final_analysis.quality_metrics`, or an empty object.
    pub quality_metrics: serde_json::Value,
    /// Recoverable errors, in order.
    pub errors: Vec<String>,
    /// Per-stage execution records.
    pub stage_history: serde_json::Value,
}

impl RunReport {
    /// Captures the report body from a context snapshot.
    #[must_use]
    pub fn from_context(ctx: &RunContext) -> Self {
        let mut snapshot = ctx.snapshot();
        let mut take = |key: &str| snapshot.get_mut(key).map_or(Value::Null, Value::take);
        let quality_metrics = ctx
            .resolve_in(ContextScope::Results, "final_analysis.quality_metrics")
            .unwrap_or_else(|| Value::Object(serde_json::Map::new()));
        Self {
            run_id: ctx.identity().run_id_str(),
            pipeline_configuration: take("config"),
            processing_results: take("results"),
            statistics: take("statistics"),
            quality_metrics,
            errors: ctx.errors().to_vec(),
            stage_history: take("stage_history"),
        }
    }

    /// Reads a quality metric, defaulting to zero.
    #[must_use]
    pub fn quality_metric(&self, name: &str) -> f64 {
        self.quality_metrics
            .get(name)
            .and_then(serde_json::Value::as_f64)
            .unwrap_or(0.0)
    }

    /// Writes the report as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn write(&self, path: &Path) -> Result<(), PipelineError> {
        let body = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| PipelineError::file_io(parent, e))?;
        }
        fs::write(path, body).map_err(|e| PipelineError::file_io(path, e))?;
        info!(path = %path.display(), "Pipeline report saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context() -> RunContext {
        let mut ctx = RunContext::new(json!({"normalization": {"method": "minmax"}}));
        ctx.add_result(
            "final_analysis",
            json!({"quality_metrics": {
                "completeness": 1.0,
                "quality_score": 0.9,
                "final_precision": 0.9
            }}),
        );
        ctx.add_statistic("total_outliers", 2);
        ctx.add_error("something recoverable");
        ctx
    }

    #[test]
    fn test_from_context() {
        let report = RunReport::from_context(&context());

        assert_eq!(report.pipeline_configuration["normalization"]["method"], "minmax");
        assert_eq!(report.statistics["total_outliers"], 2);
        assert_eq!(report.errors, vec!["something recoverable".to_string()]);
        assert!((report.quality_metric("quality_score") - 0.9).abs() < f64::EPSILON);
        assert!((report.quality_metric("absent") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_missing_quality_metrics_is_empty_object() {
        let report = RunReport::from_context(&RunContext::default());
        assert_eq!(report.quality_metrics, json!({}));
    }

    #[test]
    fn test_write_pretty_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("run.json");
        let report = RunReport::from_context(&context());

        report.write(&path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n  \"run_id\""));
        let back: RunReport = serde_json::from_str(&text).unwrap();
        assert_eq!(back.errors, report.errors);
    }

    #[test]
    fn test_write_to_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = RunReport::from_context(&context()).write(dir.path()).unwrap_err();
        assert!(matches!(err, PipelineError::FileIo { .. }));
    }
}
