//! Stage timing and span attributes.

use crate::core::{StageKind, StageStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

/// Span attributes for one pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineSpanAttributes {
    /// Pipeline name.
    pub pipeline_name: Option<String>,
    /// Run identifier.
    pub run_id: Option<String>,
    /// Number of stages in the chain.
    pub stage_count: usize,
}

impl PipelineSpanAttributes {
    /// Creates new pipeline span attributes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the pipeline name.
    #[must_use]
    pub fn with_pipeline_name(mut self, name: impl Into<String>) -> Self {
        self.pipeline_name = Some(name.into());
        self
    }

    /// Sets the run identifier.
    #[must_use]
    pub fn with_run_id(mut self, id: impl Into<String>) -> Self {
        self.run_id = Some(id.into());
        self
    }

    /// Sets the stage count.
    #[must_use]
    pub fn with_stage_count(mut self, count: usize) -> Self {
        self.stage_count = count;
        self
    }

    /// Flattens into event payload fields.
    #[must_use]
    pub fn to_fields(&self) -> BTreeMap<String, serde_json::Value> {
        let mut fields = BTreeMap::new();
        if let Some(ref v) = self.pipeline_name {
            fields.insert("pipeline.name".to_string(), v.clone().into());
        }
        if let Some(ref v) = self.run_id {
            fields.insert("pipeline.run_id".to_string(), v.clone().into());
        }
        fields.insert("pipeline.stage_count".to_string(), self.stage_count.into());
        fields
    }
}

/// Span attributes for one stage execution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageSpanAttributes {
    /// Stage name.
    pub stage_name: String,
    /// Stage kind.
    pub stage_kind: Option<StageKind>,
    /// Stage status.
    pub status: Option<StageStatus>,
    /// Duration in milliseconds.
    pub duration_ms: Option<f64>,
    /// Table shape in.
    pub rows_in: Option<usize>,
    /// Table shape out.
    pub rows_out: Option<usize>,
    /// Error message if failed.
    pub error: Option<String>,
}

impl StageSpanAttributes {
    /// Creates new stage span attributes.
    #[must_use]
    pub fn new(stage_name: impl Into<String>, kind: StageKind) -> Self {
        Self {
            stage_name: stage_name.into(),
            stage_kind: Some(kind),
            ..Default::default()
        }
    }

    /// Sets the stage status.
    #[must_use]
    pub fn with_status(mut self, status: StageStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the duration.
    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Sets the row counts.
    #[must_use]
    pub fn with_rows(mut self, rows_in: usize, rows_out: Option<usize>) -> Self {
        self.rows_in = Some(rows_in);
        self.rows_out = rows_out;
        self
    }

    /// Sets the error.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Flattens into event payload fields.
    #[must_use]
    pub fn to_fields(&self) -> BTreeMap<String, serde_json::Value> {
        let mut fields = BTreeMap::new();

        fields.insert("stage.name".to_string(), self.stage_name.clone().into());

        if let Some(kind) = self.stage_kind {
            fields.insert("stage.kind".to_string(), kind.to_string().into());
        }
        if let Some(status) = self.status {
            fields.insert("stage.status".to_string(), status.to_string().into());
        }
        if let Some(v) = self.duration_ms {
            fields.insert("stage.duration_ms".to_string(), v.into());
        }
        if let Some(v) = self.rows_in {
            fields.insert("stage.rows_in".to_string(), v.into());
        }
        if let Some(v) = self.rows_out {
            fields.insert("stage.rows_out".to_string(), v.into());
        }
        if let Some(ref v) = self.error {
            fields.insert("stage.error".to_string(), v.clone().into());
        }

        fields
    }
}

/// Simple span timing helper.
#[derive(Debug)]
pub struct SpanTimer {
    start: Instant,
    name: String,
}

impl SpanTimer {
    /// Starts a new span timer.
    #[must_use]
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            name: name.into(),
        }
    }

    /// Returns the elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// Returns the span name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Finishes the span and returns the duration.
    #[must_use]
    pub fn finish(self) -> f64 {
        self.elapsed_ms()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_span_attributes() {
        let attrs = PipelineSpanAttributes::new()
            .with_pipeline_name("finprep")
            .with_run_id("run-123")
            .with_stage_count(9);

        let fields = attrs.to_fields();
        assert_eq!(fields["pipeline.name"], "finprep");
        assert_eq!(fields["pipeline.run_id"], "run-123");
        assert_eq!(fields["pipeline.stage_count"], 9);
    }

    #[test]
    fn test_stage_span_attributes() {
        let attrs = StageSpanAttributes::new("data_cleaning", StageKind::Transform)
            .with_status(StageStatus::Completed)
            .with_duration_ms(123.45)
            .with_rows(10, Some(9));

        let fields = attrs.to_fields();
        assert_eq!(fields["stage.name"], "data_cleaning");
        assert_eq!(fields["stage.kind"], "transform");
        assert_eq!(fields["stage.status"], "completed");
        assert_eq!(fields["stage.duration_ms"], 123.45);
        assert_eq!(fields["stage.rows_out"], 9);
        assert!(!fields.contains_key("stage.error"));
    }

    #[test]
    fn test_span_timer() {
        let timer = SpanTimer::start("test_span");
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert_eq!(timer.name(), "test_span");
        let duration = timer.finish();
        assert!(duration >= 10.0);
    }
}
