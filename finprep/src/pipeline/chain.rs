//! Sequential execution of a fixed list of stages.

use crate::context::RunContext;
use crate::core::{StageStatus, Table};
use crate::errors::PipelineError;
use crate::events::types;
use crate::observability::{PipelineSpanAttributes, SpanTimer, StageSpanAttributes};
use crate::stages::{Stage, StageResult};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info};

/// An ordered list of stages run one after another.
///
/// Each stage receives the previous stage's table. The first error stops the
/// chain and is returned wrapped as [`PipelineError::Stage`].
#[derive(Debug, Clone)]
pub struct ProcessingChain {
    name: String,
    stages: Vec<Arc<dyn Stage>>,
}

impl ProcessingChain {
    pub(super) fn new(name: String, stages: Vec<Arc<dyn Stage>>) -> Self {
        Self { name, stages }
    }

    /// Returns the chain name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns true if the chain has no stages. Built chains never are.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stage names in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Runs every stage in order.
    ///
    /// # Errors
    ///
    /// Returns the first stage error, wrapped with the stage name.
    pub async fn execute(
        &self,
        table: Table,
        ctx: &mut RunContext,
    ) -> Result<Table, PipelineError> {
        let sink = ctx.event_sink();
        let run_timer = SpanTimer::start(&self.name);
        let attrs = PipelineSpanAttributes::new()
            .with_pipeline_name(&self.name)
            .with_run_id(ctx.identity().run_id_str())
            .with_stage_count(self.stages.len());
        let mut started = attrs.to_fields();
        started.extend(ctx.identity().to_dict());
        sink.emit(types::PIPELINE_STARTED, Some(to_payload(started)))
            .await;
        info!(pipeline = %self.name, stages = self.stages.len(), "Pipeline started");

        let mut table = table;
        for stage in &self.stages {
            let name = stage.name().to_string();
            let shape_in = table.shape();
            let started_at = Utc::now();
            let timer = SpanTimer::start(&name);

            sink.emit(
                types::STAGE_STARTED,
                Some(to_payload(
                    StageSpanAttributes::new(&name, stage.kind())
                        .with_rows(shape_in.0, None)
                        .to_fields(),
                )),
            )
            .await;
            info!(stage = %name, "Stage started");

            match stage.process(table, ctx).await {
                Ok(out) => {
                    let duration_ms = timer.finish();
                    let shape_out = out.shape();
                    let fields = StageSpanAttributes::new(&name, stage.kind())
                        .with_status(StageStatus::Completed)
                        .with_duration_ms(duration_ms)
                        .with_rows(shape_in.0, Some(shape_out.0))
                        .to_fields();
                    ctx.record_stage(StageResult::completed(
                        &name,
                        stage.kind(),
                        started_at,
                        shape_in,
                        shape_out,
                    ));
                    sink.emit(types::STAGE_COMPLETED, Some(to_payload(fields))).await;
                    info!(
                        stage = %name,
                        duration_ms,
                        rows = shape_out.0,
                        cols = shape_out.1,
                        "Stage completed"
                    );
                    table = out;
                }
                Err(e) => {
                    let duration_ms = timer.finish();
                    let message = e.to_string();
                    let fields = StageSpanAttributes::new(&name, stage.kind())
                        .with_status(StageStatus::Failed)
                        .with_duration_ms(duration_ms)
                        .with_rows(shape_in.0, None)
                        .with_error(&message)
                        .to_fields();
                    ctx.record_stage(StageResult::failed(
                        &name,
                        stage.kind(),
                        started_at,
                        shape_in,
                        &message,
                    ));
                    sink.emit(types::STAGE_FAILED, Some(to_payload(fields))).await;
                    error!(stage = %name, error = %message, "Stage failed");

                    let err = PipelineError::in_stage(name, e);
                    let mut failed = err.to_dict();
                    failed.insert("pipeline.name".to_string(), serde_json::json!(self.name));
                    failed.insert(
                        "duration_ms".to_string(),
                        serde_json::json!(run_timer.elapsed_ms()),
                    );
                    sink.emit(types::PIPELINE_FAILED, Some(to_payload(failed))).await;
                    return Err(err);
                }
            }
        }

        let duration_ms = run_timer.finish();
        sink.emit(
            types::PIPELINE_COMPLETED,
            Some(serde_json::json!({
                "pipeline.name": self.name,
                "duration_ms": duration_ms,
                "rows": table.n_rows(),
                "cols": table.n_cols(),
            })),
        )
        .await;
        info!(pipeline = %self.name, duration_ms, "Pipeline completed");
        Ok(table)
    }
}

fn to_payload(fields: impl IntoIterator<Item = (String, serde_json::Value)>) -> serde_json::Value {
    serde_json::Value::Object(fields.into_iter().collect())
}
