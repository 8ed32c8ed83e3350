//! Chain builder with validation.

use super::ProcessingChain;
use crate::errors::{ErrorInfo, PipelineValidationError};
use crate::stages::Stage;
use std::collections::HashSet;
use std::sync::Arc;

/// Builder for creating validated processing chains.
#[derive(Debug, Clone)]
pub struct ChainBuilder {
    name: String,
    stages: Vec<Arc<dyn Stage>>,
}

impl Default for ChainBuilder {
    fn default() -> Self {
        Self::new("finprep")
    }
}

impl ChainBuilder {
    /// Creates a new chain builder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
        }
    }

    /// Appends a stage. Stages run in the order they are added.
    #[must_use]
    pub fn stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Appends an already shared stage.
    #[must_use]
    pub fn shared_stage(mut self, stage: Arc<dyn Stage>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Returns the number of stages added so far.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Builds the chain.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no stages or two stages share a name.
    pub fn build(self) -> Result<ProcessingChain, PipelineValidationError> {
        if self.stages.is_empty() {
            return Err(PipelineValidationError::new("Processing chain has no stages")
                .with_error_info(
                    ErrorInfo::new("CHAIN-EMPTY", "Cannot build an empty processing chain")
                        .with_fix_hint("Add at least one stage before building."),
                ));
        }

        let mut seen = HashSet::new();
        for stage in &self.stages {
            if !seen.insert(stage.name()) {
                return Err(PipelineValidationError::new(format!(
                    "Duplicate stage name '{}'",
                    stage.name()
                ))
                .with_stages(vec![stage.name().to_string()])
                .with_error_info(
                    ErrorInfo::new(
                        "CHAIN-DUPLICATE",
                        format!("Stage '{}' appears more than once", stage.name()),
                    )
                    .with_fix_hint("Stage names key results in the run context; make them unique."),
                ));
            }
        }

        Ok(ProcessingChain::new(self.name, self.stages))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RunContext;
    use crate::core::{Column, StageStatus, Table};
    use crate::errors::PipelineError;
    use crate::events::{types, CollectingEventSink};
    use crate::stages::{FnStage, NoOpStage};
    use pretty_assertions::assert_eq;

    fn one_column() -> Table {
        Table::new(vec![Column::numeric("x", vec![Some(1.0), Some(2.0)])]).unwrap()
    }

    #[test]
    fn test_empty_chain_is_rejected() {
        let err = ChainBuilder::default().build().unwrap_err();
        assert_eq!(err.error_info.unwrap().code, "CHAIN-EMPTY");
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let err = ChainBuilder::default()
            .stage(NoOpStage::new("a"))
            .stage(NoOpStage::new("b"))
            .stage(NoOpStage::new("a"))
            .build()
            .unwrap_err();
        assert_eq!(err.stages, vec!["a"]);
        assert_eq!(err.error_info.unwrap().code, "CHAIN-DUPLICATE");
    }

    #[tokio::test]
    async fn test_stages_run_in_order() {
        let chain = ChainBuilder::new("ordered")
            .stage(FnStage::new("first", |t: Table, ctx: &mut RunContext| {
                ctx.add_result("order", serde_json::json!(["first"]));
                Ok(t)
            }))
            .stage(FnStage::new("second", |mut t: Table, ctx: &mut RunContext| {
                let mut order = ctx.get("order", serde_json::json!([]));
                if let Some(list) = order.as_array_mut() {
                    list.push("second".into());
                }
                ctx.add_result("order", order);
                t.retain_rows(&[true, false]);
                Ok(t)
            }))
            .build()
            .unwrap();

        assert_eq!(chain.stage_names(), vec!["first", "second"]);
        let mut ctx = RunContext::default();
        let out = chain.execute(one_column(), &mut ctx).await.unwrap();

        assert_eq!(out.n_rows(), 1);
        assert_eq!(
            ctx.get("order", serde_json::json!(null)),
            serde_json::json!(["first", "second"])
        );
        let history = ctx.stage_history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].shape_in, (2, 1));
        assert_eq!(history[1].shape_out, Some((1, 1)));
    }

    #[tokio::test]
    async fn test_failure_stops_chain_and_names_stage() {
        let sink = Arc::new(CollectingEventSink::new());
        let chain = ChainBuilder::default()
            .stage(FnStage::new("breaks", |_t: Table, _ctx: &mut RunContext| {
                Err(PipelineError::Configuration("bad".to_string()))
            }))
            .stage(FnStage::new("never", |_t: Table, ctx: &mut RunContext| {
                ctx.add_result("never", serde_json::json!(true));
                Ok(Table::empty())
            }))
            .build()
            .unwrap();

        let mut ctx = RunContext::default().with_event_sink(sink.clone());
        let err = chain.execute(one_column(), &mut ctx).await.unwrap_err();

        assert_eq!(err.stage(), Some("breaks"));
        assert!(err.to_string().contains("breaks"));
        assert!(ctx.results().get("never").is_none());
        assert_eq!(ctx.stage_history().len(), 1);
        assert_eq!(ctx.stage_history()[0].status, StageStatus::Failed);
        assert_eq!(
            sink.event_types(),
            vec![
                types::PIPELINE_STARTED,
                types::STAGE_STARTED,
                types::STAGE_FAILED,
                types::PIPELINE_FAILED,
            ]
        );
        let failed = sink.events_of_type(types::PIPELINE_FAILED);
        let data = failed[0].1.as_ref().unwrap();
        assert_eq!(data["stage"], "breaks");
        assert_eq!(data["category"], "fatal_configuration");
        assert!(data["message"].as_str().unwrap().contains("bad"));
    }

    #[tokio::test]
    async fn test_success_events() {
        let sink = Arc::new(CollectingEventSink::new());
        let chain = ChainBuilder::default()
            .stage(NoOpStage::new("only"))
            .build()
            .unwrap();
        let mut ctx = RunContext::default().with_event_sink(sink.clone());
        chain.execute(one_column(), &mut ctx).await.unwrap();

        assert_eq!(
            sink.event_types(),
            vec![
                types::PIPELINE_STARTED,
                types::STAGE_STARTED,
                types::STAGE_COMPLETED,
                types::PIPELINE_COMPLETED,
            ]
        );
        let completed = sink.events_of_type(types::STAGE_COMPLETED);
        let data = completed[0].1.as_ref().unwrap();
        assert_eq!(data["stage.name"], "only");
        assert_eq!(data["stage.status"], "completed");

        let started = sink.events_of_type(types::PIPELINE_STARTED);
        let data = started[0].1.as_ref().unwrap();
        assert_eq!(data["run_id"], serde_json::json!(ctx.identity().run_id_str()));
        assert!(data["started_at"].is_string());
    }
}
