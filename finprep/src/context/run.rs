//! Mutable per-run state shared by every stage.

use super::identity::RunIdentity;
use super::lookup::{resolve_path, ContextScope};
use super::stores::ContextStore;
use crate::errors::PipelineError;
use crate::events::{EventSink, NoOpEventSink};
use crate::stages::StageResult;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

/// State for one pipeline execution.
///
/// Stages receive the context by `&mut` in chain order. Entries are only
/// added or overwritten, never removed.
pub struct RunContext {
    input_file: Option<PathBuf>,
    output_file: Option<PathBuf>,
    config: Value,
    results: ContextStore,
    statistics: ContextStore,
    errors: Vec<String>,
    attributes: ContextStore,
    identity: RunIdentity,
    stage_history: Vec<StageResult>,
    event_sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("run_id", &self.identity.run_id)
            .field("input_file", &self.input_file)
            .field("output_file", &self.output_file)
            .field("results", &self.results.keys())
            .field("statistics", &self.statistics.keys())
            .field("errors", &self.errors)
            .finish_non_exhaustive()
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new(Value::Object(serde_json::Map::new()))
    }
}

impl RunContext {
    /// Creates a context around a stage option tree.
    #[must_use]
    pub fn new(config: Value) -> Self {
        Self {
            input_file: None,
            output_file: None,
            config,
            results: ContextStore::new(),
            statistics: ContextStore::new(),
            errors: Vec::new(),
            attributes: ContextStore::new(),
            identity: RunIdentity::new(),
            stage_history: Vec::new(),
            event_sink: Arc::new(NoOpEventSink),
        }
    }

    /// Sets the input file.
    #[must_use]
    pub fn with_input_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.input_file = Some(path.into());
        self
    }

    /// Sets the output file.
    #[must_use]
    pub fn with_output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_file = Some(path.into());
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Sets the run identity.
    #[must_use]
    pub fn with_identity(mut self, identity: RunIdentity) -> Self {
        self.identity = identity;
        self
    }

    /// Returns the input file, if any.
    pub fn input_file(&self) -> Option<&Path> {
        self.input_file.as_deref()
    }

    /// Returns the output file, if any.
    pub fn output_file(&self) -> Option<&Path> {
        self.output_file.as_deref()
    }

    /// Returns the stage option tree.
    pub fn config(&self) -> &Value {
        &self.config
    }

    /// Returns the per-stage findings.
    pub fn results(&self) -> &ContextStore {
        &self.results
    }

    /// Returns the run metrics.
    pub fn statistics(&self) -> &ContextStore {
        &self.statistics
    }

    /// Returns the recorded errors, oldest first.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Returns the attribute store.
    pub fn attributes(&self) -> &ContextStore {
        &self.attributes
    }

    /// Returns the run identity.
    pub fn identity(&self) -> &RunIdentity {
        &self.identity
    }

    /// Returns the execution record of each stage run so far.
    pub fn stage_history(&self) -> &[StageResult] {
        &self.stage_history
    }

    /// Returns a handle to the event sink.
    pub fn event_sink(&self) -> Arc<dyn EventSink> {
        Arc::clone(&self.event_sink)
    }

    /// Records a stage's findings, replacing any earlier entry of that name.
    pub fn add_result(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.results.set(name, value.into());
    }

    /// Records a run metric.
    pub fn add_statistic(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.statistics.set(key, value.into());
    }

    /// Appends a recoverable error message.
    pub fn add_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!(run_id = %self.identity.run_id, error = %message, "Error recorded in context");
        self.errors.push(message);
    }

    /// Attaches a named value directly to the context.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.set(name, value.into());
    }

    pub(crate) fn record_stage(&mut self, result: StageResult) {
        self.stage_history.push(result);
    }

    /// Resolves a key, reporting which scope answered.
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<(ContextScope, Value)> {
        ContextScope::LOOKUP_ORDER
            .iter()
            .find_map(|scope| self.resolve_in(*scope, key).map(|v| (*scope, v)))
    }

    /// Resolves a key in one scope.
    #[must_use]
    pub fn resolve_in(&self, scope: ContextScope, key: &str) -> Option<Value> {
        match scope {
            ContextScope::Results => self.results.resolve(key).cloned(),
            ContextScope::Statistics => self.statistics.resolve(key).cloned(),
            ContextScope::Config => resolve_path(&self.config, key).cloned(),
            ContextScope::Attributes => self.direct_attribute(key),
        }
    }

    fn direct_attribute(&self, key: &str) -> Option<Value> {
        let path_value = |p: &Option<PathBuf>| {
            p.as_ref()
                .map(|path| Value::String(path.display().to_string()))
        };
        match key {
            "input_file" => path_value(&self.input_file),
            "output_file" => path_value(&self.output_file),
            "errors" => Some(Value::from(self.errors.clone())),
            "run_id" => Some(Value::String(self.identity.run_id_str())),
            _ => self.attributes.resolve(key).cloned(),
        }
    }

    /// Generic lookup: results, statistics, config, then direct attributes.
    #[must_use]
    pub fn get(&self, key: &str, default: Value) -> Value {
        self.lookup(key).map_or(default, |(_, v)| v)
    }

    /// Looks up a key and deserializes it.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the value does not match `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, PipelineError> {
        self.lookup(key)
            .map(|(_, v)| serde_json::from_value(v))
            .transpose()
            .map_err(PipelineError::from)
    }

    /// Produces the structured body of the run report.
    #[must_use]
    pub fn snapshot(&self) -> Value {
        let path_json = |p: &Option<PathBuf>| {
            p.as_ref()
                .map_or(Value::Null, |path| Value::String(path.display().to_string()))
        };
        serde_json::json!({
            "run_id": self.identity.run_id_str(),
            "started_at": self.identity.started_at.to_rfc3339(),
            "input_file": path_json(&self.input_file),
            "output_file": path_json(&self.output_file),
            "config": self.config,
            "results": self.results,
            "statistics": self.statistics,
            "errors": self.errors,
            "attributes": self.attributes,
            "stage_history": self.stage_history,
        })
    }
}
