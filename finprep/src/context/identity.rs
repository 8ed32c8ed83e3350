//! Run identity for correlating the events and reports of one execution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Identifies a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunIdentity {
    /// The unique ID for this run.
    pub run_id: Uuid,
    /// When the run context was created.
    pub started_at: DateTime<Utc>,
    /// Optional human-readable pipeline name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipeline_name: Option<String>,
}

impl Default for RunIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl RunIdentity {
    /// Creates an identity with a freshly generated run ID.
    #[must_use]
    pub fn new() -> Self {
        Self::with_run_id(Uuid::new_v4())
    }

    /// Creates an identity with a specific run ID.
    #[must_use]
    pub fn with_run_id(run_id: Uuid) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            pipeline_name: None,
        }
    }

    /// Sets the pipeline name.
    #[must_use]
    pub fn with_pipeline_name(mut self, name: impl Into<String>) -> Self {
        self.pipeline_name = Some(name.into());
        self
    }

    /// Returns the run ID as a string.
    #[must_use]
    pub fn run_id_str(&self) -> String {
        self.run_id.to_string()
    }

    /// Converts to a dictionary with string values (or null).
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("run_id".to_string(), serde_json::json!(self.run_id_str()));
        map.insert(
            "started_at".to_string(),
            serde_json::json!(self.started_at.to_rfc3339()),
        );
        map.insert(
            "pipeline_name".to_string(),
            self.pipeline_name
                .as_ref()
                .map_or(serde_json::Value::Null, |n| serde_json::json!(n)),
        );
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_identities_differ() {
        assert_ne!(RunIdentity::new().run_id, RunIdentity::new().run_id);
    }

    #[test]
    fn test_to_dict() {
        let identity = RunIdentity::new().with_pipeline_name("preprocessing");
        let dict = identity.to_dict();

        assert_eq!(dict["run_id"], serde_json::json!(identity.run_id_str()));
        assert_eq!(dict["pipeline_name"], "preprocessing");
    }

    #[test]
    fn test_serialization_skips_missing_name() {
        let identity = RunIdentity::with_run_id(Uuid::nil());
        let json = serde_json::to_value(&identity).unwrap();

        assert!(json.get("pipeline_name").is_none());
        let back: RunIdentity = serde_json::from_value(json).unwrap();
        assert_eq!(back.run_id, Uuid::nil());
    }
}
