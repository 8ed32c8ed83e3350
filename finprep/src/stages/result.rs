//! Execution records kept in the run context's stage history.

use crate::core::{StageKind, StageStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What happened when one stage ran.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    /// Stage name.
    pub name: String,
    /// Stage kind.
    pub kind: StageKind,
    /// Final status.
    pub status: StageStatus,
    /// When the stage started.
    pub started_at: DateTime<Utc>,
    /// When the stage ended.
    pub ended_at: DateTime<Utc>,
    /// Table shape handed to the stage.
    pub shape_in: (usize, usize),
    /// Table shape the stage returned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape_out: Option<(usize, usize)>,
    /// Error message if failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StageResult {
    /// Creates a completed stage result.
    #[must_use]
    pub fn completed(
        name: impl Into<String>,
        kind: StageKind,
        started_at: DateTime<Utc>,
        shape_in: (usize, usize),
        shape_out: (usize, usize),
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            status: StageStatus::Completed,
            started_at,
            ended_at: Utc::now(),
            shape_in,
            shape_out: Some(shape_out),
            error: None,
        }
    }

    /// Creates a failed stage result.
    #[must_use]
    pub fn failed(
        name: impl Into<String>,
        kind: StageKind,
        started_at: DateTime<Utc>,
        shape_in: (usize, usize),
        error: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            status: StageStatus::Failed,
            started_at,
            ended_at: Utc::now(),
            shape_in,
            shape_out: None,
            error: Some(error.into()),
        }
    }

    /// Returns the duration in milliseconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn duration_ms(&self) -> f64 {
        (self.ended_at - self.started_at).num_milliseconds() as f64
    }

    /// Returns true if the stage succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == StageStatus::Completed
    }
}
