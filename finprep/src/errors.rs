//! Error types for the finprep pipeline.
//!
//! Errors fall into three categories: fatal configuration problems, fatal
//! I/O problems, and internal invariant violations. Recoverable conditions
//! (such as a failed report write) never surface as errors; they are logged
//! and appended to the run context instead.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for pipeline operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The chain could not be assembled.
    #[error("{0}")]
    Validation(#[from] PipelineValidationError),

    /// A table shape invariant was violated.
    #[error("{0}")]
    Table(#[from] TableError),

    /// Allow-listed columns that the filter cannot fabricate are absent.
    #[error("Required columns missing: {}", columns.join(", "))]
    MissingRequiredColumns {
        /// The absent column names.
        columns: Vec<String>,
    },

    /// A method name in the configuration is not recognised.
    #[error("Unknown {kind} method: {name}")]
    UnknownMethod {
        /// What the method configures (e.g. "normalization").
        kind: &'static str,
        /// The rejected name.
        name: String,
    },

    /// The configuration is invalid for another reason.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No loader input was available.
    #[error("No suitable data provider was found")]
    NoDataProvider,

    /// Fetching records from a remote source failed.
    #[error("Acquisition from {origin} failed: {reason}")]
    Acquisition {
        /// The URL or source name.
        origin: String,
        /// The underlying cause.
        reason: String,
    },

    /// Fetching records from a remote source exceeded its deadline.
    #[error("Acquisition from {origin} timed out after {timeout_seconds}s")]
    AcquisitionTimeout {
        /// The URL or source name.
        origin: String,
        /// The configured timeout.
        timeout_seconds: f64,
    },

    /// The remote source answered with a non-success status.
    #[error("HTTP {status} from {url}: {body}")]
    HttpStatus {
        /// The requested URL.
        url: String,
        /// The response status code.
        status: u16,
        /// The response body, as text.
        body: String,
    },

    /// Reading or writing a file failed.
    #[error("I/O error on {}: {source}", path.display())]
    FileIo {
        /// The file involved.
        path: PathBuf,
        /// The underlying cause.
        #[source]
        source: std::io::Error,
    },

    /// Tabular input could not be parsed.
    #[error("Malformed table data in {origin}: {reason}")]
    MalformedTable {
        /// The file or URL the data came from.
        origin: String,
        /// What was wrong.
        reason: String,
    },

    /// A stage's transformation failed.
    #[error("Stage '{stage}' failed: {source}")]
    Stage {
        /// The failing stage.
        stage: String,
        /// The stage's own error.
        #[source]
        source: Box<PipelineError>,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification used for reporting and exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Bad configuration or input schema; aborts immediately.
    FatalConfiguration,
    /// Acquisition or file system failure; aborts the run.
    FatalIo,
    /// Broken internal invariant.
    Internal,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FatalConfiguration => write!(f, "fatal_configuration"),
            Self::FatalIo => write!(f, "fatal_io"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

impl PipelineError {
    /// Wraps an error with the name of the stage that produced it.
    #[must_use]
    pub fn in_stage(stage: impl Into<String>, source: Self) -> Self {
        Self::Stage {
            stage: stage.into(),
            source: Box::new(source),
        }
    }

    /// Creates a file I/O error.
    #[must_use]
    pub fn file_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileIo {
            path: path.into(),
            source,
        }
    }

    /// Creates an unknown method error.
    #[must_use]
    pub fn unknown_method(kind: &'static str, name: impl Into<String>) -> Self {
        Self::UnknownMethod {
            kind,
            name: name.into(),
        }
    }

    /// Returns the failing stage name, if the error came out of the chain.
    #[must_use]
    pub fn stage(&self) -> Option<&str> {
        match self {
            Self::Stage { stage, .. } => Some(stage),
            _ => None,
        }
    }

    /// Returns the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Stage { source, .. } => source.category(),
            Self::Validation(_)
            | Self::MissingRequiredColumns { .. }
            | Self::UnknownMethod { .. }
            | Self::Configuration(_)
            | Self::NoDataProvider => ErrorCategory::FatalConfiguration,
            Self::Acquisition { .. }
            | Self::AcquisitionTimeout { .. }
            | Self::HttpStatus { .. }
            | Self::FileIo { .. }
            | Self::MalformedTable { .. } => ErrorCategory::FatalIo,
            Self::Table(_) | Self::Serialization(_) | Self::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("category".to_string(), serde_json::json!(self.category()));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        if let Some(stage) = self.stage() {
            map.insert("stage".to_string(), serde_json::json!(stage));
        }
        if let Self::MissingRequiredColumns { columns } = self {
            map.insert("columns".to_string(), serde_json::json!(columns));
        }
        map
    }
}

/// Diagnostic metadata attached to chain assembly errors.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ErrorInfo {
    /// Error code (e.g., "CHAIN-EMPTY").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
}

impl ErrorInfo {
    /// Creates new error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }
}

/// Error raised when a processing chain cannot be built.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PipelineValidationError {
    /// The error message.
    pub message: String,
    /// The stages involved in the error.
    pub stages: Vec<String>,
    /// Optional diagnostic info.
    pub error_info: Option<ErrorInfo>,
}

impl PipelineValidationError {
    /// Creates a new validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stages: Vec::new(),
            error_info: None,
        }
    }

    /// Sets the stages involved.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<String>) -> Self {
        self.stages = stages;
        self
    }

    /// Sets the diagnostic info.
    #[must_use]
    pub fn with_error_info(mut self, info: ErrorInfo) -> Self {
        self.error_info = Some(info);
        self
    }
}

/// Violations of the table shape invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    /// A column's length differs from the table's row count.
    #[error("Column '{column}' has {actual} values but the table has {expected} rows")]
    LengthMismatch {
        /// The offending column.
        column: String,
        /// The table's row count.
        expected: usize,
        /// The column's length.
        actual: usize,
    },

    /// Two columns share a name.
    #[error("Duplicate column name: {0}")]
    DuplicateColumn(String),

    /// The referenced column does not exist.
    #[error("Column not found: {0}")]
    ColumnNotFound(String),
}
