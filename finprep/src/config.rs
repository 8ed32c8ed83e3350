//! Pipeline configuration.
//!
//! Every field has a default, so a partial JSON file (or `{}`) is a valid
//! configuration. Method names are kept as strings here and parsed into
//! their enums when the chain is built, so an unknown name fails the build
//! with [`PipelineError::UnknownMethod`].

use crate::analysis::{DetectorSettings, OutlierMethod};
use crate::errors::PipelineError;
use crate::io::DEFAULT_REPORT_PATH;
use crate::processing::{
    AnonymizationStrategy, CategoricalImputation, CleanerSettings, MissingValueStrategy,
    NormalizationMethod, NumericImputation,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where records come from when no input file or table is given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Endpoint returning a JSON array of records.
    #[serde(default)]
    pub api_url: Option<String>,
    /// Request deadline in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: f64,
    /// Whether to copy the input file to `<stem>_backup<ext>`.
    #[serde(default = "default_true")]
    pub create_backup: bool,
}

fn default_timeout() -> f64 {
    30.0
}

fn default_true() -> bool {
    true
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            timeout_seconds: default_timeout(),
            create_backup: default_true(),
        }
    }
}

impl LoaderConfig {
    /// Gets the timeout as a `Duration`.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_seconds.max(0.0)).unwrap_or(Duration::MAX)
    }

    fn check(&self) -> Result<(), PipelineError> {
        ensure(
            self.timeout_seconds.is_finite() && self.timeout_seconds > 0.0,
            format!("loader.timeout_seconds must be positive, got {}", self.timeout_seconds),
        )
    }
}

fn ensure(ok: bool, message: String) -> Result<(), PipelineError> {
    if ok {
        Ok(())
    } else {
        Err(PipelineError::Configuration(message))
    }
}

/// Sensitive data handling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnonymizationConfig {
    /// `hash`, `mask` or `delete`.
    #[serde(default = "default_strategy")]
    pub strategy: String,
    /// Columns treated as sensitive regardless of name or content.
    #[serde(default)]
    pub explicit_sensitive_columns: Vec<String>,
}

fn default_strategy() -> String {
    AnonymizationStrategy::Hash.to_string()
}

impl Default for AnonymizationConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            explicit_sensitive_columns: Vec::new(),
        }
    }
}

impl AnonymizationConfig {
    /// Parses the strategy.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownMethod`] for an unknown name.
    pub fn strategy(&self) -> Result<AnonymizationStrategy, PipelineError> {
        self.strategy.parse()
    }
}

/// Outlier detection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierDetectionConfig {
    /// Any of `iqr`, `zscore`, `isolation_forest`.
    #[serde(default = "default_methods")]
    pub methods: Vec<String>,
    /// Absolute z-score above which a value is flagged.
    #[serde(default = "default_zscore_threshold")]
    pub zscore_threshold: f64,
    /// Expected outlier share for the isolation forest.
    #[serde(default = "default_contamination")]
    pub contamination: f64,
    /// Number of isolation trees.
    #[serde(default = "default_n_estimators")]
    pub n_estimators: usize,
    /// Isolation forest seed.
    #[serde(default = "default_seed")]
    pub random_seed: u64,
}

fn default_methods() -> Vec<String> {
    vec!["iqr".to_string(), "zscore".to_string()]
}

fn default_zscore_threshold() -> f64 {
    3.0
}

fn default_contamination() -> f64 {
    0.1
}

fn default_n_estimators() -> usize {
    crate::analysis::isolation::DEFAULT_N_ESTIMATORS
}

fn default_seed() -> u64 {
    crate::analysis::isolation::DEFAULT_SEED
}

impl Default for OutlierDetectionConfig {
    fn default() -> Self {
        Self {
            methods: default_methods(),
            zscore_threshold: default_zscore_threshold(),
            contamination: default_contamination(),
            n_estimators: default_n_estimators(),
            random_seed: default_seed(),
        }
    }
}

impl OutlierDetectionConfig {
    /// Parses the settings for the detector.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownMethod`] for an unknown method name and
    /// [`PipelineError::Configuration`] for an out-of-range number.
    pub fn settings(&self) -> Result<DetectorSettings, PipelineError> {
        ensure(
            self.zscore_threshold.is_finite() && self.zscore_threshold > 0.0,
            format!(
                "outlier_detection.zscore_threshold must be positive, got {}",
                self.zscore_threshold
            ),
        )?;
        ensure(
            self.contamination > 0.0 && self.contamination <= 0.5,
            format!(
                "outlier_detection.contamination must be in (0, 0.5], got {}",
                self.contamination
            ),
        )?;
        ensure(
            self.n_estimators > 0,
            "outlier_detection.n_estimators must be at least 1".to_string(),
        )?;
        let methods = self
            .methods
            .iter()
            .map(|m| m.parse::<OutlierMethod>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(DetectorSettings {
            methods,
            zscore_threshold: self.zscore_threshold,
            contamination: self.contamination,
            n_estimators: self.n_estimators,
            random_seed: self.random_seed,
        })
    }
}

/// Missing-value and outlier cleaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningConfig {
    /// `auto`, `delete` or `impute`.
    #[serde(default = "default_missing_strategy")]
    pub missing_values_strategy: String,
    /// `mean`, `median`, `knn` or `constant`.
    #[serde(default = "default_numerical_strategy")]
    pub numerical_strategy: String,
    /// `most_frequent` or `constant`.
    #[serde(default = "default_categorical_strategy")]
    pub categorical_strategy: String,
    /// Missing fraction above which `auto` drops a column.
    #[serde(default = "default_missing_threshold")]
    pub missing_threshold: f64,
    /// Whose findings to remove.
    #[serde(default = "default_outlier_removal_method")]
    pub outlier_removal_method: String,
}

fn default_missing_strategy() -> String {
    "auto".to_string()
}

fn default_numerical_strategy() -> String {
    "mean".to_string()
}

fn default_categorical_strategy() -> String {
    "most_frequent".to_string()
}

fn default_missing_threshold() -> f64 {
    0.5
}

fn default_outlier_removal_method() -> String {
    "iqr".to_string()
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            missing_values_strategy: default_missing_strategy(),
            numerical_strategy: default_numerical_strategy(),
            categorical_strategy: default_categorical_strategy(),
            missing_threshold: default_missing_threshold(),
            outlier_removal_method: default_outlier_removal_method(),
        }
    }
}

impl CleaningConfig {
    /// Parses the settings for the cleaner.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownMethod`] for an unknown name and
    /// [`PipelineError::Configuration`] for a threshold outside `[0, 1]`.
    pub fn settings(&self) -> Result<CleanerSettings, PipelineError> {
        ensure(
            (0.0..=1.0).contains(&self.missing_threshold),
            format!(
                "cleaning.missing_threshold must be in [0, 1], got {}",
                self.missing_threshold
            ),
        )?;
        Ok(CleanerSettings {
            strategy: self.missing_values_strategy.parse::<MissingValueStrategy>()?,
            numerical: self.numerical_strategy.parse::<NumericImputation>()?,
            categorical: self.categorical_strategy.parse::<CategoricalImputation>()?,
            missing_threshold: self.missing_threshold,
            outlier_method: self.outlier_removal_method.parse::<OutlierMethod>()?,
        })
    }
}

/// Feature scaling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationConfig {
    /// `minmax` or `maxabs`.
    #[serde(default = "default_normalization")]
    pub method: String,
    /// Min-max target range.
    #[serde(default = "default_feature_range")]
    pub feature_range: (f64, f64),
}

fn default_normalization() -> String {
    NormalizationMethod::MinMax.to_string()
}

fn default_feature_range() -> (f64, f64) {
    (0.0, 1.0)
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            method: default_normalization(),
            feature_range: default_feature_range(),
        }
    }
}

impl NormalizationConfig {
    /// Parses the method.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownMethod`] for an unknown name.
    pub fn method(&self) -> Result<NormalizationMethod, PipelineError> {
        self.method.parse()
    }
}

/// Report output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Where the JSON run report goes.
    #[serde(default = "default_report_path")]
    pub report_path: PathBuf,
}

fn default_report_path() -> PathBuf {
    PathBuf::from(DEFAULT_REPORT_PATH)
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            report_path: default_report_path(),
        }
    }
}

/// The whole configuration tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Loader.
    #[serde(default)]
    pub loader: LoaderConfig,
    /// Anonymization.
    #[serde(default)]
    pub anonymization: AnonymizationConfig,
    /// Outlier detection.
    #[serde(default)]
    pub outlier_detection: OutlierDetectionConfig,
    /// Cleaning.
    #[serde(default)]
    pub cleaning: CleaningConfig,
    /// Normalization.
    #[serde(default)]
    pub normalization: NormalizationConfig,
    /// Output.
    #[serde(default)]
    pub output: OutputConfig,
}

impl PipelineConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid
    /// configuration JSON.
    pub fn from_file(path: &Path) -> Result<Self, PipelineError> {
        let text = std::fs::read_to_string(path).map_err(|e| PipelineError::file_io(path, e))?;
        serde_json::from_str(&text).map_err(|e| {
            PipelineError::Configuration(format!("invalid config file {}: {e}", path.display()))
        })
    }

    /// Parses every method name and checks numeric ranges.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownMethod`] for the first unknown name and
    /// [`PipelineError::Configuration`] for the first out-of-range number.
    pub fn validate(&self) -> Result<(), PipelineError> {
        self.loader.check()?;
        self.anonymization.strategy()?;
        self.outlier_detection.settings()?;
        self.cleaning.settings()?;
        self.normalization.method()?;
        let (lo, hi) = self.normalization.feature_range;
        ensure(
            lo.is_finite() && hi.is_finite() && lo < hi,
            format!("feature_range minimum {lo} must be below maximum {hi}"),
        )
    }

    /// The tree stored as the run context's `config`.
    #[must_use]
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({}))
    }

    /// Sets the record endpoint.
    #[must_use]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.loader.api_url = Some(url.into());
        self
    }

    /// Sets the anonymization strategy.
    #[must_use]
    pub fn with_anonymization_strategy(mut self, strategy: AnonymizationStrategy) -> Self {
        self.anonymization.strategy = strategy.to_string();
        self
    }

    /// Adds explicitly sensitive columns.
    #[must_use]
    pub fn with_explicit_sensitive_columns(mut self, columns: Vec<String>) -> Self {
        self.anonymization.explicit_sensitive_columns = columns;
        self
    }

    /// Sets the outlier methods.
    #[must_use]
    pub fn with_outlier_methods(mut self, methods: &[OutlierMethod]) -> Self {
        self.outlier_detection.methods = methods.iter().map(ToString::to_string).collect();
        self
    }

    /// Sets the missing-value strategy.
    #[must_use]
    pub fn with_missing_values_strategy(mut self, strategy: MissingValueStrategy) -> Self {
        self.cleaning.missing_values_strategy = strategy.to_string();
        self
    }

    /// Sets the numeric imputation.
    #[must_use]
    pub fn with_numerical_strategy(mut self, strategy: NumericImputation) -> Self {
        self.cleaning.numerical_strategy = strategy.to_string();
        self
    }

    /// Sets the outlier removal method.
    #[must_use]
    pub fn with_outlier_removal_method(mut self, method: OutlierMethod) -> Self {
        self.cleaning.outlier_removal_method = method.to_string();
        self
    }

    /// Sets the normalization method.
    #[must_use]
    pub fn with_normalization(mut self, method: NormalizationMethod) -> Self {
        self.normalization.method = method.to_string();
        self
    }

    /// Sets the report path.
    #[must_use]
    pub fn with_report_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output.report_path = path.into();
        self
    }

    /// Enables or disables the input backup copy.
    #[must_use]
    pub fn with_backup(mut self, enabled: bool) -> Self {
        self.loader.create_backup = enabled;
        self
    }
}
