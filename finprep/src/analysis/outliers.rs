//! Outlier detection and distribution analysis over numeric columns.

use super::descriptive::{
    mean, population_kurtosis, population_skewness, quantile_sorted, sorted, std_dev,
};
use super::isolation::IsolationForest;
use super::normality::{dagostino_pearson, NormalityTest};
use crate::core::{Table, Value};
use crate::errors::PipelineError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

/// Significance level of the normality test.
pub const NORMALITY_ALPHA: f64 = 0.05;

/// An outlier detection method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierMethod {
    /// Tukey fences around the interquartile range.
    Iqr,
    /// Absolute z-score above a threshold.
    Zscore,
    /// Isolation-forest ensemble over all numeric columns.
    IsolationForest,
}

impl fmt::Display for OutlierMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Iqr => write!(f, "iqr"),
            Self::Zscore => write!(f, "zscore"),
            Self::IsolationForest => write!(f, "isolation_forest"),
        }
    }
}

impl FromStr for OutlierMethod {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "iqr" => Ok(Self::Iqr),
            "zscore" => Ok(Self::Zscore),
            "isolation_forest" => Ok(Self::IsolationForest),
            other => Err(PipelineError::unknown_method("outlier detection", other)),
        }
    }
}

/// What one method found in one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierFinding {
    /// Lower Tukey fence.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub lower_bound: Option<f64>,
    /// Upper Tukey fence.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub upper_bound: Option<f64>,
    /// Z-score threshold.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub threshold: Option<f64>,
    /// Isolation contamination.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub contamination: Option<f64>,
    /// Number of flagged rows.
    pub outlier_count: usize,
    /// Flagged rows over evaluated rows, in percent.
    pub outlier_percentage: f64,
    /// Labels of flagged rows.
    pub outlier_indices: Vec<usize>,
}

impl OutlierFinding {
    #[allow(clippy::cast_precision_loss)]
    fn with_indices(mut self, indices: Vec<usize>, evaluated: usize) -> Self {
        self.outlier_count = indices.len();
        self.outlier_percentage = if evaluated == 0 {
            0.0
        } else {
            indices.len() as f64 / evaluated as f64 * 100.0
        };
        self.outlier_indices = indices;
        self
    }

    fn empty() -> Self {
        Self {
            lower_bound: None,
            upper_bound: None,
            threshold: None,
            contamination: None,
            outlier_count: 0,
            outlier_percentage: 0.0,
            outlier_indices: Vec::new(),
        }
    }
}

/// Column name to method to finding.
pub type OutlierInfo = BTreeMap<String, BTreeMap<OutlierMethod, OutlierFinding>>;

/// Normality test result as reported.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalityReport {
    /// The `K²` statistic.
    pub statistic: f64,
    /// Its p-value.
    pub p_value: f64,
    /// Whether normality is not rejected.
    pub is_normal: bool,
}

impl From<NormalityTest> for NormalityReport {
    fn from(test: NormalityTest) -> Self {
        Self {
            statistic: test.statistic,
            p_value: test.p_value,
            is_normal: test.is_normal(NORMALITY_ALPHA),
        }
    }
}

/// Shape of one column's distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionProfile {
    /// Omnibus normality test, when the sample allows it.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub normality_test: Option<NormalityReport>,
    /// Population skewness.
    pub skewness: Option<f64>,
    /// Population excess kurtosis.
    pub kurtosis: Option<f64>,
    /// Symmetry label.
    pub distribution_type: String,
}

/// Labels a distribution by the magnitude of its skewness.
///
/// Undefined skewness (constant or empty data) is labelled symmetric.
#[must_use]
pub fn distribution_type(skewness: Option<f64>) -> &'static str {
    match skewness.map(f64::abs) {
        Some(s) if s >= 1.0 => "highly skewed",
        Some(s) if s >= 0.5 => "moderately skewed",
        _ => "approximately symmetric",
    }
}

/// Everything the detector reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierReport {
    /// Per-column, per-method findings.
    pub outlier_info: OutlierInfo,
    /// Per-column distribution profiles.
    pub distribution_info: BTreeMap<String, DistributionProfile>,
    /// Methods that were requested.
    pub methods: Vec<OutlierMethod>,
}

impl OutlierReport {
    /// Unique row labels flagged by any method in any column.
    #[must_use]
    pub fn total_outliers(&self) -> usize {
        self.outlier_info
            .values()
            .flat_map(BTreeMap::values)
            .flat_map(|f| f.outlier_indices.iter().copied())
            .collect::<BTreeSet<_>>()
            .len()
    }
}

/// Tukey fences at `Q1 - 1.5 IQR` and `Q3 + 1.5 IQR`.
#[must_use]
pub fn detect_iqr(values: &[(usize, f64)]) -> OutlierFinding {
    let numbers: Vec<f64> = values.iter().map(|(_, v)| *v).collect();
    let ordered = sorted(&numbers);
    let (Some(q1), Some(q3)) = (quantile_sorted(&ordered, 0.25), quantile_sorted(&ordered, 0.75))
    else {
        return OutlierFinding::empty();
    };
    let iqr = q3 - q1;
    let lower = q1 - 1.5 * iqr;
    let upper = q3 + 1.5 * iqr;

    let indices = values
        .iter()
        .filter(|(_, v)| *v < lower || *v > upper)
        .map(|(label, _)| *label)
        .collect();

    OutlierFinding {
        lower_bound: Some(lower),
        upper_bound: Some(upper),
        ..OutlierFinding::empty()
    }
    .with_indices(indices, values.len())
}

/// Flags values whose population z-score exceeds the threshold in magnitude.
#[must_use]
pub fn detect_zscore(values: &[(usize, f64)], threshold: f64) -> OutlierFinding {
    let numbers: Vec<f64> = values.iter().map(|(_, v)| *v).collect();
    let indices = match (mean(&numbers), std_dev(&numbers, 0)) {
        (Some(m), Some(s)) if s > 0.0 => values
            .iter()
            .filter(|(_, v)| ((v - m) / s).abs() > threshold)
            .map(|(label, _)| *label)
            .collect(),
        _ => Vec::new(),
    };

    OutlierFinding {
        threshold: Some(threshold),
        ..OutlierFinding::empty()
    }
    .with_indices(indices, values.len())
}

/// Settings of the outlier detector.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorSettings {
    /// Methods to run.
    pub methods: Vec<OutlierMethod>,
    /// Z-score threshold.
    pub zscore_threshold: f64,
    /// Expected outlier share for the isolation forest.
    pub contamination: f64,
    /// Number of isolation trees.
    pub n_estimators: usize,
    /// Isolation forest seed.
    pub random_seed: u64,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            methods: vec![OutlierMethod::Iqr, OutlierMethod::Zscore],
            zscore_threshold: 3.0,
            contamination: 0.1,
            n_estimators: super::isolation::DEFAULT_N_ESTIMATORS,
            random_seed: super::isolation::DEFAULT_SEED,
        }
    }
}

/// Runs the configured methods and the distribution analysis.
#[derive(Debug, Clone, Default)]
pub struct OutlierDetector {
    settings: DetectorSettings,
}

impl OutlierDetector {
    /// Creates a detector.
    #[must_use]
    pub fn new(settings: DetectorSettings) -> Self {
        Self { settings }
    }

    /// Returns the settings.
    #[must_use]
    pub fn settings(&self) -> &DetectorSettings {
        &self.settings
    }

    /// Detects outliers and profiles distributions of every numeric column.
    #[must_use]
    pub fn detect(&self, table: &Table) -> OutlierReport {
        info!(methods = ?self.settings.methods, "Detecting outliers");
        let numeric = table.numeric_column_names();

        let isolation = if self.settings.methods.contains(&OutlierMethod::IsolationForest)
            && numeric.len() > 1
        {
            Some(self.isolation_finding(table, &numeric))
        } else {
            None
        };

        let mut outlier_info = OutlierInfo::new();
        let mut distribution_info = BTreeMap::new();

        for name in &numeric {
            let Some(column) = table.column(name) else {
                continue;
            };
            let observed: Vec<(usize, f64)> = table
                .labels()
                .iter()
                .zip(column.values())
                .filter_map(|(label, v)| v.as_f64().map(|x| (*label, x)))
                .collect();

            let mut per_method = BTreeMap::new();
            for method in &self.settings.methods {
                let finding = match method {
                    OutlierMethod::Iqr => detect_iqr(&observed),
                    OutlierMethod::Zscore => {
                        detect_zscore(&observed, self.settings.zscore_threshold)
                    }
                    OutlierMethod::IsolationForest => match &isolation {
                        Some(finding) => finding.clone(),
                        None => continue,
                    },
                };
                per_method.insert(*method, finding);
            }
            log_column(name, &per_method);
            outlier_info.insert(name.clone(), per_method);

            let numbers: Vec<f64> = observed.iter().map(|(_, v)| *v).collect();
            distribution_info.insert(name.clone(), profile(name, &numbers));
        }

        OutlierReport {
            outlier_info,
            distribution_info,
            methods: self.settings.methods.clone(),
        }
    }

    fn isolation_finding(&self, table: &Table, numeric: &[String]) -> OutlierFinding {
        let complete = table.complete_rows(numeric);
        let columns: Vec<&[Value]> = numeric
            .iter()
            .filter_map(|n| table.column(n).map(crate::core::Column::values))
            .collect();

        let mut labels = Vec::new();
        let mut rows = Vec::new();
        for (position, keep) in complete.iter().enumerate() {
            if !keep {
                continue;
            }
            let row: Vec<f64> = columns
                .iter()
                .filter_map(|c| c[position].as_f64())
                .collect();
            labels.push(table.labels()[position]);
            rows.push(row);
        }

        let mut forest = IsolationForest::new(self.settings.contamination)
            .with_estimators(self.settings.n_estimators)
            .with_seed(self.settings.random_seed);
        let flags = forest.fit_predict(&rows);
        let indices = labels
            .into_iter()
            .zip(flags)
            .filter_map(|(label, flagged)| flagged.then_some(label))
            .collect();

        OutlierFinding {
            contamination: Some(self.settings.contamination),
            ..OutlierFinding::empty()
        }
        .with_indices(indices, rows.len())
    }
}

fn profile(name: &str, values: &[f64]) -> DistributionProfile {
    let skewness = population_skewness(values);
    let profile = DistributionProfile {
        normality_test: dagostino_pearson(values).map(NormalityReport::from),
        skewness,
        kurtosis: population_kurtosis(values),
        distribution_type: distribution_type(skewness).to_string(),
    };
    info!(
        column = %name,
        distribution = %profile.distribution_type,
        skewness = ?profile.skewness,
        normal = profile.normality_test.is_some_and(|t| t.is_normal),
        "Distribution analyzed"
    );
    profile
}

fn log_column(name: &str, findings: &BTreeMap<OutlierMethod, OutlierFinding>) {
    let mut unique = BTreeSet::new();
    for (method, finding) in findings {
        if finding.outlier_count > 0 {
            warn!(
                column = %name,
                method = %method,
                count = finding.outlier_count,
                percentage = finding.outlier_percentage,
                "Outliers detected"
            );
        }
        unique.extend(finding.outlier_indices.iter().copied());
    }
    if !unique.is_empty() {
        warn!(column = %name, unique = unique.len(), "Column has outliers");
    }
}
