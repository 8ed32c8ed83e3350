//! Descriptive statistics and missing-value analysis.

use crate::core::{ColumnType, Table, Value};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Arithmetic mean. `None` for an empty slice.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Variance with `ddof` delta degrees of freedom. `None` when `n <= ddof`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn variance(values: &[f64], ddof: usize) -> Option<f64> {
    if values.len() <= ddof {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some(ss / (values.len() - ddof) as f64)
}

/// Standard deviation with `ddof` delta degrees of freedom.
#[must_use]
pub fn std_dev(values: &[f64], ddof: usize) -> Option<f64> {
    variance(values, ddof).map(f64::sqrt)
}

/// Returns a sorted copy, NaN-safe.
#[must_use]
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    out.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    out
}

/// Quantile of sorted data using linear interpolation between closest ranks.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn quantile_sorted(sorted_values: &[f64], q: f64) -> Option<f64> {
    if sorted_values.is_empty() {
        return None;
    }
    let position = q.clamp(0.0, 1.0) * (sorted_values.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted_values[lower] + (sorted_values[upper] - sorted_values[lower]) * fraction)
}

/// Central moments `(m2, m3, m4)` divided by `n`.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn central_moments(values: &[f64]) -> Option<(f64, f64, f64)> {
    let m = mean(values)?;
    let n = values.len() as f64;
    let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
    for v in values {
        let d = v - m;
        let d2 = d * d;
        m2 += d2;
        m3 += d2 * d;
        m4 += d2 * d2;
    }
    Some((m2 / n, m3 / n, m4 / n))
}

/// Population (biased) skewness `m3 / m2^1.5`. Undefined for a constant sample.
#[must_use]
pub fn population_skewness(values: &[f64]) -> Option<f64> {
    let (m2, m3, _) = central_moments(values)?;
    (m2 > 0.0).then(|| m3 / m2.powf(1.5))
}

/// Population excess kurtosis `m4 / m2^2 - 3`. Undefined for a constant sample.
#[must_use]
pub fn population_kurtosis(values: &[f64]) -> Option<f64> {
    let (m2, _, m4) = central_moments(values)?;
    (m2 > 0.0).then(|| m4 / (m2 * m2) - 3.0)
}

/// Bias-corrected sample skewness. Needs at least three values.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn sample_skewness(values: &[f64]) -> Option<f64> {
    if values.len() < 3 {
        return None;
    }
    let (m2, m3, _) = central_moments(values)?;
    if m2 == 0.0 {
        return Some(0.0);
    }
    let n = values.len() as f64;
    Some((n * (n - 1.0)).sqrt() / (n - 2.0) * m3 / m2.powf(1.5))
}

/// Bias-corrected sample excess kurtosis. Needs at least four values.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn sample_kurtosis(values: &[f64]) -> Option<f64> {
    if values.len() < 4 {
        return None;
    }
    let (m2, _, m4) = central_moments(values)?;
    if m2 == 0.0 {
        return Some(0.0);
    }
    let n = values.len() as f64;
    let s2 = m2 * n;
    let s4 = m4 * n;
    let numerator = n * (n + 1.0) * (n - 1.0) * s4;
    let denominator = (n - 2.0) * (n - 3.0) * s2 * s2;
    let adjustment = 3.0 * (n - 1.0).powi(2) / ((n - 2.0) * (n - 3.0));
    Some(numerator / denominator - adjustment)
}

/// Count, mean, spread and quartiles of one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescribeBlock {
    /// Observed values.
    pub count: usize,
    /// Mean.
    pub mean: Option<f64>,
    /// Sample standard deviation.
    pub std: Option<f64>,
    /// Minimum.
    pub min: Option<f64>,
    /// First quartile.
    #[serde(rename = "25%")]
    pub q1: Option<f64>,
    /// Median.
    #[serde(rename = "50%")]
    pub median: Option<f64>,
    /// Third quartile.
    #[serde(rename = "75%")]
    pub q3: Option<f64>,
    /// Maximum.
    pub max: Option<f64>,
}

impl DescribeBlock {
    /// Describes the observed values of a column.
    #[must_use]
    pub fn from_values(values: &[f64]) -> Self {
        let ordered = sorted(values);
        Self {
            count: values.len(),
            mean: mean(values),
            std: std_dev(values, 1),
            min: ordered.first().copied(),
            q1: quantile_sorted(&ordered, 0.25),
            median: quantile_sorted(&ordered, 0.5),
            q3: quantile_sorted(&ordered, 0.75),
            max: ordered.last().copied(),
        }
    }
}

/// Summary of a text column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalStats {
    /// Distinct observed values.
    pub unique_count: usize,
    /// The most frequent value; ties resolve to the smallest.
    pub most_frequent: Option<String>,
    /// Occurrences of each value.
    pub frequency: BTreeMap<String, usize>,
}

/// Per-table descriptive statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptiveStats {
    /// `(rows, columns)`.
    pub shape: (usize, usize),
    /// Column names in order.
    pub columns: Vec<String>,
    /// Column name to type name.
    pub dtypes: BTreeMap<String, ColumnType>,
    /// Describe blocks of numeric columns.
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub numerical_stats: BTreeMap<String, DescribeBlock>,
    /// Sample variance of numeric columns.
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub variance: BTreeMap<String, Option<f64>>,
    /// Bias-corrected skewness of numeric columns.
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub skewness: BTreeMap<String, Option<f64>>,
    /// Bias-corrected excess kurtosis of numeric columns.
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub kurtosis: BTreeMap<String, Option<f64>>,
    /// Summaries of text columns.
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub categorical_stats: BTreeMap<String, CategoricalStats>,
}

/// Which columns have gaps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingPattern {
    /// Columns without missing values.
    pub complete_columns: Vec<String>,
    /// Columns with at least one missing value.
    pub incomplete_columns: Vec<String>,
}

/// Missing-value analysis of a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingAnalysis {
    /// Missing cells over all cells, in percent. Zero for a table without cells.
    pub overall_missing_percentage: f64,
    /// Missing counts, only for columns with gaps.
    pub missing_by_column: BTreeMap<String, usize>,
    /// Missing percentage of every column.
    pub missing_percentage_by_column: BTreeMap<String, f64>,
    /// Complete / incomplete partition.
    pub missing_pattern: MissingPattern,
}

/// Computes descriptive statistics for every column.
#[must_use]
pub fn describe(table: &Table) -> DescriptiveStats {
    let mut stats = DescriptiveStats {
        shape: table.shape(),
        columns: table.column_names(),
        dtypes: table
            .columns()
            .iter()
            .map(|c| (c.name().to_string(), c.kind()))
            .collect(),
        numerical_stats: BTreeMap::new(),
        variance: BTreeMap::new(),
        skewness: BTreeMap::new(),
        kurtosis: BTreeMap::new(),
        categorical_stats: BTreeMap::new(),
    };
    debug!(shape = ?stats.shape, "Describing table");

    for column in table.columns() {
        let name = column.name().to_string();
        match column.kind() {
            ColumnType::Numeric => {
                let values = column.observed_numbers();
                let block = DescribeBlock::from_values(&values);
                debug!(column = %name, mean = ?block.mean, std = ?block.std, "Numeric column");
                stats.variance.insert(name.clone(), variance(&values, 1));
                stats.skewness.insert(name.clone(), sample_skewness(&values));
                stats.kurtosis.insert(name.clone(), sample_kurtosis(&values));
                stats.numerical_stats.insert(name, block);
            }
            ColumnType::Text => {
                let frequency = value_counts(column.values());
                let most_frequent = mode(&frequency);
                stats.categorical_stats.insert(
                    name,
                    CategoricalStats {
                        unique_count: frequency.len(),
                        most_frequent,
                        frequency,
                    },
                );
            }
            ColumnType::Boolean | ColumnType::Date => {}
        }
    }

    info!(
        numeric = stats.numerical_stats.len(),
        categorical = stats.categorical_stats.len(),
        "Descriptive statistics generated"
    );
    stats
}

/// Counts observed text values.
pub(crate) fn value_counts(values: &[Value]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for value in values.iter().filter(|v| !v.is_missing()) {
        *counts.entry(value.to_string()).or_insert(0) += 1;
    }
    counts
}

/// The most frequent key; the map's ordering breaks ties toward the smallest key.
pub(crate) fn mode(counts: &BTreeMap<String, usize>) -> Option<String> {
    counts
        .iter()
        .fold(None, |best: Option<(&String, usize)>, (key, &count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((key, count)),
        })
        .map(|(key, _)| key.clone())
}

/// Analyzes missing values per column and overall.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn analyze_missing(table: &Table) -> MissingAnalysis {
    let total = table.total_cells();
    let missing = table.missing_cells();
    let overall = if total == 0 {
        0.0
    } else {
        missing as f64 / total as f64 * 100.0
    };

    let rows = table.n_rows();

    let mut analysis = MissingAnalysis {
        overall_missing_percentage: overall,
        missing_by_column: BTreeMap::new(),
        missing_percentage_by_column: BTreeMap::new(),
        missing_pattern: MissingPattern {
            complete_columns: Vec::new(),
            incomplete_columns: Vec::new(),
        },
    };

    for column in table.columns() {
        let name = column.name().to_string();
        let count = column.missing_count();
        let percentage = if rows == 0 {
            0.0
        } else {
            count as f64 / rows as f64 * 100.0
        };
        analysis
            .missing_percentage_by_column
            .insert(name.clone(), percentage);
        if count > 0 {
            warn!(column = %name, count, percentage, "Missing values detected");
            analysis.missing_by_column.insert(name.clone(), count);
            analysis.missing_pattern.incomplete_columns.push(name);
        } else {
            analysis.missing_pattern.complete_columns.push(name);
        }
    }

    if missing == 0 {
        info!("No missing values detected");
    } else {
        warn!(missing, overall, "Missing values detected in table");
    }
    analysis
}
