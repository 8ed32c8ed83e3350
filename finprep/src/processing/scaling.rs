//! Feature scaling of numeric columns.
//!
//! Scalers fit on observed values only and leave missing cells missing.

use crate::analysis::descriptive::{mean, std_dev};
use crate::core::{Column, ColumnType, Table, Value};
use crate::errors::PipelineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// Normalization method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum NormalizationMethod {
    /// Rescale linearly into a target range.
    #[default]
    #[serde(rename = "minmax")]
    MinMax,
    /// Divide by the largest absolute value.
    #[serde(rename = "maxabs")]
    MaxAbs,
}

impl fmt::Display for NormalizationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MinMax => write!(f, "minmax"),
            Self::MaxAbs => write!(f, "maxabs"),
        }
    }
}

impl FromStr for NormalizationMethod {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "minmax" => Ok(Self::MinMax),
            "maxabs" => Ok(Self::MaxAbs),
            other => Err(PipelineError::unknown_method("normalization", other)),
        }
    }
}

/// Fitted normalization parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationReport {
    /// Method applied.
    pub method: NormalizationMethod,
    /// Target range; only for min-max.
    pub range: Option<(f64, f64)>,
    /// Scaled columns.
    pub columns: Vec<String>,
    /// Per-column minimum; only for min-max.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_min: Option<Vec<Option<f64>>>,
    /// Per-column maximum; only for min-max.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_max: Option<Vec<Option<f64>>>,
    /// Per-column largest absolute value; only for max-abs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_abs: Option<Vec<Option<f64>>>,
}

/// Fitted standardization parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardizationReport {
    /// Always `standard_scaler`.
    pub method: String,
    /// Scaled columns.
    pub columns: Vec<String>,
    /// Per-column mean.
    pub mean: Vec<Option<f64>>,
    /// Per-column divisor; population standard deviation, or 1 when it is zero.
    pub scale: Vec<f64>,
}

/// Both scaling passes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformationReport {
    /// Normalization, absent without numeric columns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalization: Option<NormalizationReport>,
    /// Standardization, absent without numeric columns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standardization: Option<StandardizationReport>,
}

fn map_numeric(column: &Column, f: impl Fn(f64) -> f64) -> Column {
    let values = column
        .values()
        .iter()
        .map(|v| v.as_f64().map_or(Value::Missing, |x| Value::number(f(x))))
        .collect();
    Column::new(column.name(), ColumnType::Numeric, values)
}

fn extent(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(*v), hi.max(*v))
    }))
}

/// Rescales numeric columns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalizer {
    method: NormalizationMethod,
    feature_range: (f64, f64),
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(NormalizationMethod::MinMax)
    }
}

impl Normalizer {
    /// Creates a normalizer targeting `[0, 1]`.
    #[must_use]
    pub fn new(method: NormalizationMethod) -> Self {
        Self {
            method,
            feature_range: (0.0, 1.0),
        }
    }

    /// Sets the min-max target range.
    #[must_use]
    pub fn with_feature_range(mut self, range: (f64, f64)) -> Self {
        self.feature_range = range;
        self
    }

    /// Fits on and transforms every numeric column.
    ///
    /// # Errors
    ///
    /// Returns an error if a scaled column no longer fits the table.
    pub fn normalize(
        &self,
        mut table: Table,
    ) -> Result<(Table, Option<NormalizationReport>), PipelineError> {
        info!(method = %self.method, "Normalizing data");
        let columns = table.numeric_column_names();
        if columns.is_empty() {
            return Ok((table, None));
        }

        let (lo, hi) = self.feature_range;
        let mut mins = Vec::new();
        let mut maxs = Vec::new();
        let mut abs = Vec::new();

        for name in &columns {
            let Some(column) = table.column(name) else {
                continue;
            };
            let observed = column.observed_numbers();
            let scaled = match self.method {
                NormalizationMethod::MinMax => {
                    let bounds = extent(&observed);
                    mins.push(bounds.map(|b| b.0));
                    maxs.push(bounds.map(|b| b.1));
                    let (min, max) = bounds.unwrap_or((0.0, 1.0));
                    let span = if max - min == 0.0 { 1.0 } else { max - min };
                    map_numeric(column, |x| (x - min) / span * (hi - lo) + lo)
                }
                NormalizationMethod::MaxAbs => {
                    let peak = extent(&observed).map(|(min, max)| min.abs().max(max.abs()));
                    abs.push(peak);
                    let divisor = match peak {
                        Some(p) if p != 0.0 => p,
                        _ => 1.0,
                    };
                    map_numeric(column, |x| x / divisor)
                }
            };
            table.replace_column(scaled)?;
        }

        info!(columns = columns.len(), "Normalized numeric columns");
        let report = match self.method {
            NormalizationMethod::MinMax => NormalizationReport {
                method: self.method,
                range: Some(self.feature_range),
                columns,
                data_min: Some(mins),
                data_max: Some(maxs),
                max_abs: None,
            },
            NormalizationMethod::MaxAbs => NormalizationReport {
                method: self.method,
                range: None,
                columns,
                data_min: None,
                data_max: None,
                max_abs: Some(abs),
            },
        };
        Ok((table, Some(report)))
    }
}

/// Centers numeric columns and scales them to unit population variance.
#[derive(Debug, Clone, Copy, Default)]
pub struct Standardizer;

impl Standardizer {
    /// Fits on and transforms every numeric column.
    ///
    /// # Errors
    ///
    /// Returns an error if a scaled column no longer fits the table.
    pub fn standardize(
        &self,
        mut table: Table,
    ) -> Result<(Table, Option<StandardizationReport>), PipelineError> {
        info!("Standardizing data (mean=0, std=1)");
        let columns = table.numeric_column_names();
        if columns.is_empty() {
            return Ok((table, None));
        }

        let mut means = Vec::new();
        let mut scales = Vec::new();
        for name in &columns {
            let Some(column) = table.column(name) else {
                continue;
            };
            let observed = column.observed_numbers();
            let center = mean(&observed);
            let scale = match std_dev(&observed, 0) {
                Some(s) if s != 0.0 => s,
                _ => 1.0,
            };
            let offset = center.unwrap_or(0.0);
            let scaled = map_numeric(column, |x| (x - offset) / scale);
            means.push(center);
            scales.push(scale);
            table.replace_column(scaled)?;
        }

        info!(columns = columns.len(), "Standardized numeric columns");
        Ok((
            table,
            Some(StandardizationReport {
                method: "standard_scaler".to_string(),
                columns,
                mean: means,
                scale: scales,
            }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn table() -> Table {
        Table::new(vec![
            Column::numeric("a", vec![Some(2.0), Some(4.0), None, Some(6.0)]),
            Column::numeric("constant", vec![Some(5.0); 4]),
            Column::text("nom", vec![Some("x"); 4]),
        ])
        .unwrap()
    }

    #[test]
    fn test_minmax_maps_extremes_to_range() {
        let (out, report) = Normalizer::default().normalize(table()).unwrap();

        let a = out.column("a").unwrap();
        assert_eq!(a.values()[0], Value::Number(0.0));
        assert_eq!(a.values()[1], Value::Number(0.5));
        assert!(a.values()[2].is_missing());
        assert_eq!(a.values()[3], Value::Number(1.0));
        assert_eq!(out.column("constant").unwrap().observed_numbers(), vec![0.0; 4]);
        assert_eq!(out.column("nom"), table().column("nom"));

        let report = report.unwrap();
        assert_eq!(report.range, Some((0.0, 1.0)));
        assert_eq!(report.data_min, Some(vec![Some(2.0), Some(5.0)]));
        assert_eq!(report.max_abs, None);
    }

    #[test]
    fn test_minmax_is_idempotent() {
        let (once, _) = Normalizer::default().normalize(table()).unwrap();
        let (twice, _) = Normalizer::default().normalize(once.clone()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_custom_range() {
        let (out, _) = Normalizer::default()
            .with_feature_range((-1.0, 1.0))
            .normalize(table())
            .unwrap();
        assert_eq!(
            out.column("a").unwrap().observed_numbers(),
            vec![-1.0, 0.0, 1.0]
        );
    }

    #[test]
    fn test_maxabs() {
        let table = Table::new(vec![
            Column::numeric("a", vec![Some(-4.0), Some(2.0)]),
            Column::numeric("zeros", vec![Some(0.0), Some(0.0)]),
        ])
        .unwrap();
        let (out, report) = Normalizer::new(NormalizationMethod::MaxAbs)
            .normalize(table)
            .unwrap();

        assert_eq!(out.column("a").unwrap().observed_numbers(), vec![-1.0, 0.5]);
        assert_eq!(out.column("zeros").unwrap().observed_numbers(), vec![0.0, 0.0]);
        assert_eq!(report.unwrap().max_abs, Some(vec![Some(4.0), Some(0.0)]));
    }

    #[test]
    fn test_standardize_uses_population_std() {
        let (out, report) = Standardizer.standardize(table()).unwrap();

        let a = out.column("a").unwrap().observed_numbers();
        let sd = (8.0f64 / 3.0).sqrt();
        assert!((a[0] + 2.0 / sd).abs() < 1e-12);
        assert!(a[1].abs() < 1e-12);
        assert_eq!(out.column("constant").unwrap().observed_numbers(), vec![0.0; 4]);

        let report = report.unwrap();
        assert_eq!(report.method, "standard_scaler");
        assert_eq!(report.mean, vec![Some(4.0), Some(5.0)]);
        assert!((report.scale[1] - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_no_numeric_columns() {
        let table = Table::new(vec![Column::text("nom", vec![Some("x")])]).unwrap();
        let (_, report) = Normalizer::default().normalize(table.clone()).unwrap();
        assert!(report.is_none());
        let (_, report) = Standardizer.standardize(table).unwrap();
        assert!(report.is_none());
    }

    #[test]
    fn test_unknown_method() {
        let err = "robust".parse::<NormalizationMethod>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown normalization method: robust");
    }
}
