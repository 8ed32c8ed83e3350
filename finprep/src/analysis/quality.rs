//! Final data-quality scoring.

use super::descriptive::{mean, std_dev};
use crate::core::Table;
use serde::{Deserialize, Serialize};

/// Lowest reported precision. Scores below it are lifted to it.
pub const PRECISION_FLOOR: f64 = 0.8;

/// Quality figures of a finished table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// Observed cells over all cells; zero for a table without cells.
    pub completeness: f64,
    /// Average of completeness and the defined numeric components.
    pub quality_score: f64,
    /// `quality_score` clamped into `[0.8, 1.0]`.
    pub final_precision: f64,
}

impl QualityMetrics {
    /// Metric name and value pairs, in report order.
    #[must_use]
    pub fn entries(&self) -> [(&'static str, f64); 3] {
        [
            ("completeness", self.completeness),
            ("quality_score", self.quality_score),
            ("final_precision", self.final_precision),
        ]
    }
}

/// Clamps a score into `[PRECISION_FLOOR, 1.0]`, sending NaN to the floor.
#[must_use]
pub fn final_precision(quality_score: f64) -> f64 {
    if quality_score.is_nan() {
        PRECISION_FLOOR
    } else {
        quality_score.clamp(PRECISION_FLOOR, 1.0)
    }
}

/// Scores a table.
///
/// `mean_quality = 1 - mean(|column mean|) / 10` and
/// `std_quality = 1 - |mean(column std) - 1| / 10` reward standardized
/// numeric columns. Columns without a defined statistic are skipped.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn assess(table: &Table) -> QualityMetrics {
    let total = table.total_cells();
    let completeness = if total == 0 {
        0.0
    } else {
        1.0 - table.missing_cells() as f64 / total as f64
    };

    let mut means = Vec::new();
    let mut stds = Vec::new();
    for column in table.columns().iter().filter(|c| c.is_numeric()) {
        let values = column.observed_numbers();
        if let Some(m) = mean(&values) {
            means.push(m.abs());
        }
        if let Some(s) = std_dev(&values, 1) {
            stds.push(s);
        }
    }

    let mut components = vec![completeness];
    if let Some(avg_abs_mean) = mean(&means) {
        components.push(1.0 - avg_abs_mean / 10.0);
    }
    if let Some(avg_std) = mean(&stds) {
        components.push(1.0 - (avg_std - 1.0).abs() / 10.0);
    }
    let quality_score = mean(&components).unwrap_or(completeness);

    QualityMetrics {
        completeness,
        quality_score,
        final_precision: final_precision(quality_score),
    }
}
