//! Read-only analyses of a table.
//!
//! - Descriptive statistics and missing-value analysis
//! - Outlier detection (IQR, z-score, isolation forest) and distribution profiles
//! - The D'Agostino-Pearson normality test
//! - Final quality scoring

pub mod descriptive;
pub mod isolation;
pub mod normality;
pub mod outliers;
pub mod quality;

pub use descriptive::{analyze_missing, describe, DescriptiveStats, MissingAnalysis};
pub use outliers::{
    DetectorSettings, OutlierDetector, OutlierFinding, OutlierInfo, OutlierMethod, OutlierReport,
};
pub use quality::{assess, QualityMetrics};
