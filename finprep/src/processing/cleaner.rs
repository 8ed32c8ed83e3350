//! Missing-value handling and outlier removal.

use crate::analysis::descriptive::{mean, mode, quantile_sorted, sorted, value_counts};
use crate::analysis::{OutlierInfo, OutlierMethod};
use crate::core::{Column, ColumnType, Table, Value};
use crate::errors::PipelineError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

/// Donors averaged by the KNN imputer.
pub const KNN_NEIGHBORS: usize = 5;

/// Fill value of the categorical `constant` strategy.
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// How missing values are handled overall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MissingValueStrategy {
    /// Drop sparse columns, then impute the rest.
    #[default]
    Auto,
    /// Drop every row with a missing value.
    Delete,
    /// Impute every column.
    Impute,
}

/// Imputation of numeric columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NumericImputation {
    /// Column mean.
    #[default]
    Mean,
    /// Column median.
    Median,
    /// Mean of the nearest complete-enough rows.
    Knn,
    /// Zero.
    Constant,
}

/// Imputation of non-numeric columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CategoricalImputation {
    /// The most frequent observed value.
    #[default]
    MostFrequent,
    /// The literal `Unknown`.
    Constant,
}

macro_rules! method_names {
    ($ty:ty, $kind:literal, { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $(Self::$variant => write!(f, $name),)+
                }
            }
        }

        impl FromStr for $ty {
            type Err = PipelineError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(Self::$variant),)+
                    other => Err(PipelineError::unknown_method($kind, other)),
                }
            }
        }
    };
}

method_names!(MissingValueStrategy, "missing value", {
    Auto => "auto",
    Delete => "delete",
    Impute => "impute",
});

method_names!(NumericImputation, "numerical imputation", {
    Mean => "mean",
    Median => "median",
    Knn => "knn",
    Constant => "constant",
});

method_names!(CategoricalImputation, "categorical imputation", {
    MostFrequent => "most_frequent",
    Constant => "constant",
});

/// Strategies used by an imputation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImputationStrategy {
    /// Numeric strategy.
    pub numerical: NumericImputation,
    /// Categorical strategy.
    pub categorical: CategoricalImputation,
}

/// What missing-value handling did.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissingValuesHandling {
    /// Columns dropped for exceeding the missing threshold.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deleted_columns: Vec<String>,
    /// Rows dropped by the `delete` strategy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows_deleted: Option<usize>,
    /// Strategies used for imputation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imputation_strategy: Option<ImputationStrategy>,
    /// Columns that had values filled.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imputed_columns: Vec<String>,
    /// Columns with no observed value to impute from.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unimputable_columns: Vec<String>,
}

/// What outlier removal did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierRemoval {
    /// The method whose findings were applied.
    pub method: OutlierMethod,
    /// Rows actually removed.
    pub rows_removed: usize,
    /// Flagged rows per column.
    pub columns: BTreeMap<String, usize>,
}

/// Both halves of a cleaning pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningReport {
    /// Missing-value handling.
    pub missing_values_handling: MissingValuesHandling,
    /// Outlier removal.
    pub outlier_removal: OutlierRemoval,
}

/// Settings of the cleaner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CleanerSettings {
    /// Overall strategy.
    pub strategy: MissingValueStrategy,
    /// Numeric imputation.
    pub numerical: NumericImputation,
    /// Categorical imputation.
    pub categorical: CategoricalImputation,
    /// Missing fraction above which `auto` drops a column.
    pub missing_threshold: f64,
    /// Outlier findings to apply.
    pub outlier_method: OutlierMethod,
}

impl Default for CleanerSettings {
    fn default() -> Self {
        Self {
            strategy: MissingValueStrategy::Auto,
            numerical: NumericImputation::Mean,
            categorical: CategoricalImputation::MostFrequent,
            missing_threshold: 0.5,
            outlier_method: OutlierMethod::Iqr,
        }
    }
}

/// Handles missing values, then removes flagged rows.
#[derive(Debug, Clone, Default)]
pub struct DataCleaner {
    settings: CleanerSettings,
}

impl DataCleaner {
    /// Creates a cleaner.
    #[must_use]
    pub fn new(settings: CleanerSettings) -> Self {
        Self { settings }
    }

    /// Returns the settings.
    #[must_use]
    pub fn settings(&self) -> &CleanerSettings {
        &self.settings
    }

    /// Runs both passes.
    ///
    /// # Errors
    ///
    /// Returns an error if a rebuilt column no longer fits the table.
    pub fn clean(
        &self,
        table: Table,
        outliers: &OutlierInfo,
    ) -> Result<(Table, CleaningReport), PipelineError> {
        let (table, missing_values_handling) = self.handle_missing_values(table)?;
        let (table, outlier_removal) = self.remove_outliers(table, outliers);
        Ok((
            table,
            CleaningReport {
                missing_values_handling,
                outlier_removal,
            },
        ))
    }

    /// Applies the missing-value strategy.
    ///
    /// # Errors
    ///
    /// Returns an error if a rebuilt column no longer fits the table.
    #[allow(clippy::cast_precision_loss)]
    pub fn handle_missing_values(
        &self,
        mut table: Table,
    ) -> Result<(Table, MissingValuesHandling), PipelineError> {
        info!(strategy = %self.settings.strategy, "Handling missing values");
        let mut details = MissingValuesHandling::default();

        match self.settings.strategy {
            MissingValueStrategy::Auto => {
                let rows = table.n_rows();
                if rows > 0 {
                    let sparse: Vec<String> = table
                        .columns()
                        .iter()
                        .filter(|c| {
                            c.missing_count() as f64 / rows as f64 > self.settings.missing_threshold
                        })
                        .map(|c| c.name().to_string())
                        .collect();
                    for name in &sparse {
                        table.drop_column(name)?;
                    }
                    if !sparse.is_empty() {
                        warn!(
                            threshold_percent = self.settings.missing_threshold * 100.0,
                            columns = ?sparse,
                            "Deleted columns above the missing threshold"
                        );
                    }
                    details.deleted_columns = sparse;
                }
                table = self.impute(table, &mut details)?;
            }
            MissingValueStrategy::Delete => {
                let names = table.column_names();
                let keep = table.complete_rows(&names);
                let removed = table.retain_rows(&keep);
                warn!(rows = removed, "Deleted rows with missing values");
                details.rows_deleted = Some(removed);
            }
            MissingValueStrategy::Impute => {
                table = self.impute(table, &mut details)?;
            }
        }

        info!("Missing values handling completed");
        Ok((table, details))
    }

    fn impute(
        &self,
        mut table: Table,
        details: &mut MissingValuesHandling,
    ) -> Result<Table, PipelineError> {
        details.imputation_strategy = Some(ImputationStrategy {
            numerical: self.settings.numerical,
            categorical: self.settings.categorical,
        });

        let numeric = table.numeric_column_names();
        let knn_rows = if self.settings.numerical == NumericImputation::Knn {
            Some(numeric_matrix(&table, &numeric))
        } else {
            None
        };

        let incomplete: Vec<Column> = table
            .columns()
            .iter()
            .filter(|c| c.missing_count() > 0)
            .cloned()
            .collect();

        for column in incomplete {
            let name = column.name().to_string();
            if column.observed().next().is_none() {
                warn!(column = %name, "Column has no observed values to impute from");
                details.unimputable_columns.push(name);
                continue;
            }
            let filled = if column.is_numeric() {
                match &knn_rows {
                    Some(rows) => {
                        let target = numeric.iter().position(|n| *n == name).unwrap_or(0);
                        knn_fill(column, rows, target)
                    }
                    None => fill_numeric(column, self.settings.numerical),
                }
            } else {
                fill_categorical(column, self.settings.categorical)
            };
            table.replace_column(filled)?;
            details.imputed_columns.push(name);
        }

        if !details.imputed_columns.is_empty() {
            info!(
                columns = ?details.imputed_columns,
                numerical = %self.settings.numerical,
                categorical = %self.settings.categorical,
                "Imputed missing values"
            );
        }
        Ok(table)
    }

    /// Drops the rows flagged by the configured method in any column.
    #[must_use]
    pub fn remove_outliers(
        &self,
        mut table: Table,
        outliers: &OutlierInfo,
    ) -> (Table, OutlierRemoval) {
        let method = self.settings.outlier_method;
        info!(%method, "Removing outliers");

        let mut flagged = HashSet::new();
        let mut columns = BTreeMap::new();
        for (column, findings) in outliers {
            if let Some(finding) = findings.get(&method) {
                flagged.extend(finding.outlier_indices.iter().copied());
                if !finding.outlier_indices.is_empty() {
                    columns.insert(column.clone(), finding.outlier_indices.len());
                }
            }
        }

        let rows_removed = if flagged.is_empty() {
            info!("No outliers to remove");
            0
        } else {
            let removed = table.drop_rows_by_label(&flagged);
            warn!(rows = removed, "Removed outliers");
            for (column, count) in &columns {
                warn!(column = %column, count, "Outliers flagged in column");
            }
            removed
        };

        (
            table,
            OutlierRemoval {
                method,
                rows_removed,
                columns,
            },
        )
    }
}

fn fill_numeric(column: Column, strategy: NumericImputation) -> Column {
    let observed = column.observed_numbers();
    let fill = match strategy {
        NumericImputation::Mean | NumericImputation::Knn => mean(&observed),
        NumericImputation::Median => quantile_sorted(&sorted(&observed), 0.5),
        NumericImputation::Constant => Some(0.0),
    }
    .unwrap_or(0.0);
    let values = column
        .values()
        .iter()
        .map(|v| if v.is_missing() { Value::number(fill) } else { v.clone() })
        .collect();
    column.with_values(ColumnType::Numeric, values)
}

fn fill_categorical(column: Column, strategy: CategoricalImputation) -> Column {
    let fill = match strategy {
        CategoricalImputation::MostFrequent => mode(&value_counts(column.values()))
            .and_then(|key| column.observed().find(|v| v.to_string() == key).cloned()),
        CategoricalImputation::Constant => Some(Value::text(UNKNOWN_CATEGORY)),
    }
    .unwrap_or_else(|| Value::text(UNKNOWN_CATEGORY));

    let name = column.name().to_string();
    let values: Vec<Value> = column
        .values()
        .iter()
        .map(|v| if v.is_missing() { fill.clone() } else { v.clone() })
        .collect();
    Column::from_values(name, values)
}

fn numeric_matrix(table: &Table, numeric: &[String]) -> Vec<Vec<Option<f64>>> {
    let columns: Vec<&Column> = numeric.iter().filter_map(|n| table.column(n)).collect();
    (0..table.n_rows())
        .map(|row| columns.iter().map(|c| c.values()[row].as_f64()).collect())
        .collect()
}

/// Euclidean distance over coordinates present in both rows, scaled up by the
/// share of coordinates that were skipped.
#[allow(clippy::cast_precision_loss)]
fn nan_euclidean(a: &[Option<f64>], b: &[Option<f64>]) -> Option<f64> {
    let shared: Vec<f64> = a
        .iter()
        .zip(b)
        .filter_map(|(x, y)| Some((x.as_ref()? - y.as_ref()?).powi(2)))
        .collect();
    if shared.is_empty() {
        return None;
    }
    let weight = a.len() as f64 / shared.len() as f64;
    Some((weight * shared.iter().sum::<f64>()).sqrt())
}

fn knn_fill(column: Column, rows: &[Vec<Option<f64>>], target: usize) -> Column {
    let fallback = mean(&column.observed_numbers()).unwrap_or(0.0);
    let values = column
        .values()
        .iter()
        .enumerate()
        .map(|(position, v)| {
            if !v.is_missing() {
                return v.clone();
            }
            let mut donors: Vec<(f64, f64)> = rows
                .iter()
                .enumerate()
                .filter(|(other, _)| *other != position)
                .filter_map(|(_, row)| {
                    let value = row.get(target).copied().flatten()?;
                    nan_euclidean(&rows[position], row).map(|d| (d, value))
                })
                .collect();
            donors.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
            let nearest: Vec<f64> = donors.iter().take(KNN_NEIGHBORS).map(|(_, v)| *v).collect();
            Value::number(mean(&nearest).unwrap_or(fallback))
        })
        .collect();
    column.with_values(ColumnType::Numeric, values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::OutlierFinding;
    use pretty_assertions::assert_eq;

    fn sparse_table() -> Table {
        Table::new(vec![
            Column::numeric("revenu", vec![Some(1000.0), None, Some(3000.0), Some(2000.0)]),
            Column::numeric("score", vec![None, None, None, Some(1.0)]),
            Column::text("ville", vec![Some("Lyon"), None, Some("Nice"), Some("Lyon")]),
        ])
        .unwrap()
    }

    fn settings(strategy: MissingValueStrategy) -> CleanerSettings {
        CleanerSettings {
            strategy,
            ..CleanerSettings::default()
        }
    }

    #[test]
    fn test_auto_drops_sparse_then_imputes() {
        let cleaner = DataCleaner::default();
        let (table, details) = cleaner.handle_missing_values(sparse_table()).unwrap();

        assert_eq!(details.deleted_columns, vec!["score".to_string()]);
        assert_eq!(table.column_names(), vec!["revenu", "ville"]);
        assert_eq!(table.missing_cells(), 0);
        assert_eq!(
            table.column("revenu").unwrap().values()[1],
            Value::Number(2000.0)
        );
        assert_eq!(table.column("ville").unwrap().values()[1], Value::text("Lyon"));
        assert_eq!(details.imputed_columns, vec!["revenu", "ville"]);
    }

    #[test]
    fn test_delete_drops_incomplete_rows() {
        let cleaner = DataCleaner::new(settings(MissingValueStrategy::Delete));
        let (table, details) = cleaner.handle_missing_values(sparse_table()).unwrap();

        assert_eq!(details.rows_deleted, Some(3));
        assert_eq!(table.labels(), &[3]);
    }

    #[test]
    fn test_impute_median_and_constant() {
        let cleaner = DataCleaner::new(CleanerSettings {
            strategy: MissingValueStrategy::Impute,
            numerical: NumericImputation::Median,
            categorical: CategoricalImputation::Constant,
            ..CleanerSettings::default()
        });
        let (table, _) = cleaner.handle_missing_values(sparse_table()).unwrap();

        assert_eq!(table.column("revenu").unwrap().values()[1], Value::Number(2000.0));
        assert_eq!(table.column("score").unwrap().observed_numbers(), vec![1.0; 4]);
        assert_eq!(
            table.column("ville").unwrap().values()[1],
            Value::text(UNKNOWN_CATEGORY)
        );
    }

    #[test]
    fn test_most_frequent_ties_pick_smallest() {
        let column = Column::text("c", vec![Some("b"), Some("a"), None]);
        let filled = fill_categorical(column, CategoricalImputation::MostFrequent);
        assert_eq!(filled.values()[2], Value::text("a"));
    }

    #[test]
    fn test_all_missing_column_is_unimputable() {
        let table = Table::new(vec![
            Column::numeric("vide", vec![None, None]),
            Column::numeric("x", vec![Some(1.0), None]),
        ])
        .unwrap();
        let cleaner = DataCleaner::new(settings(MissingValueStrategy::Impute));
        let (table, details) = cleaner.handle_missing_values(table).unwrap();

        assert_eq!(details.unimputable_columns, vec!["vide".to_string()]);
        assert_eq!(table.column("vide").unwrap().missing_count(), 2);
        assert_eq!(table.column("x").unwrap().missing_count(), 0);
    }

    #[test]
    fn test_knn_uses_nearest_rows() {
        let table = Table::new(vec![
            Column::numeric(
                "a",
                vec![Some(1.0), Some(1.1), Some(10.0), Some(1.05), Some(9.0)],
            ),
            Column::numeric(
                "b",
                vec![Some(5.0), Some(7.0), Some(100.0), None, Some(90.0)],
            ),
        ])
        .unwrap();
        let column = table.column("b").unwrap().clone();
        let rows = numeric_matrix(&table, &table.numeric_column_names());

        // All four donors are averaged when fewer than five exist.
        let filled = knn_fill(column, &rows, 1);
        let expected = (5.0 + 7.0 + 100.0 + 90.0) / 4.0;
        assert!((filled.values()[3].as_f64().unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_nan_euclidean_weights_missing_coordinates() {
        let d = nan_euclidean(&[Some(0.0), None], &[Some(3.0), Some(1.0)]).unwrap();
        assert!((d - (2.0f64 * 9.0).sqrt()).abs() < 1e-12);
        assert!(nan_euclidean(&[None], &[Some(1.0)]).is_none());
    }

    #[test]
    fn test_remove_outliers_unions_labels_for_method() {
        let mut table = Table::new(vec![
            Column::numeric("a", vec![Some(1.0); 6]),
            Column::numeric("b", vec![Some(2.0); 6]),
        ])
        .unwrap();
        table.retain_rows(&[false, true, true, true, true, true]);

        let finding = |indices: Vec<usize>| OutlierFinding {
            lower_bound: None,
            upper_bound: None,
            threshold: None,
            contamination: None,
            outlier_count: indices.len(),
            outlier_percentage: 0.0,
            outlier_indices: indices,
        };
        let mut info = OutlierInfo::new();
        info.insert(
            "a".to_string(),
            BTreeMap::from([
                (OutlierMethod::Iqr, finding(vec![0, 2])),
                (OutlierMethod::Zscore, finding(vec![5])),
            ]),
        );
        info.insert(
            "b".to_string(),
            BTreeMap::from([(OutlierMethod::Iqr, finding(vec![2, 4]))]),
        );

        let (table, removal) = DataCleaner::default().remove_outliers(table, &info);

        assert_eq!(table.labels(), &[1, 3, 5]);
        assert_eq!(removal.rows_removed, 2);
        assert_eq!(removal.columns.get("a"), Some(&2));
        assert_eq!(removal.columns.get("b"), Some(&2));
    }

    #[test]
    fn test_method_names_parse() {
        assert_eq!("knn".parse::<NumericImputation>().unwrap(), NumericImputation::Knn);
        assert_eq!(
            "most_frequent".parse::<CategoricalImputation>().unwrap(),
            CategoricalImputation::MostFrequent
        );
        assert!("drop".parse::<MissingValueStrategy>().is_err());
        assert_eq!(MissingValueStrategy::Impute.to_string(), "impute");
    }
}
