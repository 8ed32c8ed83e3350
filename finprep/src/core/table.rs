//! Typed columnar table with row labels.

use super::value::{is_missing_token, ColumnType, Value};
use crate::errors::TableError;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashSet;

/// A named, typed column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    name: String,
    kind: ColumnType,
    values: Vec<Value>,
}

impl Column {
    /// Creates a column with an explicit type.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ColumnType, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            kind,
            values,
        }
    }

    /// Creates a numeric column; `None` and NaN become missing.
    #[must_use]
    pub fn numeric(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        let values = values
            .into_iter()
            .map(|v| v.map_or(Value::Missing, Value::number))
            .collect();
        Self::new(name, ColumnType::Numeric, values)
    }

    /// Creates a text column; `None` becomes missing.
    #[must_use]
    pub fn text<S: Into<String>>(name: impl Into<String>, values: Vec<Option<S>>) -> Self {
        let values = values
            .into_iter()
            .map(|v| v.map_or(Value::Missing, |s| Value::Text(s.into())))
            .collect();
        Self::new(name, ColumnType::Text, values)
    }

    /// Infers a column from raw text cells.
    ///
    /// A column with no observed values is numeric. A column whose cells do not
    /// all agree on one type is read as text, keeping the raw cell contents.
    #[must_use]
    pub fn infer(name: impl Into<String>, raw: &[String]) -> Self {
        let present: Vec<&str> = raw
            .iter()
            .map(|s| s.trim())
            .filter(|s| !is_missing_token(s))
            .collect();

        let kind = if present.iter().all(|s| s.parse::<f64>().is_ok()) {
            ColumnType::Numeric
        } else if present
            .iter()
            .all(|s| s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("false"))
        {
            ColumnType::Boolean
        } else if present
            .iter()
            .all(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok())
        {
            ColumnType::Date
        } else {
            ColumnType::Text
        };

        let values = raw
            .iter()
            .map(|cell| {
                if is_missing_token(cell.trim()) {
                    Value::Missing
                } else if kind == ColumnType::Text {
                    Value::Text(cell.clone())
                } else {
                    Value::parse(cell)
                }
            })
            .collect();

        Self::new(name, kind, values)
    }

    /// Builds a column from already typed cells, inferring the column type.
    #[must_use]
    pub fn from_values(name: impl Into<String>, values: Vec<Value>) -> Self {
        let mut kinds = values.iter().filter_map(Value::column_type);
        let kind = match kinds.next() {
            None => ColumnType::Numeric,
            Some(first) if kinds.all(|k| k == first) => first,
            Some(_) => ColumnType::Text,
        };

        let values = if kind == ColumnType::Text {
            values
                .into_iter()
                .map(|v| match v {
                    Value::Missing | Value::Text(_) => v,
                    other => Value::Text(other.to_string()),
                })
                .collect()
        } else {
            values
        };

        Self::new(name, kind, values)
    }

    /// Returns the column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the column type.
    #[must_use]
    pub fn kind(&self) -> ColumnType {
        self.kind
    }

    /// Returns the cells.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Returns the number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the column has no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns true for numeric columns.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        self.kind == ColumnType::Numeric
    }

    /// Counts missing cells.
    #[must_use]
    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_missing()).count()
    }

    /// Returns the observed numbers, skipping missing cells.
    #[must_use]
    pub fn observed_numbers(&self) -> Vec<f64> {
        self.values.iter().filter_map(Value::as_f64).collect()
    }

    /// Returns the observed cells, skipping missing ones.
    pub fn observed(&self) -> impl Iterator<Item = &Value> {
        self.values.iter().filter(|v| !v.is_missing())
    }

    /// Replaces the cells and type, keeping the name.
    #[must_use]
    pub fn with_values(self, kind: ColumnType, values: Vec<Value>) -> Self {
        Self {
            name: self.name,
            kind,
            values,
        }
    }

    fn keep_positions(&mut self, keep: &[bool]) {
        let mut flags = keep.iter();
        self.values.retain(|_| flags.next().copied().unwrap_or(false));
    }
}

/// An ordered set of equally long columns plus a row-label index.
///
/// Labels start as `0..n` and survive row removal, so positions recorded
/// by one stage can still be resolved after later deletions.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Table {
    columns: Vec<Column>,
    labels: Vec<usize>,
}

impl Table {
    /// Creates a table from columns.
    ///
    /// # Errors
    ///
    /// Returns an error if column lengths differ or names repeat.
    pub fn new(columns: Vec<Column>) -> Result<Self, TableError> {
        let n_rows = columns.first().map_or(0, Column::len);
        Self::validate(&columns, n_rows)?;
        Ok(Self {
            columns,
            labels: (0..n_rows).collect(),
        })
    }

    /// Creates an empty table.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    fn validate(columns: &[Column], n_rows: usize) -> Result<(), TableError> {
        let mut seen = HashSet::new();
        for column in columns {
            if column.len() != n_rows {
                return Err(TableError::LengthMismatch {
                    column: column.name.clone(),
                    expected: n_rows,
                    actual: column.len(),
                });
            }
            if !seen.insert(column.name.as_str()) {
                return Err(TableError::DuplicateColumn(column.name.clone()));
            }
        }
        Ok(())
    }

    /// Returns `(rows, columns)`.
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows(), self.n_cols())
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.labels.len()
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.n_rows() == 0
    }

    /// Returns the total number of cells.
    #[must_use]
    pub fn total_cells(&self) -> usize {
        self.n_rows() * self.n_cols()
    }

    /// Counts missing cells across all columns.
    #[must_use]
    pub fn missing_cells(&self) -> usize {
        self.columns.iter().map(Column::missing_count).sum()
    }

    /// Returns the row labels.
    #[must_use]
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Returns all columns.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Returns column names in order.
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Returns true if a column exists.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Names of numeric columns, in order.
    #[must_use]
    pub fn numeric_column_names(&self) -> Vec<String> {
        self.names_of(ColumnType::Numeric)
    }

    fn names_of(&self, kind: ColumnType) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.kind == kind)
            .map(|c| c.name.clone())
            .collect()
    }

    /// Replaces a column in place, keeping its position.
    ///
    /// # Errors
    ///
    /// Returns an error if no column has that name or the length differs.
    pub fn replace_column(&mut self, column: Column) -> Result<(), TableError> {
        if column.len() != self.n_rows() {
            return Err(TableError::LengthMismatch {
                column: column.name,
                expected: self.n_rows(),
                actual: column.values.len(),
            });
        }
        let slot = self
            .columns
            .iter_mut()
            .find(|c| c.name == column.name)
            .ok_or_else(|| TableError::ColumnNotFound(column.name.clone()))?;
        *slot = column;
        Ok(())
    }

    /// Removes a column, returning it.
    ///
    /// # Errors
    ///
    /// Returns an error if no column has that name.
    pub fn drop_column(&mut self, name: &str) -> Result<Column, TableError> {
        let position = self
            .columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| TableError::ColumnNotFound(name.to_string()))?;
        Ok(self.columns.remove(position))
    }

    /// Keeps only the named columns, in the given order.
    ///
    /// # Errors
    ///
    /// Returns an error if any name is absent.
    pub fn select(&self, names: &[&str]) -> Result<Self, TableError> {
        let columns = names
            .iter()
            .map(|name| {
                self.column(name)
                    .cloned()
                    .ok_or_else(|| TableError::ColumnNotFound((*name).to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            columns,
            labels: self.labels.clone(),
        })
    }

    /// Keeps the rows whose flag is true. Returns the number removed.
    pub fn retain_rows(&mut self, keep: &[bool]) -> usize {
        let before = self.n_rows();
        for column in &mut self.columns {
            column.keep_positions(keep);
        }
        let mut flags = keep.iter();
        self.labels.retain(|_| flags.next().copied().unwrap_or(false));
        before - self.n_rows()
    }

    /// Drops rows by label. Labels no longer present are ignored.
    pub fn drop_rows_by_label(&mut self, labels: &HashSet<usize>) -> usize {
        let keep: Vec<bool> = self.labels.iter().map(|l| !labels.contains(l)).collect();
        self.retain_rows(&keep)
    }

    /// Returns, per row, whether every listed column is observed.
    #[must_use]
    pub fn complete_rows(&self, names: &[String]) -> Vec<bool> {
        let selected: Vec<&Column> = names.iter().filter_map(|n| self.column(n)).collect();
        (0..self.n_rows())
            .map(|row| selected.iter().all(|c| !c.values[row].is_missing()))
            .collect()
    }
}
