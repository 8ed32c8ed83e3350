//! Cell values and column types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// Floating point numbers.
    Numeric,
    /// `true` / `false` flags.
    Boolean,
    /// Free text or categorical labels.
    Text,
    /// Calendar dates.
    Date,
}

impl Default for ColumnType {
    fn default() -> Self {
        Self::Numeric
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric => write!(f, "numeric"),
            Self::Boolean => write!(f, "boolean"),
            Self::Text => write!(f, "text"),
            Self::Date => write!(f, "date"),
        }
    }
}

/// A single cell.
///
/// `Number` never holds NaN; use [`Value::number`] to build numeric cells
/// so that NaN collapses to `Missing`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// No value.
    Missing,
    /// A finite or infinite float.
    Number(f64),
    /// A boolean flag.
    Bool(bool),
    /// A text value.
    Text(String),
    /// A calendar date.
    Date(NaiveDate),
}

impl Default for Value {
    fn default() -> Self {
        Self::Missing
    }
}

impl Value {
    /// Creates a numeric cell, mapping NaN to `Missing`.
    #[must_use]
    pub fn number(value: f64) -> Self {
        if value.is_nan() {
            Self::Missing
        } else {
            Self::Number(value)
        }
    }

    /// Creates a text cell.
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Returns true if the cell holds no value.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// Returns the numeric content, if any.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the text content, if any.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the natural type of this cell, or `None` when missing.
    #[must_use]
    pub fn column_type(&self) -> Option<ColumnType> {
        match self {
            Self::Missing => None,
            Self::Number(_) => Some(ColumnType::Numeric),
            Self::Bool(_) => Some(ColumnType::Boolean),
            Self::Text(_) => Some(ColumnType::Text),
            Self::Date(_) => Some(ColumnType::Date),
        }
    }

    /// Parses a raw text cell into the most specific value it represents.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if is_missing_token(trimmed) {
            return Self::Missing;
        }
        if let Ok(v) = trimmed.parse::<f64>() {
            return Self::number(v);
        }
        if trimmed.eq_ignore_ascii_case("true") {
            return Self::Bool(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return Self::Bool(false);
        }
        if let Ok(d) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            return Self::Date(d);
        }
        Self::Text(raw.to_string())
    }

    /// Converts a JSON scalar into a cell.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Missing,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => n.as_f64().map_or(Self::Missing, Self::number),
            serde_json::Value::String(s) => Self::Text(s.clone()),
            other => Self::Text(other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => Ok(()),
            Self::Number(v) => write!(f, "{v}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

/// Tokens read as a missing cell.
pub(crate) fn is_missing_token(raw: &str) -> bool {
    raw.is_empty()
        || raw.eq_ignore_ascii_case("na")
        || raw.eq_ignore_ascii_case("nan")
        || raw.eq_ignore_ascii_case("null")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_nan_is_missing() {
        assert!(Value::number(f64::NAN).is_missing());
        assert_eq!(Value::number(1.5), Value::Number(1.5));
    }

    #[test]
    fn test_parse_scalars() {
        assert_eq!(Value::parse("42"), Value::Number(42.0));
        assert_eq!(Value::parse(" 3.5 "), Value::Number(3.5));
        assert_eq!(Value::parse("TRUE"), Value::Bool(true));
        assert_eq!(Value::parse(""), Value::Missing);
        assert_eq!(Value::parse("NaN"), Value::Missing);
        assert_eq!(
            Value::parse("2023-04-01"),
            Value::Date(NaiveDate::from_ymd_opt(2023, 4, 1).unwrap())
        );
        assert_eq!(Value::parse("Dupont"), Value::text("Dupont"));
    }

    #[test]
    fn test_from_json() {
        assert_eq!(Value::from_json(&serde_json::json!(null)), Value::Missing);
        assert_eq!(Value::from_json(&serde_json::json!(2500)), Value::Number(2500.0));
        assert_eq!(Value::from_json(&serde_json::json!("x")), Value::text("x"));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Number(5000.0).to_string(), "5000");
        assert_eq!(Value::Number(0.25).to_string(), "0.25");
        assert_eq!(Value::Missing.to_string(), "");
    }

    #[test]
    fn test_column_type_serialize() {
        let json = serde_json::to_string(&ColumnType::Numeric).unwrap();
        assert_eq!(json, r#""numeric""#);
        assert_eq!(ColumnType::Text.to_string(), "text");
    }
}
