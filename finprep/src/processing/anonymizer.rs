//! Sensitive column detection and redaction.

use crate::core::{Column, ColumnType, Table, Value};
use crate::errors::PipelineError;
use md5::{Digest, Md5};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use tracing::{debug, info};

/// Column-name fragments that mark a column as sensitive.
pub const SENSITIVE_KEYWORDS: [&str; 20] = [
    "name",
    "email",
    "phone",
    "address",
    "ssn",
    "id",
    "password",
    "credit",
    "card",
    "birth",
    "social",
    "security",
    "nom",
    "prenom",
    "telephone",
    "adresse",
    "motdepasse",
    "carte",
    "cb",
    "ccv",
];

/// Number of observed values sampled per text column for content detection.
pub const CONTENT_SAMPLE_SIZE: usize = 100;

/// Replacement for masked text cells.
pub const MASK_TOKEN: &str = "***MASKED***";

const CARD_NUMBER: &str = r"\d{4}-\d{4}-\d{4}-\d{4}";

static CONTENT_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("email", r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Z|a-z]{2,}\b"),
        ("phone", r"(\+?\d{1,3}[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}"),
        (
            "telephone",
            r"(\+?\d{1,3}[-.\s]?)?\(?\d{2,4}\)?[-.\s]?\d{2,4}[-.\s]?\d{4,6}",
        ),
        ("ssn", r"\d{3}-\d{2}-\d{4}"),
        ("credit_card", CARD_NUMBER),
        ("carte", CARD_NUMBER),
        ("cb", CARD_NUMBER),
        ("ccv", r"\b\d{3,4}\b"),
        ("password", r".{8,}"),
    ]
    .into_iter()
    .filter_map(|(name, pattern)| {
        Regex::new(&format!("^(?:{pattern})"))
            .ok()
            .map(|re| (name, re))
    })
    .collect()
});

/// How sensitive columns are redacted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnonymizationStrategy {
    /// Replace each value with a deterministic digest.
    #[default]
    Hash,
    /// Replace text with a fixed token and other types with zero.
    Mask,
    /// Drop the column.
    Delete,
}

impl fmt::Display for AnonymizationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hash => write!(f, "hash"),
            Self::Mask => write!(f, "mask"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

impl FromStr for AnonymizationStrategy {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hash" => Ok(Self::Hash),
            "mask" => Ok(Self::Mask),
            "delete" => Ok(Self::Delete),
            other => Err(PipelineError::unknown_method("anonymization", other)),
        }
    }
}

/// Why a column was marked sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Detection {
    /// Named by the caller.
    Explicit,
    /// The column name contains a keyword.
    NameKeyword {
        /// The first keyword found.
        keyword: String,
    },
    /// A sampled value matched a content pattern.
    DataPattern {
        /// The first pattern that matched.
        pattern: String,
    },
}

/// What redaction did to one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnRedaction {
    /// `hashed`, `masked` or `deleted`.
    pub action: String,
    /// The column type before redaction.
    pub original_dtype: ColumnType,
    /// The strategy applied.
    pub strategy: AnonymizationStrategy,
    /// First cell before redaction.
    pub original_sample: String,
    /// First cell after redaction.
    pub anonymized_sample: String,
}

/// The audit trail of one anonymization pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnonymizationReport {
    /// Detected columns in detection order.
    pub sensitive_columns_detected: Vec<String>,
    /// Always `automatic`.
    pub detection_method: String,
    /// Reason per detected column.
    pub detections: BTreeMap<String, Detection>,
    /// Redaction details per column.
    pub anonymization_details: BTreeMap<String, ColumnRedaction>,
}

/// Detects and redacts sensitive columns.
#[derive(Debug, Clone, Default)]
pub struct Anonymizer {
    strategy: AnonymizationStrategy,
    explicit_columns: Vec<String>,
}

impl Anonymizer {
    /// Creates an anonymizer with a strategy.
    #[must_use]
    pub fn new(strategy: AnonymizationStrategy) -> Self {
        Self {
            strategy,
            explicit_columns: Vec::new(),
        }
    }

    /// Adds caller-supplied sensitive column names.
    #[must_use]
    pub fn with_explicit_columns(mut self, columns: Vec<String>) -> Self {
        self.explicit_columns = columns;
        self
    }

    /// Returns the strategy.
    #[must_use]
    pub fn strategy(&self) -> AnonymizationStrategy {
        self.strategy
    }

    /// Finds sensitive columns, in detection order, with the reason for each.
    #[must_use]
    pub fn detect(&self, table: &Table) -> Vec<(String, Detection)> {
        let mut found: Vec<(String, Detection)> = self
            .explicit_columns
            .iter()
            .filter(|c| table.has_column(c))
            .map(|c| (c.clone(), Detection::Explicit))
            .collect();
        if !found.is_empty() {
            let columns: Vec<&String> = found.iter().map(|(c, _)| c).collect();
            info!(?columns, "Explicit sensitive columns");
        }

        for column in table.columns() {
            if found.iter().any(|(c, _)| c == column.name()) {
                continue;
            }
            if let Some(keyword) = name_keyword(column.name()) {
                info!(column = %column.name(), keyword, "Sensitive column detected by name");
                found.push((
                    column.name().to_string(),
                    Detection::NameKeyword {
                        keyword: keyword.to_string(),
                    },
                ));
            } else if let Some(pattern) = content_pattern(column) {
                info!(column = %column.name(), pattern, "Sensitive column detected by content");
                found.push((
                    column.name().to_string(),
                    Detection::DataPattern {
                        pattern: pattern.to_string(),
                    },
                ));
            }
        }

        info!(count = found.len(), "Sensitive column detection finished");
        found
    }

    /// Detects and redacts. Returns `None` for the report when nothing was sensitive.
    ///
    /// # Errors
    ///
    /// Returns an error if a redacted column cannot be put back into the table.
    pub fn anonymize(
        &self,
        mut table: Table,
    ) -> Result<(Table, Option<AnonymizationReport>), PipelineError> {
        let detected = self.detect(&table);
        if detected.is_empty() {
            info!("No sensitive columns detected");
            return Ok((table, None));
        }

        let mut details = BTreeMap::new();
        for (name, _) in &detected {
            let Some(column) = table.column(name) else {
                continue;
            };
            let original_dtype = column.kind();
            let original_sample = first_sample(column.values());

            let (action, anonymized_sample) = match self.strategy {
                AnonymizationStrategy::Delete => {
                    table.drop_column(name)?;
                    ("deleted", "N/A".to_string())
                }
                AnonymizationStrategy::Hash => {
                    let redacted = hash_column(column.clone());
                    let sample = first_sample(redacted.values());
                    table.replace_column(redacted)?;
                    ("hashed", sample)
                }
                AnonymizationStrategy::Mask => {
                    let redacted = mask_column(column.clone());
                    let sample = first_sample(redacted.values());
                    table.replace_column(redacted)?;
                    ("masked", sample)
                }
            };

            info!(column = %name, action, "Anonymized column");
            debug!(
                column = %name,
                original = %original_sample,
                anonymized = %anonymized_sample,
                "Redaction sample"
            );
            details.insert(
                name.clone(),
                ColumnRedaction {
                    action: action.to_string(),
                    original_dtype,
                    strategy: self.strategy,
                    original_sample,
                    anonymized_sample,
                },
            );
        }

        let report = AnonymizationReport {
            sensitive_columns_detected: detected.iter().map(|(c, _)| c.clone()).collect(),
            detection_method: "automatic".to_string(),
            detections: detected.into_iter().collect(),
            anonymization_details: details,
        };
        info!(strategy = %self.strategy, "Anonymization completed");
        Ok((table, Some(report)))
    }
}

/// The first keyword contained in the lowercased column name.
#[must_use]
pub fn name_keyword(column: &str) -> Option<&'static str> {
    let lowered = column.to_lowercase();
    SENSITIVE_KEYWORDS
        .iter()
        .copied()
        .find(|keyword| lowered.contains(keyword))
}

/// The first content pattern matched by any sampled value of a text column.
#[must_use]
pub fn content_pattern(column: &Column) -> Option<&'static str> {
    if column.kind() != ColumnType::Text {
        return None;
    }
    let sample: Vec<String> = column
        .observed()
        .take(CONTENT_SAMPLE_SIZE)
        .map(ToString::to_string)
        .collect();
    CONTENT_PATTERNS
        .iter()
        .find(|(_, re)| sample.iter().any(|v| re.is_match(v)))
        .map(|(name, _)| *name)
}

/// Deterministic digest of a value's string form.
///
/// The first eight bytes of the MD5 digest, read big-endian with the sign bit
/// cleared, rendered in decimal.
#[must_use]
pub fn digest(raw: &str) -> String {
    let hash = Md5::digest(raw.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&hash[..8]);
    (u64::from_be_bytes(prefix) & (u64::MAX >> 1)).to_string()
}

fn hash_column(column: Column) -> Column {
    let values = column
        .values()
        .iter()
        .map(|v| {
            if v.is_missing() {
                Value::Missing
            } else {
                Value::Text(digest(&v.to_string()))
            }
        })
        .collect();
    column.with_values(ColumnType::Text, values)
}

fn mask_column(column: Column) -> Column {
    if column.kind() == ColumnType::Text {
        let values = column
            .values()
            .iter()
            .map(|v| {
                if v.is_missing() {
                    Value::Missing
                } else {
                    Value::text(MASK_TOKEN)
                }
            })
            .collect();
        column.with_values(ColumnType::Text, values)
    } else {
        let values = vec![Value::Number(0.0); column.len()];
        column.with_values(ColumnType::Numeric, values)
    }
}

fn first_sample(values: &[Value]) -> String {
    match values.first() {
        None => "N/A".to_string(),
        Some(Value::Missing) => "nan".to_string(),
        Some(v) => v.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn profiles() -> Table {
        Table::new(vec![
            Column::text("nom", vec![Some("Martin"), Some("Durand"), None]),
            Column::text(
                "contact",
                vec![Some("a.martin@example.com"), Some("x"), Some("y")],
            ),
            Column::text("ville", vec![Some("Lyon"), Some("Lille"), Some("Nice")]),
            Column::numeric("revenu_estime_mois", vec![Some(2500.0), Some(3100.0), None]),
        ])
        .unwrap()
    }

    #[test]
    fn test_detect_by_name_and_content() {
        let detected = Anonymizer::default().detect(&profiles());
        let names: Vec<&str> = detected.iter().map(|(c, _)| c.as_str()).collect();

        assert_eq!(names, vec!["nom", "contact"]);
        assert_eq!(
            detected[0].1,
            Detection::NameKeyword {
                keyword: "nom".to_string()
            }
        );
        assert_eq!(
            detected[1].1,
            Detection::DataPattern {
                pattern: "email".to_string()
            }
        );
    }

    #[test]
    fn test_explicit_columns_come_first() {
        let anonymizer = Anonymizer::default()
            .with_explicit_columns(vec!["ville".to_string(), "absent".to_string()]);
        let detected = anonymizer.detect(&profiles());

        assert_eq!(detected[0], ("ville".to_string(), Detection::Explicit));
        assert_eq!(detected.len(), 3);
    }

    #[test]
    fn test_content_patterns_are_anchored() {
        let column = Column::text("notes", vec![Some("call 555-123-4567")]);
        assert_eq!(content_pattern(&column), Some("password"));

        let short = Column::text("code", vec![Some("ab")]);
        assert_eq!(content_pattern(&short), None);

        let ccv = Column::text("code", vec![Some("123")]);
        assert_eq!(content_pattern(&ccv), Some("ccv"));
    }

    #[test]
    fn test_numeric_columns_skip_content_check() {
        let column = Column::numeric("montant", vec![Some(1234.0)]);
        assert_eq!(content_pattern(&column), None);
    }

    #[test]
    fn test_hash_is_deterministic_and_keeps_shape() {
        let (table, report) = Anonymizer::new(AnonymizationStrategy::Hash)
            .anonymize(profiles())
            .unwrap();

        assert_eq!(table.shape(), (3, 4));
        let nom = table.column("nom").unwrap();
        assert_eq!(nom.values()[0], Value::Text(digest("Martin")));
        assert!(nom.values()[2].is_missing());
        assert!(nom.values()[0].as_str().unwrap().chars().all(|c| c.is_ascii_digit()));
        assert_eq!(digest("Martin"), digest("Martin"));
        assert_ne!(digest("Martin"), digest("Durand"));

        let report = report.unwrap();
        assert_eq!(report.detection_method, "automatic");
        assert_eq!(report.anonymization_details["nom"].action, "hashed");
        assert_eq!(report.anonymization_details["nom"].original_sample, "Martin");
    }

    #[test]
    fn test_mask_strategy() {
        let table = Table::new(vec![
            Column::text("nom", vec![Some("Martin"), None]),
            Column::numeric("card_number", vec![Some(4111.0), Some(4242.0)]),
        ])
        .unwrap();
        let (table, _) = Anonymizer::new(AnonymizationStrategy::Mask)
            .anonymize(table)
            .unwrap();

        let nom = table.column("nom").unwrap();
        assert_eq!(nom.values()[0], Value::text(MASK_TOKEN));
        assert!(nom.values()[1].is_missing());
        assert_eq!(
            table.column("card_number").unwrap().observed_numbers(),
            vec![0.0, 0.0]
        );
    }

    #[test]
    fn test_delete_strategy() {
        let (table, report) = Anonymizer::new(AnonymizationStrategy::Delete)
            .anonymize(profiles())
            .unwrap();

        assert_eq!(table.column_names(), vec!["ville", "revenu_estime_mois"]);
        assert_eq!(report.unwrap().anonymization_details["contact"].action, "deleted");
    }

    #[test]
    fn test_nothing_sensitive() {
        let table = Table::new(vec![Column::numeric("loyer_mensuel", vec![Some(1.0)])]).unwrap();
        let (out, report) = Anonymizer::default().anonymize(table.clone()).unwrap();

        assert!(report.is_none());
        assert_eq!(out, table);
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!(
            "mask".parse::<AnonymizationStrategy>().unwrap(),
            AnonymizationStrategy::Mask
        );
        assert!("scramble".parse::<AnonymizationStrategy>().is_err());
    }
}
