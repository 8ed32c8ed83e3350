//! Compliance allow-list of columns.

use crate::core::Table;
use crate::errors::PipelineError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use tracing::{error, info, warn};

/// Unique-to-rows ratio above which identity columns look un-anonymized.
pub const UNIQUENESS_LIMIT: f64 = 0.9;

/// Policy of one allow-listed column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnPolicy {
    /// Column name.
    pub name: &'static str,
    /// Whether the run fails without it.
    pub required: bool,
    /// Whether the values must be anonymized upstream.
    pub anonymization_required: bool,
    /// Why the column is kept.
    pub rationale: &'static str,
    /// What the column is used for downstream.
    pub final_use: &'static str,
}

/// The columns that survive filtering, in output order.
pub const ALLOWED_COLUMNS: [ColumnPolicy; 5] = [
    ColumnPolicy {
        name: "nom",
        required: true,
        anonymization_required: true,
        rationale: "Required but must be anonymized",
        final_use: "Anonymized identifier",
    },
    ColumnPolicy {
        name: "prenom",
        required: true,
        anonymization_required: true,
        rationale: "Required but must be anonymized",
        final_use: "Anonymized identifier",
    },
    ColumnPolicy {
        name: "revenu_estime_mois",
        required: true,
        anonymization_required: false,
        rationale: "Required, essential for financial analysis",
        final_use: "Financial capacity assessment",
    },
    ColumnPolicy {
        name: "loyer_mensuel",
        required: true,
        anonymization_required: false,
        rationale: "Required, essential for financial analysis",
        final_use: "Housing cost analysis",
    },
    ColumnPolicy {
        name: "montant_pret",
        required: true,
        anonymization_required: false,
        rationale: "Required, essential for financial analysis",
        final_use: "Loan amount evaluation",
    },
];

const DISCRIMINATORY: [&str; 3] = ["age", "taille", "poids"];
const SENSITIVE_FINANCIAL: [&str; 3] = ["historique_credits", "risque_personnel", "score_credit"];

/// Why a column was removed.
#[must_use]
pub fn removal_reason(column: &str) -> &'static str {
    if DISCRIMINATORY.contains(&column) {
        "Discriminatory personal data - removed for ethical compliance"
    } else if SENSITIVE_FINANCIAL.contains(&column) {
        "Sensitive financial data - removed for data minimization"
    } else {
        "Non-essential data - removed for compliance"
    }
}

/// Outcome of the identity-column uniqueness heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnonymizationCheck {
    /// Identity values repeat enough to look redacted.
    #[serde(rename = "ANONYMIZATION_LIKELY_OK")]
    LikelyOk,
    /// Identity values are nearly unique.
    #[serde(rename = "ANONYMIZATION_SUSPECT - high uniqueness ratio")]
    Suspect,
    /// No identity columns or no rows to judge.
    #[serde(rename = "ANONYMIZATION_NOT_APPLICABLE")]
    NotApplicable,
}

impl fmt::Display for AnonymizationCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LikelyOk => write!(f, "ANONYMIZATION_LIKELY_OK"),
            Self::Suspect => write!(f, "ANONYMIZATION_SUSPECT - high uniqueness ratio"),
            Self::NotApplicable => write!(f, "ANONYMIZATION_NOT_APPLICABLE"),
        }
    }
}

/// Applies the uniqueness heuristic to `nom` and `prenom`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn verify_anonymization(table: &Table) -> AnonymizationCheck {
    let (Some(nom), Some(prenom)) = (table.column("nom"), table.column("prenom")) else {
        return AnonymizationCheck::NotApplicable;
    };
    let rows = table.n_rows();
    if rows == 0 {
        return AnonymizationCheck::NotApplicable;
    }
    let ratio = |column: &crate::core::Column| {
        let distinct: HashSet<String> = column.observed().map(ToString::to_string).collect();
        distinct.len() as f64 / rows as f64
    };
    if ratio(nom) > UNIQUENESS_LIMIT || ratio(prenom) > UNIQUENESS_LIMIT {
        AnonymizationCheck::Suspect
    } else {
        AnonymizationCheck::LikelyOk
    }
}

/// What filtering kept and dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevanceReport {
    /// Columns before filtering.
    pub original_columns: Vec<String>,
    /// Columns after filtering.
    pub final_columns: Vec<String>,
    /// Columns dropped, in input order.
    pub removed_columns: Vec<String>,
    /// Reason per dropped column.
    pub removal_reasons: BTreeMap<String, String>,
    /// Result of the uniqueness heuristic.
    pub anonymization_verified: AnonymizationCheck,
}

/// Keeps only the allow-listed columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelevanceFilter;

impl RelevanceFilter {
    /// Creates the filter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// The allow-list.
    #[must_use]
    pub fn policy(&self) -> &'static [ColumnPolicy] {
        &ALLOWED_COLUMNS
    }

    /// Filters the table down to the allow-list.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::MissingRequiredColumns`] if a required column
    /// is absent.
    pub fn filter(&self, table: &Table) -> Result<(Table, RelevanceReport), PipelineError> {
        info!(
            columns = ?ALLOWED_COLUMNS.iter().map(|p| p.name).collect::<Vec<_>>(),
            "Filtering to allow-listed columns"
        );

        let missing: Vec<String> = ALLOWED_COLUMNS
            .iter()
            .filter(|p| p.required && !table.has_column(p.name))
            .map(|p| p.name.to_string())
            .collect();
        if !missing.is_empty() {
            error!(columns = ?missing, "Required columns missing");
            return Err(PipelineError::MissingRequiredColumns { columns: missing });
        }

        let original_columns = table.column_names();
        let removed_columns: Vec<String> = original_columns
            .iter()
            .filter(|c| !ALLOWED_COLUMNS.iter().any(|p| p.name == c.as_str()))
            .cloned()
            .collect();

        if !removed_columns.is_empty() {
            warn!(count = removed_columns.len(), "Removing columns for compliance");
        }
        let removal_reasons: BTreeMap<String, String> = removed_columns
            .iter()
            .map(|c| {
                let reason = removal_reason(c);
                info!(column = %c, reason, "Removing column");
                (c.clone(), reason.to_string())
            })
            .collect();

        let names: Vec<&str> = ALLOWED_COLUMNS
            .iter()
            .map(|p| p.name)
            .filter(|n| table.has_column(n))
            .collect();
        let filtered = table.select(&names)?;
        let anonymization_verified = verify_anonymization(&filtered);
        if anonymization_verified == AnonymizationCheck::Suspect {
            warn!(status = %anonymization_verified, "Identity columns may not be anonymized");
        }

        let report = RelevanceReport {
            original_columns,
            final_columns: filtered.column_names(),
            removed_columns,
            removal_reasons,
            anonymization_verified,
        };
        info!(
            original = report.original_columns.len(),
            kept = report.final_columns.len(),
            removed = report.removed_columns.len(),
            status = %anonymization_verified,
            "Relevance filtering completed"
        );
        Ok((filtered, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Column;
    use pretty_assertions::assert_eq;

    fn profiles(nom: Vec<Option<&str>>) -> Table {
        let n = nom.len();
        Table::new(vec![
            Column::numeric("age", vec![Some(30.0); n]),
            Column::text("nom", nom),
            Column::text("prenom", vec![Some("x"); n]),
            Column::numeric("montant_pret", vec![Some(1.0); n]),
            Column::numeric("loyer_mensuel", vec![Some(1.0); n]),
            Column::numeric("revenu_estime_mois", vec![Some(1.0); n]),
            Column::numeric("score_credit", vec![Some(1.0); n]),
            Column::text("ville", vec![Some("Lyon"); n]),
        ])
        .unwrap()
    }

    #[test]
    fn test_keeps_exactly_allowed_columns_in_order() {
        let table = profiles(vec![Some("a"), Some("a"), Some("b")]);
        let (filtered, report) = RelevanceFilter::new().filter(&table).unwrap();

        assert_eq!(
            filtered.column_names(),
            vec!["nom", "prenom", "revenu_estime_mois", "loyer_mensuel", "montant_pret"]
        );
        assert_eq!(report.removed_columns, vec!["age", "score_credit", "ville"]);
        assert_eq!(
            report.removal_reasons["age"],
            "Discriminatory personal data - removed for ethical compliance"
        );
        assert_eq!(
            report.removal_reasons["score_credit"],
            "Sensitive financial data - removed for data minimization"
        );
        assert_eq!(
            report.removal_reasons["ville"],
            "Non-essential data - removed for compliance"
        );
        assert_eq!(report.anonymization_verified, AnonymizationCheck::LikelyOk);
    }

    #[test]
    fn test_missing_required_column_is_fatal() {
        let table = profiles(vec![Some("a")]);
        let mut table = table;
        table.drop_column("loyer_mensuel").unwrap();

        let err = RelevanceFilter::new().filter(&table).unwrap_err();
        match err {
            PipelineError::MissingRequiredColumns { columns } => {
                assert_eq!(columns, vec!["loyer_mensuel".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unique_identities_are_suspect() {
        let names: Vec<Option<&str>> = vec![Some("a"), Some("b"), Some("c"), Some("d")];
        let (_, report) = RelevanceFilter::new().filter(&profiles(names)).unwrap();
        assert_eq!(report.anonymization_verified, AnonymizationCheck::Suspect);
    }

    #[test]
    fn test_empty_table_is_not_applicable() {
        let (_, report) = RelevanceFilter::new().filter(&profiles(Vec::new())).unwrap();
        assert_eq!(report.anonymization_verified, AnonymizationCheck::NotApplicable);
    }

    #[test]
    fn test_check_serializes_as_status_string() {
        let json = serde_json::to_value(AnonymizationCheck::Suspect).unwrap();
        assert_eq!(json, serde_json::json!("ANONYMIZATION_SUSPECT - high uniqueness ratio"));
    }
}
