//! Scopes searched by the generic context lookup.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A region of the run context that a key can resolve in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextScope {
    /// Per-stage findings.
    Results,
    /// Flat run metrics.
    Statistics,
    /// The stage option tree.
    Config,
    /// Fields set directly on the context, then the attribute store.
    Attributes,
}

impl ContextScope {
    /// The order in which scopes are searched. The first hit wins.
    pub const LOOKUP_ORDER: [Self; 4] = [
        Self::Results,
        Self::Statistics,
        Self::Config,
        Self::Attributes,
    ];
}

impl fmt::Display for ContextScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Results => write!(f, "results"),
            Self::Statistics => write!(f, "statistics"),
            Self::Config => write!(f, "config"),
            Self::Attributes => write!(f, "attributes"),
        }
    }
}

/// Resolves a dot-separated path inside a JSON tree. `null` counts as absent.
pub(crate) fn resolve_path<'a>(
    root: &'a serde_json::Value,
    path: &str,
) -> Option<&'a serde_json::Value> {
    let found = path.split('.').try_fold(root, |current, part| {
        current.as_object().and_then(|obj| obj.get(part))
    })?;
    (!found.is_null()).then_some(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_order_is_fixed() {
        assert_eq!(
            ContextScope::LOOKUP_ORDER,
            [
                ContextScope::Results,
                ContextScope::Statistics,
                ContextScope::Config,
                ContextScope::Attributes,
            ]
        );
    }

    #[test]
    fn test_resolve_path() {
        let tree = json!({"cleaning": {"missing_threshold": 0.5, "unset": null}});
        assert_eq!(
            resolve_path(&tree, "cleaning.missing_threshold"),
            Some(&json!(0.5))
        );
        assert!(resolve_path(&tree, "cleaning.unset").is_none());
        assert!(resolve_path(&tree, "cleaning.missing_threshold.deeper").is_none());
    }
}
