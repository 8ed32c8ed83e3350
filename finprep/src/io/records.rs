//! JSON row objects.

use crate::core::{Column, Table, Value};
use crate::errors::PipelineError;

/// Builds a table from a JSON array of row objects.
///
/// Columns appear in first-seen key order. A key absent from a row is a
/// missing cell there. An empty array gives an empty table.
///
/// # Errors
///
/// Returns [`PipelineError::MalformedTable`] if the payload is not an array
/// of objects.
pub fn table_from_json(payload: &serde_json::Value, origin: &str) -> Result<Table, PipelineError> {
    let malformed = |reason: String| PipelineError::MalformedTable {
        origin: origin.to_string(),
        reason,
    };

    let rows = payload
        .as_array()
        .ok_or_else(|| malformed("expected a JSON array of records".to_string()))?;

    let mut headers: Vec<String> = Vec::new();
    for (position, row) in rows.iter().enumerate() {
        let object = row
            .as_object()
            .ok_or_else(|| malformed(format!("record {position} is not an object")))?;
        for key in object.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }

    let columns = headers
        .iter()
        .map(|name| {
            let values = rows
                .iter()
                .map(|row| row.get(name).map_or(Value::Missing, Value::from_json))
                .collect();
            Column::from_values(name.clone(), values)
        })
        .collect();
    Ok(Table::new(columns)?)
}
