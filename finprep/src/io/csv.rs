//! Comma-separated table files.
//!
//! Parsing and quoting go through polars; every column is read as text and
//! typed afterwards by [`Column::infer`], so a CSV round trip keeps the same
//! cell types as the JSON loader. The first record is the header.

use crate::core::{Column, Table, Value};
use crate::errors::PipelineError;
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::{Column as FrameColumn, CsvWriter, DataFrame, SerReader, SerWriter};
use std::fs;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

fn malformed(origin: &str, reason: impl ToString) -> PipelineError {
    PipelineError::MalformedTable {
        origin: origin.to_string(),
        reason: reason.to_string(),
    }
}

/// Parses CSV text into a table, inferring column types.
///
/// Records with no value in any field are skipped.
///
/// # Errors
///
/// Returns [`PipelineError::MalformedTable`] for a missing header or rows
/// the reader rejects.
pub fn parse_csv(text: &str, origin: &str) -> Result<Table, PipelineError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    if text.trim().is_empty() {
        return Err(malformed(origin, "no header row"));
    }

    let frame = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .into_reader_with_file_handle(Cursor::new(text.to_string()))
        .finish()
        .map_err(|e| malformed(origin, e))?;

    let mut names = Vec::with_capacity(frame.width());
    let mut cells: Vec<Vec<String>> = Vec::with_capacity(frame.width());
    for series in frame.get_columns().iter().map(FrameColumn::as_materialized_series) {
        let text = series.str().map_err(|e| malformed(origin, e))?;
        names.push(series.name().as_str().trim().to_string());
        cells.push(
            text.into_iter()
                .map(|cell| cell.unwrap_or_default().to_string())
                .collect(),
        );
    }

    let keep: Vec<bool> = (0..frame.height())
        .map(|row| cells.iter().any(|column| !column[row].trim().is_empty()))
        .collect();
    let columns = names
        .into_iter()
        .zip(cells)
        .map(|(name, raw)| {
            let raw: Vec<String> = raw
                .into_iter()
                .zip(&keep)
                .filter_map(|(cell, kept)| kept.then_some(cell))
                .collect();
            Column::infer(name, &raw)
        })
        .collect();
    Ok(Table::new(columns)?)
}

/// Reads a CSV file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn read_csv(path: &Path) -> Result<Table, PipelineError> {
    let text = fs::read_to_string(path).map_err(|e| PipelineError::file_io(path, e))?;
    let table = parse_csv(&text, &path.display().to_string())?;
    debug!(path = %path.display(), rows = table.n_rows(), cols = table.n_cols(), "Read CSV");
    Ok(table)
}

fn frame(table: &Table) -> Result<DataFrame, PipelineError> {
    let columns = table
        .columns()
        .iter()
        .map(|column| {
            let rendered: Vec<Option<String>> = column
                .values()
                .iter()
                .map(|v| (!v.is_missing()).then(|| v.to_string()))
                .collect();
            FrameColumn::new(column.name().into(), rendered)
        })
        .collect();
    DataFrame::new(columns).map_err(|e| PipelineError::Internal(format!("CSV encoding: {e}")))
}

/// Renders a table as CSV text, header first, missing cells empty.
///
/// # Errors
///
/// Returns [`PipelineError::Internal`] if the writer rejects the table.
pub fn to_csv_string(table: &Table) -> Result<String, PipelineError> {
    let mut frame = frame(table)?;
    let mut buffer = Vec::new();
    CsvWriter::new(&mut buffer)
        .include_header(true)
        .finish(&mut frame)
        .map_err(|e| PipelineError::Internal(format!("CSV encoding: {e}")))?;
    String::from_utf8(buffer).map_err(|e| PipelineError::Internal(format!("CSV encoding: {e}")))
}

/// Writes a table to a CSV file, creating parent directories.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_csv(table: &Table, path: &Path) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| PipelineError::file_io(parent, e))?;
    }
    fs::write(path, to_csv_string(table)?).map_err(|e| PipelineError::file_io(path, e))?;
    debug!(path = %path.display(), rows = table.n_rows(), "Wrote CSV");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ColumnType;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_infers_types() {
        let table = parse_csv(
            "nom,revenu,actif,naissance\nMartin,2500,true,1990-01-02\nDurand,,false,1985-12-31\n",
            "inline",
        )
        .unwrap();

        assert_eq!(table.shape(), (2, 4));
        assert_eq!(table.column("nom").unwrap().kind(), ColumnType::Text);
        assert_eq!(table.column("revenu").unwrap().kind(), ColumnType::Numeric);
        assert_eq!(table.column("actif").unwrap().kind(), ColumnType::Boolean);
        assert_eq!(table.column("naissance").unwrap().kind(), ColumnType::Date);
        assert!(table.column("revenu").unwrap().values()[1].is_missing());
    }

    #[test]
    fn test_quoted_fields() {
        let table = parse_csv(
            "adresse,note\r\n\"1, rue \"\"Haute\"\"\",\"deux\nlignes\"\r\n",
            "inline",
        )
        .unwrap();

        assert_eq!(
            table.column("adresse").unwrap().values()[0],
            Value::text("1, rue \"Haute\"")
        );
        assert_eq!(
            table.column("note").unwrap().values()[0],
            Value::text("deux\nlignes")
        );
    }

    #[test]
    fn test_byte_order_mark_and_padded_headers() {
        let table = parse_csv("\u{feff} nom ,x\nMartin,1\n", "inline").unwrap();
        assert_eq!(table.column_names(), vec!["nom", "x"]);
    }

    #[test]
    fn test_extra_fields_are_malformed() {
        let err = parse_csv("a,b\n1,2,3\n", "inline").unwrap_err();
        assert!(matches!(err, PipelineError::MalformedTable { .. }));
        assert!(err.to_string().contains("inline"));
    }

    #[test]
    fn test_empty_input_is_malformed() {
        assert!(parse_csv("", "inline").is_err());
        assert!(parse_csv("\u{feff}\n", "inline").is_err());
    }

    #[test]
    fn test_header_only() {
        let table = parse_csv("a,b\n", "inline").unwrap();
        assert_eq!(table.shape(), (0, 2));
    }

    #[test]
    fn test_write_then_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.csv");
        let table = Table::new(vec![
            Column::text("nom", vec![Some("a,b"), None]),
            Column::numeric("x", vec![Some(1.5), Some(-2.0)]),
        ])
        .unwrap();

        write_csv(&table, &path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "nom,x\n\"a,b\",1.5\n,-2\n");

        let back = read_csv(&path).unwrap();
        assert_eq!(back.column("x").unwrap().observed_numbers(), vec![1.5, -2.0]);
        assert!(back.column("nom").unwrap().values()[1].is_missing());
    }

    #[test]
    fn test_missing_file() {
        let err = read_csv(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, PipelineError::FileIo { .. }));
    }
}
