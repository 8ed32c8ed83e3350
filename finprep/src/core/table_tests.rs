//! Tests for the columnar table.

use super::*;
use crate::errors::TableError;
use pretty_assertions::assert_eq;
use std::collections::HashSet;

fn sample() -> Table {
    Table::new(vec![
        Column::text("nom", vec![Some("Martin"), Some("Durand"), None, Some("Petit")]),
        Column::numeric("loyer_mensuel", vec![Some(800.0), None, Some(650.0), Some(900.0)]),
        Column::numeric("age", vec![Some(34.0), Some(41.0), Some(29.0), None]),
    ])
    .unwrap()
}

#[test]
fn test_new_assigns_positional_labels() {
    let table = sample();
    assert_eq!(table.shape(), (4, 3));
    assert_eq!(table.labels(), &[0, 1, 2, 3]);
}

#[test]
fn test_new_rejects_unequal_lengths() {
    let err = Table::new(vec![
        Column::numeric("a", vec![Some(1.0), Some(2.0)]),
        Column::numeric("b", vec![Some(1.0)]),
    ])
    .unwrap_err();

    assert_eq!(
        err,
        TableError::LengthMismatch {
            column: "b".to_string(),
            expected: 2,
            actual: 1,
        }
    );
}

#[test]
fn test_new_rejects_duplicate_names() {
    let err = Table::new(vec![
        Column::numeric("a", vec![Some(1.0)]),
        Column::numeric("a", vec![Some(2.0)]),
    ])
    .unwrap_err();
    assert_eq!(err, TableError::DuplicateColumn("a".to_string()));
}

#[test]
fn test_missing_cells() {
    let table = sample();
    assert_eq!(table.missing_cells(), 3);
    assert_eq!(table.total_cells(), 12);
}

#[test]
fn test_drop_column_removes_it_entirely() {
    let mut table = sample();
    let removed = table.drop_column("age").unwrap();

    assert_eq!(removed.name(), "age");
    assert_eq!(table.column_names(), vec!["nom", "loyer_mensuel"]);
    assert_eq!(table.shape(), (4, 2));
    assert!(table.drop_column("age").is_err());
}

#[test]
fn test_retain_rows_keeps_labels() {
    let mut table = sample();
    let removed = table.retain_rows(&[true, false, true, true]);

    assert_eq!(removed, 1);
    assert_eq!(table.labels(), &[0, 2, 3]);
    assert_eq!(
        table.column("loyer_mensuel").unwrap().observed_numbers(),
        vec![800.0, 650.0, 900.0]
    );
}

#[test]
fn test_drop_rows_by_label_ignores_absent_labels() {
    let mut table = sample();
    table.retain_rows(&[true, false, true, true]);

    let labels: HashSet<usize> = [1, 3, 99].into_iter().collect();
    let removed = table.drop_rows_by_label(&labels);

    assert_eq!(removed, 1);
    assert_eq!(table.labels(), &[0, 2]);
}

#[test]
fn test_select_orders_columns() {
    let table = sample();
    let selected = table.select(&["age", "nom"]).unwrap();

    assert_eq!(selected.column_names(), vec!["age", "nom"]);
    assert!(table.select(&["missing"]).is_err());
}

#[test]
fn test_column_type_listing() {
    let table = sample();
    assert_eq!(table.numeric_column_names(), vec!["loyer_mensuel", "age"]);
}

#[test]
fn test_complete_rows() {
    let table = sample();
    let names = vec!["loyer_mensuel".to_string(), "age".to_string()];
    assert_eq!(table.complete_rows(&names), vec![true, false, true, false]);
}

#[test]
fn test_replace_column_checks_length() {
    let mut table = sample();
    let short = Column::numeric("age", vec![Some(1.0)]);
    assert!(table.replace_column(short).is_err());

    let zeros = Column::numeric("age", vec![Some(0.0); 4]);
    table.replace_column(zeros).unwrap();
    assert_eq!(table.column("age").unwrap().observed_numbers(), vec![0.0; 4]);
}

#[test]
fn test_infer_column_types() {
    let raw = |cells: &[&str]| cells.iter().map(|s| (*s).to_string()).collect::<Vec<_>>();

    assert_eq!(Column::infer("a", &raw(&["1", "", "2.5"])).kind(), ColumnType::Numeric);
    assert_eq!(Column::infer("b", &raw(&["true", "False"])).kind(), ColumnType::Boolean);
    assert_eq!(
        Column::infer("c", &raw(&["2024-01-02", "NA"])).kind(),
        ColumnType::Date
    );
    assert_eq!(Column::infer("d", &raw(&["1", "x"])).kind(), ColumnType::Text);
    assert_eq!(Column::infer("e", &raw(&["", "null"])).kind(), ColumnType::Numeric);

    let mixed = Column::infer("f", &raw(&["12", "abc", ""]));
    assert_eq!(mixed.values()[0], Value::text("12"));
    assert!(mixed.values()[2].is_missing());
}

#[test]
fn test_empty_table() {
    let table = Table::empty();
    assert_eq!(table.shape(), (0, 0));
    assert!(table.is_empty());
    assert_eq!(table.total_cells(), 0);
}
