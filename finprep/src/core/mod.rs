//! Core domain model types.
//!
//! - Cell values and column types
//! - The columnar table with row labels
//! - Stage status and kind enums

mod status;
mod table;
#[cfg(test)]
mod table_tests;
mod value;

pub use status::{StageKind, StageStatus};
pub use table::{Column, Table};
pub use value::{ColumnType, Value};
