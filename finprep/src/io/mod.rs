//! File, HTTP and report I/O used by the load and save stages.

pub mod csv;
pub mod records;
pub mod report;
pub mod source;

pub use self::csv::{parse_csv, read_csv, to_csv_string, write_csv};
pub use records::table_from_json;
pub use report::{RunReport, DEFAULT_REPORT_PATH};
#[cfg(feature = "http")]
pub use source::HttpRecordSource;
pub use source::{CsvFileSource, RecordSource};

use std::path::{Path, PathBuf};

/// `<dir>/<stem><suffix><ext>` next to `path`, e.g. `data_backup.csv`.
#[must_use]
pub fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}{suffix}.{}", ext.to_string_lossy()),
        None => format!("{stem}{suffix}"),
    };
    path.with_file_name(name)
}
