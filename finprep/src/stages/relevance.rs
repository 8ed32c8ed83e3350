//! Compliance allow-list stage.

use super::Stage;
use crate::context::RunContext;
use crate::core::Table;
use crate::errors::PipelineError;
use crate::io::{sibling_path, write_csv};
use crate::processing::RelevanceFilter;
use async_trait::async_trait;
use serde_json::json;
use std::path::Path;
use tracing::info;

/// Stage name.
pub const NAME: &str = "relevance_filter";

/// Context attribute holding the filter report.
pub const REPORT_ATTRIBUTE: &str = "relevance_filter_report";

/// Keeps only the allow-listed columns.
///
/// When the run has an input file, the table as it stood before filtering is
/// written beside it as `<stem>_pre_filter<ext>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelevanceFilterStage {
    filter: RelevanceFilter,
}

impl RelevanceFilterStage {
    /// Creates the stage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn save_pre_filter(table: &Table, ctx: &mut RunContext) -> Result<(), PipelineError> {
        let Some(input) = ctx.input_file().map(Path::to_path_buf) else {
            return Ok(());
        };
        let path = sibling_path(&input, "_pre_filter");
        write_csv(table, &path)?;
        info!(path = %path.display(), "Pre-filter data saved");

        let (rows, cols) = table.shape();
        ctx.set_attribute("pre_filter_file", path.display().to_string());
        ctx.set_attribute("pre_filter_columns", table.column_names());
        ctx.set_attribute("pre_filter_shape", json!([rows, cols]));
        Ok(())
    }
}

#[async_trait]
impl Stage for RelevanceFilterStage {
    fn name(&self) -> &str {
        NAME
    }

    async fn process(&self, table: Table, ctx: &mut RunContext) -> Result<Table, PipelineError> {
        Self::save_pre_filter(&table, ctx)?;
        let (filtered, report) = self.filter.filter(&table)?;
        ctx.set_attribute(REPORT_ATTRIBUTE, serde_json::to_value(&report)?);
        Ok(filtered)
    }
}
