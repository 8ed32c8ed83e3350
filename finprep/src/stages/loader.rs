//! First stage: brings records into the pipeline.

use super::Stage;
use crate::config::LoaderConfig;
use crate::context::RunContext;
use crate::core::{StageKind, Table};
use crate::errors::PipelineError;
use crate::io::{sibling_path, CsvFileSource, RecordSource};
use async_trait::async_trait;
use serde_json::json;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Stage name.
pub const NAME: &str = "data_loading";

/// Loads the table.
///
/// Precedence: a non-empty table handed in, then the context's input file,
/// then the remote source, else [`PipelineError::NoDataProvider`].
#[derive(Clone)]
pub struct LoadStage {
    config: LoaderConfig,
    remote: Option<Arc<dyn RecordSource>>,
}

impl std::fmt::Debug for LoadStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadStage")
            .field("config", &self.config)
            .field("remote", &self.remote.as_ref().map(|r| r.describe()))
            .finish()
    }
}

impl LoadStage {
    /// Creates the stage. With the `http` feature a configured `api_url`
    /// becomes the remote source.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: LoaderConfig) -> Result<Self, PipelineError> {
        #[cfg(feature = "http")]
        let remote = match &config.api_url {
            Some(url) => Some(Arc::new(crate::io::HttpRecordSource::new(
                url.clone(),
                config.timeout(),
            )?) as Arc<dyn RecordSource>),
            None => None,
        };
        #[cfg(not(feature = "http"))]
        let remote = {
            if let Some(url) = &config.api_url {
                warn!(url = %url, "HTTP support is disabled; api_url ignored");
            }
            None
        };
        Ok(Self { config, remote })
    }

    /// Replaces the remote source.
    #[must_use]
    pub fn with_remote_source(mut self, source: Arc<dyn RecordSource>) -> Self {
        self.remote = Some(source);
        self
    }

    async fn load_file(&self, path: &Path) -> Result<Table, PipelineError> {
        info!(path = %path.display(), "Loading data from file");
        let table = CsvFileSource::new(path).fetch().await?;
        info!(shape = ?table.shape(), "Loaded data");

        if self.config.create_backup {
            let backup = sibling_path(path, "_backup");
            fs::copy(path, &backup).map_err(|e| PipelineError::file_io(&backup, e))?;
            info!(path = %backup.display(), "Backup created");
        }
        Ok(table)
    }

    async fn load_remote(&self, source: &dyn RecordSource) -> Result<Table, PipelineError> {
        let origin = source.describe();
        info!(origin = %origin, "Loading data from remote source");
        let table = tokio::time::timeout(self.config.timeout(), source.fetch())
            .await
            .map_err(|_| PipelineError::AcquisitionTimeout {
                origin: origin.clone(),
                timeout_seconds: self.config.timeout_seconds,
            })??;
        if table.n_cols() == 0 {
            warn!(origin = %origin, "Remote source returned no records");
        }
        Ok(table)
    }
}

#[async_trait]
impl Stage for LoadStage {
    fn name(&self) -> &str {
        NAME
    }

    fn kind(&self) -> StageKind {
        StageKind::Acquire
    }

    async fn process(&self, table: Table, ctx: &mut RunContext) -> Result<Table, PipelineError> {
        let loaded = if !table.is_empty() && table.n_cols() > 0 {
            info!("Using pre-loaded data");
            table
        } else if let Some(path) = ctx.input_file().map(Path::to_path_buf) {
            self.load_file(&path).await?
        } else if let Some(remote) = &self.remote {
            self.load_remote(remote.as_ref()).await?
        } else {
            return Err(PipelineError::NoDataProvider);
        };

        let (rows, cols) = loaded.shape();
        ctx.add_statistic("initial_shape", json!([rows, cols]));
        ctx.add_statistic("initial_columns", loaded.column_names());
        Ok(loaded)
    }
}
