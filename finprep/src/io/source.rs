//! Where the load stage gets its records from.

use super::csv::read_csv;
use crate::core::Table;
use crate::errors::PipelineError;
use async_trait::async_trait;
use std::path::PathBuf;

/// A source of raw records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Human-readable origin, used in logs and errors.
    fn describe(&self) -> String;

    /// Fetches every record as one table.
    ///
    /// # Errors
    ///
    /// Returns an I/O or acquisition error; all are fatal to the run.
    async fn fetch(&self) -> Result<Table, PipelineError>;
}

/// Reads a local CSV file.
#[derive(Debug, Clone)]
pub struct CsvFileSource {
    path: PathBuf,
}

impl CsvFileSource {
    /// Creates a source for a file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RecordSource for CsvFileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self) -> Result<Table, PipelineError> {
        read_csv(&self.path)
    }
}

#[cfg(feature = "http")]
pub use http::HttpRecordSource;

#[cfg(feature = "http")]
mod http {
    use super::RecordSource;
    use crate::core::Table;
    use crate::errors::PipelineError;
    use crate::io::records::table_from_json;
    use async_trait::async_trait;
    use reqwest::Client;
    use std::time::Duration;
    use tracing::{debug, error};

    /// Fetches a JSON array of records with an HTTP GET.
    #[derive(Debug, Clone)]
    pub struct HttpRecordSource {
        url: String,
        timeout: Duration,
        client: Client,
    }

    impl HttpRecordSource {
        /// Creates a source with a request deadline.
        ///
        /// # Errors
        ///
        /// Returns an error if the HTTP client cannot be built.
        pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, PipelineError> {
            let url = url.into();
            let client = Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| PipelineError::Acquisition {
                    origin: url.clone(),
                    reason: format!("cannot build HTTP client: {e}"),
                })?;
            Ok(Self {
                url,
                timeout,
                client,
            })
        }

        fn transport_error(&self, e: &reqwest::Error) -> PipelineError {
            if e.is_timeout() {
                error!(url = %self.url, timeout = ?self.timeout, "Record request timed out");
                PipelineError::AcquisitionTimeout {
                    origin: self.url.clone(),
                    timeout_seconds: self.timeout.as_secs_f64(),
                }
            } else {
                error!(url = %self.url, error = %e, "Record request failed");
                PipelineError::Acquisition {
                    origin: self.url.clone(),
                    reason: e.to_string(),
                }
            }
        }
    }

    #[async_trait]
    impl RecordSource for HttpRecordSource {
        fn describe(&self) -> String {
            self.url.clone()
        }

        async fn fetch(&self) -> Result<Table, PipelineError> {
            debug!(url = %self.url, "Fetching records");
            let response = self
                .client
                .get(&self.url)
                .send()
                .await
                .map_err(|e| self.transport_error(&e))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                error!(
                    url = %self.url,
                    status = status.as_u16(),
                    "Record endpoint returned an error"
                );
                return Err(PipelineError::HttpStatus {
                    url: self.url.clone(),
                    status: status.as_u16(),
                    body,
                });
            }

            let payload: serde_json::Value = response
                .json()
                .await
                .map_err(|e| self.transport_error(&e))?;
            table_from_json(&payload, &self.url)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_describe_is_url() {
            let source = HttpRecordSource::new("http://localhost:9/records", Duration::from_secs(1))
                .unwrap();
            assert_eq!(source.describe(), "http://localhost:9/records");
        }

        #[tokio::test]
        async fn test_unreachable_host_is_acquisition_error() {
            let source = HttpRecordSource::new("http://127.0.0.1:9/records", Duration::from_secs(2))
                .unwrap();
            let err = source.fetch().await.unwrap_err();
            assert!(matches!(
                err,
                PipelineError::Acquisition { .. } | PipelineError::AcquisitionTimeout { .. }
            ));
        }
    }
}
