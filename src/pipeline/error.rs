use std::path::PathBuf;
use thiserror::Error;

use crate::pipeline::report::RunReport;
use crate::store::StoreError;

/// Errors that end a run, or reject its source before it starts.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("CSV file not found: {path}")]
    SourceNotFound { path: PathBuf },

    #[error("CSV file could not be read: {path}: {source}")]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Write failed at batch index {index}: {cause}")]
    WriteFailed {
        index: usize,
        #[source]
        cause: StoreError,
    },

    #[error("Run interrupted after {records_read} records")]
    Interrupted { records_read: usize },

    #[error("All {records_read} records failed, nothing was imported")]
    AllRecordsFailed { records_read: usize },

    #[error("Invalid upload: {message}")]
    InvalidUpload { message: String },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// A run that ended in the `Failed` state, along with everything it had
/// counted up to that point.
#[derive(Error, Debug)]
#[error("{error}")]
pub struct RunFailure {
    #[source]
    pub error: PipelineError,
    pub report: RunReport,
}

impl RunFailure {
    pub fn new(error: PipelineError, report: RunReport) -> Self {
        Self { error, report }
    }
}
