use std::path::PathBuf;

use thiserror::Error;

use crate::client::ClientError;
use crate::record::RecordKey;
use crate::store::StoreError;

/// Why one record failed a stage. The record keeps its flags and stays
/// eligible for the next run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The service answered but knows no such case.
    #[error("case lookup failed: {0}")]
    Lookup(#[source] ClientError),

    #[error("remote request failed: {0}")]
    Client(#[from] ClientError),

    #[error("docket for case {external_case_id} lists no documents")]
    MissingDocument { external_case_id: String },

    #[error("record {0} disappeared from the store")]
    NotFound(RecordKey),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for PipelineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(key) => PipelineError::NotFound(key),
            other => PipelineError::Store(other),
        }
    }
}

impl PipelineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }
}
