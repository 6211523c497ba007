use lpwrite_api::{ParseError, ResolveError, WriteError};

use crate::writer::WriteSummary;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Invalid or conflicting settings, detected before any I/O.
    #[error("{0}")]
    Config(String),

    #[error("failed to retrieve buckets: {0}")]
    Resolution(#[from] ResolveError),

    #[error("bucket {0:?} was not found")]
    BucketNotFound(String),

    #[error("bucket with id {0:?} does not exist")]
    BucketIdNotFound(String),

    #[error("failed to read input: {source}")]
    SourceRead {
        accepted: WriteSummary,
        source: std::io::Error,
    },

    #[error("failed to write data: {source}")]
    Write {
        accepted: WriteSummary,
        source: WriteError,
    },

    #[error("pipeline task: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl PipelineError {
    /// Batches the store had already accepted when the run failed.
    /// `None` for failures that happen before streaming starts.
    pub fn accepted(&self) -> Option<WriteSummary> {
        match self {
            PipelineError::SourceRead { accepted, .. } | PipelineError::Write { accepted, .. } => {
                Some(*accepted)
            }
            _ => None,
        }
    }
}

impl From<ParseError> for PipelineError {
    fn from(e: ParseError) -> Self {
        PipelineError::Config(e.to_string())
    }
}
