use serde::Serialize;
use thiserror::Error;

use crate::db::DatabaseError;
use crate::error::{ErrorKind, ProcessError, StorageError};

use super::context::PipelineStage;

/// Fatal failure of a run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Filename '{0}' has no usable characters")]
    InvalidFilename(String),

    #[error("Malformed input while {stage}: {source}")]
    MalformedInput {
        stage: PipelineStage,
        #[source]
        source: ProcessError,
    },

    #[error("Storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error("Persistence failed: {0}")]
    Persistence(#[from] DatabaseError),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::InvalidFilename(_) | PipelineError::MalformedInput { .. } => {
                ErrorKind::MalformedInput
            }
            PipelineError::Storage(_) => ErrorKind::StorageFailure,
            PipelineError::Persistence(_) => ErrorKind::PersistenceFailure,
        }
    }

    /// Stage the run was in when it failed.
    pub fn stage(&self) -> PipelineStage {
        match self {
            PipelineError::InvalidFilename(_) => PipelineStage::Received,
            PipelineError::MalformedInput { stage, .. } => *stage,
            PipelineError::Storage(_) => PipelineStage::Uploading,
            PipelineError::Persistence(_) => PipelineStage::Persisting,
        }
    }
}

/// Non-fatal problem recorded on a completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineWarning {
    RecognitionFailed {
        page_index: usize,
        image_index: usize,
        kind: ErrorKind,
        error: String,
    },
}

impl std::fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineWarning::RecognitionFailed {
                page_index,
                image_index,
                error,
                ..
            } => write!(
                f,
                "page {} image {}: {}",
                page_index + 1,
                image_index + 1,
                error
            ),
        }
    }
}
