//! Error types for the code writer

use crate::actions::ActionKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodeWriteError {
    #[error("{0} is not supported by the code writer")]
    Unsupported(ActionKind),

    #[error("No code diffs returned for {requests} request(s)")]
    EmptyDiff { requests: usize },

    #[error("Diff application was rejected")]
    ApplyRejected,

    #[error("Diff service error: {0}")]
    DiffService(String),

    #[error("Write error: {0}")]
    Write(String),

    #[error("Key cleanup error: {0}")]
    Cleanup(String),

    #[error("Source navigation error: {0}")]
    Navigation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Code writer has shut down")]
    Closed,
}

pub type CodeWriteResult<T> = Result<T, CodeWriteError>;
