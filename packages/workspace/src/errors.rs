use paperclip_common::CommonError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdapterError {
    #[error(transparent)]
    Common(#[from] CommonError),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Command `{program}` failed ({status}): {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("Invalid diff service output: {0}")]
    InvalidOutput(#[from] serde_json::Error),

    #[error("Invalid key attribute pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl AdapterError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AdapterError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type AdapterResult<T> = Result<T, AdapterError>;
