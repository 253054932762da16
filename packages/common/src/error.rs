use std::path::PathBuf;
use thiserror::Error;

/// Common error type shared by the paperclip crates
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("Path escapes project root: {0}")]
    OutsideRoot(PathBuf),
}

/// Common Result type alias
pub type CommonResult<T> = Result<T, CommonError>;
