//! Traits at the edges of the code writer.
//!
//! Diff computation, file writes, key cleanup and source navigation all
//! live outside this crate. Hosts implement these traits; the write cycle
//! treats an `Err` exactly like the failure value of the call.

use crate::anchor::Anchor;
use crate::code::{CodeDiff, CodeDiffRequest};
use crate::errors::CodeWriteResult;
use async_trait::async_trait;

/// Computes file diffs for aggregated requests
#[async_trait]
pub trait DiffRequester: Send + Sync {
    /// Return diffs for every anchor that could be diffed.
    ///
    /// Empty input yields empty output. An empty output for a non-empty
    /// input means nothing could be diffed.
    async fn request_diffs(&self, requests: &[CodeDiffRequest]) -> CodeWriteResult<Vec<CodeDiff>>;
}

/// Writes computed diffs to source files as one batch
#[async_trait]
pub trait WriteApplier: Send + Sync {
    async fn apply_diffs(&self, diffs: &[CodeDiff]) -> CodeWriteResult<bool>;
}

/// Compacts transient generation keys out of modified files
#[async_trait]
pub trait KeyCleaner: Send + Sync {
    async fn clean_keys(&self, files: &[String]) -> CodeWriteResult<()>;
}

/// Opens and reads the source behind an anchor
#[async_trait]
pub trait SourceNavigator: Send + Sync {
    async fn open_source(&self, anchor: &Anchor) -> CodeWriteResult<()>;

    async fn code_block(&self, anchor: &Anchor) -> CodeWriteResult<Option<String>>;
}
