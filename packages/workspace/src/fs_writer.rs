//! # Filesystem Write Applier
//!
//! Applies a batch of diffs under a project root as one unit:
//!
//! 1. Every path must stay inside the root
//! 2. Every file must still hold the content its diff was computed from
//! 3. All new contents are staged next to their targets
//! 4. Staged files are renamed over the targets only once all stages exist
//!
//! A failure before step 4 leaves every target untouched. A failed rename in
//! step 4 restores the targets already renamed from their checked originals.

use crate::errors::{AdapterError, AdapterResult};
use async_trait::async_trait;
use paperclip_common::{resolve_within, FileSystem};
use paperclip_editor::{CodeDiff, CodeWriteError, CodeWriteResult, WriteApplier};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

const STAGE_SUFFIX: &str = "pc-write";

pub struct FsWriteApplier {
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
}

struct StagedWrite {
    stage: PathBuf,
    target: PathBuf,
    /// Target contents before the batch; `None` when the file is new
    previous: Option<String>,
}

impl FsWriteApplier {
    pub fn new(root: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            root: root.into(),
            fs,
        }
    }

    fn stage_path(target: &Path) -> PathBuf {
        let name = target
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        target.with_file_name(format!(".{}.{}", name, STAGE_SUFFIX))
    }

    fn read_current(&self, target: &Path) -> AdapterResult<Option<String>> {
        if !self.fs.exists(target) {
            return Ok(None);
        }
        self.fs
            .read_to_string(target)
            .map(Some)
            .map_err(|e| AdapterError::io(target, e))
    }

    fn discard(&self, staged: &[StagedWrite]) {
        for write in staged {
            if let Err(e) = self.fs.remove_file(&write.stage) {
                warn!("failed to remove staged file {}: {}", write.stage.display(), e);
            }
        }
    }

    /// Put committed targets back the way the batch found them
    fn restore(&self, committed: &[StagedWrite]) {
        for write in committed.iter().rev() {
            let result = match &write.previous {
                Some(previous) => self.fs.write(&write.target, previous),
                None => self.fs.remove_file(&write.target),
            };
            if let Err(e) = result {
                error!("failed to restore {}: {}", write.target.display(), e);
            }
        }
    }

    fn stage_all(&self, diffs: &[CodeDiff]) -> AdapterResult<Option<Vec<StagedWrite>>> {
        let mut checked = Vec::with_capacity(diffs.len());
        for diff in diffs {
            let target = resolve_within(&self.root, Path::new(&diff.path))?;
            let previous = self.read_current(&target)?;
            if previous.as_deref().unwrap_or_default() != diff.original {
                warn!(path = %diff.path, "file changed since the diff was computed");
                return Ok(None);
            }
            checked.push((target, previous));
        }

        let mut staged = Vec::with_capacity(diffs.len());
        for (diff, (target, previous)) in diffs.iter().zip(checked) {
            let stage = Self::stage_path(&target);
            if let Err(e) = self.fs.write(&stage, &diff.generated) {
                self.discard(&staged);
                return Err(AdapterError::io(stage, e));
            }
            staged.push(StagedWrite {
                stage,
                target,
                previous,
            });
        }
        Ok(Some(staged))
    }

    fn commit(&self, staged: Vec<StagedWrite>) -> AdapterResult<()> {
        for (index, write) in staged.iter().enumerate() {
            if let Err(e) = self.fs.rename(&write.stage, &write.target) {
                let (committed, rest) = staged.split_at(index);
                self.restore(committed);
                self.discard(rest);
                return Err(AdapterError::io(&write.target, e));
            }
        }
        Ok(())
    }

    fn apply(&self, diffs: &[CodeDiff]) -> AdapterResult<bool> {
        let Some(staged) = self.stage_all(diffs)? else {
            return Ok(false);
        };
        self.commit(staged)?;
        Ok(true)
    }
}

#[async_trait]
impl WriteApplier for FsWriteApplier {
    async fn apply_diffs(&self, diffs: &[CodeDiff]) -> CodeWriteResult<bool> {
        if diffs.is_empty() {
            return Ok(false);
        }
        match self.apply(diffs) {
            Ok(applied) => {
                if applied {
                    info!(files = diffs.len(), "wrote code diffs");
                }
                Ok(applied)
            }
            Err(AdapterError::Common(e)) => Err(CodeWriteError::Write(e.to_string())),
            Err(e) => {
                error!("failed to write code diffs: {}", e);
                Ok(false)
            }
        }
    }
}
