use crate::errors::AdapterError;
use async_trait::async_trait;
use paperclip_common::{resolve_within, FileSystem};
use paperclip_editor::{Anchor, CodeWriteError, CodeWriteResult, Position, SourceNavigator};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Reads anchored source straight from the project files.
///
/// Lines are 1-based and columns 0-based. An anchor with default start and
/// end positions covers the whole file.
pub struct FsSourceNavigator {
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl FsSourceNavigator {
    pub fn new(root: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            root: root.into(),
            fs,
        }
    }

    fn read(&self, anchor: &Anchor) -> Result<String, AdapterError> {
        let path = resolve_within(&self.root, Path::new(&anchor.path))?;
        self.fs
            .read_to_string(&path)
            .map_err(|e| AdapterError::io(&path, e))
    }
}

/// Slice `source` between two positions, `None` when they fall outside it
pub fn extract_range(source: &str, start: Position, end: Position) -> Option<String> {
    if start == Position::default() && end == Position::default() {
        return Some(source.to_string());
    }
    if start.line == 0 || end.line < start.line {
        return None;
    }

    let lines: Vec<&str> = source.lines().collect();
    let selected = lines.get(start.line - 1..end.line)?;
    let last = selected.len() - 1;

    let mut block = Vec::with_capacity(selected.len());
    for (i, line) in selected.iter().enumerate() {
        let chars: Vec<char> = line.chars().collect();
        let from = if i == 0 { start.column.min(chars.len()) } else { 0 };
        let to = if i == last { end.column.min(chars.len()) } else { chars.len() };
        block.push(chars.get(from..to.max(from))?.iter().collect::<String>());
    }
    Some(block.join("\n"))
}

#[async_trait]
impl SourceNavigator for FsSourceNavigator {
    async fn open_source(&self, anchor: &Anchor) -> CodeWriteResult<()> {
        let path = resolve_within(&self.root, Path::new(&anchor.path))
            .map_err(|e| CodeWriteError::Navigation(e.to_string()))?;
        info!(
            "view source {}:{}:{}",
            path.display(),
            anchor.start.line,
            anchor.start.column
        );
        Ok(())
    }

    async fn code_block(&self, anchor: &Anchor) -> CodeWriteResult<Option<String>> {
        let source = self
            .read(anchor)
            .map_err(|e| CodeWriteError::Navigation(e.to_string()))?;
        Ok(extract_range(&source, anchor.start, anchor.end))
    }
}
