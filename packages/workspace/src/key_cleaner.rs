//! Removes generation-key attributes left behind by structural writes.

use crate::errors::{AdapterError, AdapterResult};
use async_trait::async_trait;
use paperclip_common::{resolve_within, FileSystem};
use paperclip_editor::{CodeWriteError, CodeWriteResult, KeyCleaner};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error};

pub const DEFAULT_KEY_ATTRIBUTE: &str = "data-pc-key";

pub struct FsKeyCleaner {
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
    pattern: Regex,
}

impl FsKeyCleaner {
    pub fn new(root: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> AdapterResult<Self> {
        Self::with_attribute(root, fs, DEFAULT_KEY_ATTRIBUTE)
    }

    pub fn with_attribute(
        root: impl Into<PathBuf>,
        fs: Arc<dyn FileSystem>,
        attribute: &str,
    ) -> AdapterResult<Self> {
        Ok(Self {
            root: root.into(),
            fs,
            pattern: Self::attribute_pattern(attribute)?,
        })
    }

    /// Matches `attr="..."`, `attr='...'` and `attr={...}` with leading whitespace
    fn attribute_pattern(attribute: &str) -> Result<Regex, regex::Error> {
        Regex::new(&format!(
            r#"\s+{}=(?:"[^"]*"|'[^']*'|\{{[^}}]*\}})"#,
            regex::escape(attribute)
        ))
    }

    /// Strip keys from `source`, `None` when nothing matched
    pub fn strip(&self, source: &str) -> Option<String> {
        if !self.pattern.is_match(source) {
            return None;
        }
        Some(self.pattern.replace_all(source, "").into_owned())
    }

    fn clean_file(&self, file: &str) -> AdapterResult<bool> {
        let path = resolve_within(&self.root, Path::new(file))?;
        let source = self
            .fs
            .read_to_string(&path)
            .map_err(|e| AdapterError::io(&path, e))?;
        let Some(cleaned) = self.strip(&source) else {
            return Ok(false);
        };
        self.fs
            .write(&path, &cleaned)
            .map_err(|e| AdapterError::io(&path, e))?;
        Ok(true)
    }
}

#[async_trait]
impl KeyCleaner for FsKeyCleaner {
    async fn clean_keys(&self, files: &[String]) -> CodeWriteResult<()> {
        let mut failures = Vec::new();
        for file in files {
            match self.clean_file(file) {
                Ok(changed) => debug!(file = %file, changed, "cleaned generation keys"),
                Err(e) => {
                    error!(file = %file, "failed to clean generation keys: {}", e);
                    failures.push(file.clone());
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(CodeWriteError::Cleanup(format!(
                "{} file(s) failed: {}",
                failures.len(),
                failures.join(", ")
            )))
        }
    }
}
