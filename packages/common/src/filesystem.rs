use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::{CommonError, CommonResult};

/// File system abstraction for source writes and testing
pub trait FileSystem: Send + Sync {
    /// Check if a file exists
    fn exists(&self, path: &Path) -> bool;

    fn read_to_string(&self, path: &Path) -> Result<String, io::Error>;

    fn write(&self, path: &Path, contents: &str) -> Result<(), io::Error>;

    /// Atomically replace `to` with `from`
    fn rename(&self, from: &Path, to: &Path) -> Result<(), io::Error>;

    fn remove_file(&self, path: &Path) -> Result<(), io::Error>;
}

/// Real file system implementation
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_to_string(&self, path: &Path) -> Result<String, io::Error> {
        std::fs::read_to_string(path)
    }

    fn write(&self, path: &Path, contents: &str) -> Result<(), io::Error> {
        std::fs::write(path, contents)
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), io::Error> {
        std::fs::rename(from, to)
    }

    fn remove_file(&self, path: &Path) -> Result<(), io::Error> {
        std::fs::remove_file(path)
    }
}

/// In-memory file system for testing
#[derive(Default)]
pub struct MockFileSystem {
    files: Mutex<HashMap<PathBuf, String>>,
    read_only: Mutex<HashSet<PathBuf>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        self.files_guard().insert(path.into(), contents.into());
    }

    /// Make every write targeting `path` fail with `PermissionDenied`
    pub fn deny_writes(&self, path: impl Into<PathBuf>) {
        self.read_only
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.into());
    }

    pub fn contents(&self, path: &Path) -> Option<String> {
        self.files_guard().get(path).cloned()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.files_guard().keys().cloned().collect();
        paths.sort();
        paths
    }

    fn files_guard(&self) -> MutexGuard<'_, HashMap<PathBuf, String>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_read_only(&self, path: &Path) -> bool {
        self.read_only
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(path)
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, path.display().to_string())
}

impl FileSystem for MockFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.files_guard().contains_key(path)
    }

    fn read_to_string(&self, path: &Path) -> Result<String, io::Error> {
        self.contents(path).ok_or_else(|| not_found(path))
    }

    fn write(&self, path: &Path, contents: &str) -> Result<(), io::Error> {
        if self.is_read_only(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                path.display().to_string(),
            ));
        }
        self.files_guard()
            .insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), io::Error> {
        if self.is_read_only(to) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                to.display().to_string(),
            ));
        }
        let mut files = self.files_guard();
        let contents = files.remove(from).ok_or_else(|| not_found(from))?;
        files.insert(to.to_path_buf(), contents);
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<(), io::Error> {
        self.files_guard()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| not_found(path))
    }
}

/// Lexically resolve `.` and `..` components without touching the disk
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// Join `relative` onto `root`, rejecting results that leave `root`
pub fn resolve_within(root: &Path, relative: &Path) -> CommonResult<PathBuf> {
    let root = normalize_path(root);
    let joined = normalize_path(&root.join(relative));
    if joined.starts_with(&root) && joined != root {
        Ok(joined)
    } else {
        Err(CommonError::OutsideRoot(relative.to_path_buf()))
    }
}
