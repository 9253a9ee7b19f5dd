//! In-memory document storage
//!
//! Mirrors the filesystem semantics (writes need an existing folder) and
//! can be told to refuse writes to specific paths, which makes failure
//! handling in the engines testable.

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};

use super::error::{StorageError, StorageResult};
use super::DocumentStorage;
use crate::sanitize::NOTE_EXTENSION;

#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    files: BTreeMap<PathBuf, String>,
    folders: BTreeSet<PathBuf>,
    denied: BTreeSet<PathBuf>,
    writes: usize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write to `path` fail with permission denied
    pub fn deny_writes_to(&mut self, path: impl Into<PathBuf>) {
        self.denied.insert(path.into());
    }

    /// Number of successful writes so far
    pub fn write_count(&self) -> usize {
        self.writes
    }

    /// All stored paths, sorted
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.keys().cloned().collect()
    }

    fn folder_exists(&self, folder: &Path) -> bool {
        folder.as_os_str().is_empty() || self.folders.contains(folder)
    }
}

impl DocumentStorage for MemoryStorage {
    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    fn read(&self, path: &Path) -> StorageResult<String> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                path: path.to_path_buf(),
            })
    }

    fn create(&mut self, path: &Path, text: &str) -> StorageResult<()> {
        if self.files.contains_key(path) {
            return Err(StorageError::AlreadyExists {
                path: path.to_path_buf(),
            });
        }
        self.write(path, text)
    }

    fn write(&mut self, path: &Path, text: &str) -> StorageResult<()> {
        if self.denied.contains(path) {
            return Err(StorageError::from_io(
                io::Error::new(io::ErrorKind::PermissionDenied, "write denied"),
                path.to_path_buf(),
            ));
        }
        let parent = path.parent().unwrap_or_else(|| Path::new(""));
        if !self.folder_exists(parent) {
            return Err(StorageError::NotFound {
                path: parent.to_path_buf(),
            });
        }

        self.files.insert(path.to_path_buf(), text.to_string());
        self.writes += 1;
        Ok(())
    }

    fn create_container(&mut self, path: &Path) -> StorageResult<()> {
        for ancestor in path.ancestors() {
            if !ancestor.as_os_str().is_empty() {
                self.folders.insert(ancestor.to_path_buf());
            }
        }
        Ok(())
    }

    fn list(&self, folder: &Path) -> StorageResult<Vec<PathBuf>> {
        Ok(self
            .files
            .keys()
            .filter(|path| path.parent() == Some(folder))
            .filter(|path| {
                path.extension()
                    .map(|ext| ext == NOTE_EXTENSION)
                    .unwrap_or(false)
            })
            .cloned()
            .collect())
    }
}
