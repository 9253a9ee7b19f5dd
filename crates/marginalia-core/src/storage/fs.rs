//! Filesystem-backed document storage
//!
//! Paths are resolved against the vault root. Writes are atomic (write to
//! a temp file, then rename) so a document is never left half-written.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::error::{StorageError, StorageResult};
use super::DocumentStorage;
use crate::sanitize::NOTE_EXTENSION;

/// Vault on the local filesystem
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    /// Create a storage handler rooted at the vault directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }
}

impl DocumentStorage for FsStorage {
    fn exists(&self, path: &Path) -> bool {
        self.resolve(path).is_file()
    }

    fn read(&self, path: &Path) -> StorageResult<String> {
        let full = self.resolve(path);
        fs::read_to_string(&full).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound { path: full },
            std::io::ErrorKind::PermissionDenied => StorageError::PermissionDenied {
                path: full,
                source: e,
            },
            _ => StorageError::ReadError {
                path: full,
                source: e,
            },
        })
    }

    fn write(&mut self, path: &Path, text: &str) -> StorageResult<()> {
        atomic_write(&self.resolve(path), text.as_bytes())
    }

    fn create(&mut self, path: &Path, text: &str) -> StorageResult<()> {
        let full = self.resolve(path);
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&full)
            .map_err(|e| StorageError::from_io(e, full.clone()))?;

        let written = file.write_all(text.as_bytes()).and_then(|()| file.sync_all());
        written.map_err(|e| {
            let _ = fs::remove_file(&full);
            StorageError::from_io(e, full)
        })
    }

    fn create_container(&mut self, path: &Path) -> StorageResult<()> {
        let full = self.resolve(path);
        fs::create_dir_all(&full).map_err(|source| StorageError::CreateDirectory {
            path: full,
            source,
        })
    }

    fn list(&self, folder: &Path) -> StorageResult<Vec<PathBuf>> {
        let full = self.resolve(folder);
        if !full.is_dir() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&full).map_err(|e| StorageError::from_io(e, full.clone()))?;
        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StorageError::from_io(e, full.clone()))?;
            let file_path = entry.path();
            let is_note = file_path
                .extension()
                .map(|ext| ext == NOTE_EXTENSION)
                .unwrap_or(false);
            if is_note && file_path.is_file() {
                paths.push(folder.join(entry.file_name()));
            }
        }
        paths.sort();
        Ok(paths)
    }
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
///
/// The parent directory must already exist.
fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    let temp_path = path.with_extension("md.tmp");

    let mut file =
        File::create(&temp_path).map_err(|e| StorageError::from_io(e, path.to_path_buf()))?;

    file.write_all(data)
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    // Sync to disk before rename
    file.sync_all()
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    fs::rename(&temp_path, path).map_err(|source| {
        let _ = fs::remove_file(&temp_path);
        StorageError::AtomicWriteFailed {
            from: temp_path.clone(),
            to: path.to_path_buf(),
            source,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_and_read() {
        let temp_dir = TempDir::new().unwrap();
        let mut storage = FsStorage::new(temp_dir.path());
        let path = Path::new("Highlights/Dune.md");

        assert!(!storage.exists(path));

        storage.create_container(Path::new("Highlights")).unwrap();
        storage.write(path, "# Dune\n").unwrap();

        assert!(storage.exists(path));
        assert_eq!(storage.read(path).unwrap(), "# Dune\n");
        assert!(temp_dir.path().join("Highlights/Dune.md").exists());
    }

    #[test]
    fn test_write_overwrites_and_leaves_no_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let mut storage = FsStorage::new(temp_dir.path());
        let path = Path::new("note.md");

        storage.write(path, "first").unwrap();
        storage.write(path, "second").unwrap();

        assert_eq!(storage.read(path).unwrap(), "second");
        assert!(!temp_dir.path().join("note.md.tmp").exists());
    }

    #[test]
    fn test_write_without_container_fails() {
        let temp_dir = TempDir::new().unwrap();
        let mut storage = FsStorage::new(temp_dir.path());

        let err = storage
            .write(Path::new("Missing/note.md"), "text")
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[test]
    fn test_create_does_not_clobber() {
        let temp_dir = TempDir::new().unwrap();
        let mut storage = FsStorage::new(temp_dir.path());
        let path = Path::new("idea.md");

        storage.create(path, "first").unwrap();
        let err = storage.create(path, "second").unwrap_err();

        assert!(err.is_conflict());
        assert_eq!(storage.read(path).unwrap(), "first");
    }

    #[test]
    fn test_read_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FsStorage::new(temp_dir.path());

        let err = storage.read(Path::new("nope.md")).unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[test]
    fn test_create_container_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let mut storage = FsStorage::new(temp_dir.path());

        storage.create_container(Path::new("a/b/c")).unwrap();
        storage.create_container(Path::new("a/b/c")).unwrap();
        assert!(temp_dir.path().join("a/b/c").is_dir());
    }

    #[test]
    fn test_list_markdown_documents() {
        let temp_dir = TempDir::new().unwrap();
        let mut storage = FsStorage::new(temp_dir.path());
        let folder = Path::new("Highlights");

        assert!(storage.list(folder).unwrap().is_empty());

        storage.create_container(folder).unwrap();
        storage.write(&folder.join("b.md"), "b").unwrap();
        storage.write(&folder.join("a.md"), "a").unwrap();
        storage.write(&folder.join("notes.txt"), "x").unwrap();
        storage.create_container(&folder.join("sub.md")).unwrap();

        let listed = storage.list(folder).unwrap();
        assert_eq!(
            listed,
            vec![PathBuf::from("Highlights/a.md"), PathBuf::from("Highlights/b.md")]
        );
    }
}
