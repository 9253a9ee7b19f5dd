//! Storage layer
//!
//! Documents live in a vault keyed by relative paths such as
//! `Highlights/Dune.md`. The engines only talk to the [`DocumentStorage`]
//! trait; [`FsStorage`] backs it with the filesystem and [`MemoryStorage`]
//! keeps everything in memory.
//!
//! Stats are cached as side metadata in each document's header, reached
//! through the [`MetadataStore`] trait.

pub mod error;
pub mod fs;
pub mod memory;
pub mod metadata;

use std::path::{Path, PathBuf};

pub use error::{StorageError, StorageResult};
pub use fs::FsStorage;
pub use memory::MemoryStorage;
pub use metadata::{FrontmatterMetadata, MetadataStore};

/// Document storage collaborator
pub trait DocumentStorage {
    /// Whether a document exists at `path`
    fn exists(&self, path: &Path) -> bool;

    /// Read a document's full text
    fn read(&self, path: &Path) -> StorageResult<String>;

    /// Replace a document's text; the containing folder must exist
    fn write(&mut self, path: &Path, text: &str) -> StorageResult<()>;

    /// Write a new document, failing with [`StorageError::AlreadyExists`]
    /// if one is already there
    fn create(&mut self, path: &Path, text: &str) -> StorageResult<()>;

    /// Create a folder (and its parents); succeeds if it already exists
    fn create_container(&mut self, path: &Path) -> StorageResult<()>;

    /// Markdown documents directly inside a folder, sorted by path
    fn list(&self, folder: &Path) -> StorageResult<Vec<PathBuf>>;
}
