//! Side metadata for documents
//!
//! Book documents carry their stats cache in the frontmatter header.
//! [`MetadataStore`] is the read / read-modify-write seam for that header;
//! [`FrontmatterMetadata`] implements it on top of any [`DocumentStorage`]
//! and never touches the document body.

use std::path::Path;

use super::error::StorageResult;
use super::DocumentStorage;
use crate::document::{Document, HeaderBlock};
use crate::models::StatsCache;
use crate::stats;

/// Structured metadata attached to a stored document
pub trait MetadataStore {
    /// Read the cached stats of a document, if it has a complete cache
    fn read_stats(&self, path: &Path) -> StorageResult<Option<StatsCache>>;

    /// Mutate a document's header in one read-modify-write step
    ///
    /// The closure receives the header and the current body text.
    fn process_header<F, T>(&mut self, path: &Path, mutate: F) -> StorageResult<T>
    where
        F: FnOnce(&mut HeaderBlock, &str) -> T;
}

/// Metadata kept in the frontmatter of the documents themselves
pub struct FrontmatterMetadata<'a, S: DocumentStorage> {
    storage: &'a mut S,
}

impl<'a, S: DocumentStorage> FrontmatterMetadata<'a, S> {
    pub fn new(storage: &'a mut S) -> Self {
        Self { storage }
    }
}

impl<S: DocumentStorage> MetadataStore for FrontmatterMetadata<'_, S> {
    fn read_stats(&self, path: &Path) -> StorageResult<Option<StatsCache>> {
        let doc = Document::parse(&self.storage.read(path)?);
        Ok(doc.header().and_then(stats::read_cache))
    }

    fn process_header<F, T>(&mut self, path: &Path, mutate: F) -> StorageResult<T>
    where
        F: FnOnce(&mut HeaderBlock, &str) -> T,
    {
        let original = self.storage.read(path)?;
        let mut doc = Document::parse(&original);
        let body = doc.body();
        let result = mutate(doc.header_mut(), &body);

        let updated = doc.serialize();
        if updated != original {
            self.storage.write(path, &updated)?;
        }
        Ok(result)
    }
}
