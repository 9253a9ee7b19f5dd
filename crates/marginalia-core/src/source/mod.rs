//! Record sources
//!
//! A record source answers four questions: which books exist, which of
//! them carry highlights, which book has a given title, and what the
//! highlights of a book are. Everything returned is a plain value; rows
//! that cannot be turned into one are dropped and logged, never surfaced
//! as errors.

pub mod kobo;

use std::path::PathBuf;

use thiserror::Error;

use crate::models::{Book, HighlightRecord, SortOrder};

pub use kobo::KoboSource;

/// Errors from querying a record source
#[derive(Error, Debug)]
pub enum SourceError {
    /// The device database could not be opened
    #[error("Failed to open reader database '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// A query against the device database failed
    #[error("Reader database query failed: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type SourceResult<T> = Result<T, SourceError>;

/// Where highlight records come from
pub trait RecordSource {
    /// Highlights of one book, in the requested order
    fn fetch_highlights(&self, book_id: &str, order: SortOrder)
        -> SourceResult<Vec<HighlightRecord>>;

    /// Every book the source knows, with or without highlights
    fn fetch_book_catalog(&self) -> SourceResult<Vec<Book>>;

    /// Books that carry at least one highlight
    fn fetch_annotated_books(&self) -> SourceResult<Vec<Book>>;

    /// Book metadata by exact title
    fn book_by_title(&self, title: &str) -> SourceResult<Option<Book>>;
}
