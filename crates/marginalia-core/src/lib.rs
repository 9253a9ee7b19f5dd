//! Marginalia Core Library
//!
//! This crate turns e-reader highlights into Markdown notes. Highlights
//! are merged into one append-only document per book; annotated
//! highlights can then be promoted into standalone insight notes that
//! link back to the book.
//!
//! # Architecture
//!
//! - **Record source**: the Kobo database, read-only
//! - **Document model**: typed blocks over the Markdown text, round-trip safe
//! - **Engines**: sync (append new highlights), extract (promote memos),
//!   stats (derived counters cached in the frontmatter)
//! - **Storage**: the vault on disk, behind a trait
//!
//! # Quick Start
//!
//! ```text
//! let mut store = Store::open()?;
//! let source = store.open_source()?;
//!
//! // Append new highlights to the book documents
//! store.import(&source, &ImportOptions::default())?;
//!
//! // Promote annotated highlights to insight notes
//! store.extract_all()?;
//! ```
//!
//! # Modules
//!
//! - `store`: Unified entry point (main entry point)
//! - `models`: Highlight records, books, insight notes, stats cache
//! - `document`: Block model of book documents
//! - `source`: Record sources (Kobo)
//! - `sync`: Merging records into book documents
//! - `extract`: Promoting annotated highlights
//! - `stats`: Derived counters
//! - `storage`: Vault storage and header metadata
//! - `config`: Application configuration

pub mod config;
pub mod document;
pub mod extract;
pub mod models;
pub mod sanitize;
pub mod source;
pub mod stats;
pub mod storage;
pub mod store;
pub mod sync;

pub use config::Config;
pub use document::{BlockId, Document, DocumentError};
pub use extract::ExtractionReport;
pub use models::{Book, HighlightRecord, InsightNote, SortOrder, StatsCache};
pub use source::{KoboSource, RecordSource, SourceError};
pub use stats::Stats;
pub use storage::{DocumentStorage, FsStorage, MemoryStorage, StorageError};
pub use store::{ImportOptions, Store};
pub use sync::{SyncOutcome, SyncStatus};
