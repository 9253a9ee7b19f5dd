//! Unified entry point
//!
//! The `Store` ties the configuration, the vault storage and the engines
//! together and runs passes over many books:
//! - import: record source → sync engine → book documents
//! - extract: book documents → extraction engine → insight notes
//! - stats: read or refresh the cached counters of book documents
//!
//! Passes run book by book. A book that fails is recorded in the pass
//! report and the remaining books still run.
//!
//! ## Usage
//!
//! ```ignore
//! let mut store = Store::open()?;
//! let source = store.open_source()?;
//!
//! let report = store.import(&source, &ImportOptions::default())?;
//! let extracted = store.extract_all()?;
//! ```

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::document::Document;
use crate::extract::{self, ExtractionReport};
use crate::models::{Book, SortOrder, StatsCache};
use crate::sanitize::{note_name, note_path, sanitize_title};
use crate::source::{KoboSource, RecordSource};
use crate::stats::{self, Stats};
use crate::storage::{DocumentStorage, FrontmatterMetadata, FsStorage, MetadataStore};
use crate::sync::{self, SyncOutcome};

/// Options for an import pass
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Import only the book with this exact title
    pub book: Option<String>,
    /// Include books without highlights (overrides `import_all_books`)
    pub all_books: Option<bool>,
    /// Highlight ordering (overrides `sort_order`)
    pub order: Option<SortOrder>,
}

/// A book that failed during a pass
#[derive(Debug, Clone, Serialize)]
pub struct BookFailure {
    pub book: String,
    pub error: String,
}

/// Per-book results of a pass over many books
#[derive(Debug, Clone, Serialize)]
pub struct PassReport<T> {
    pub books: Vec<T>,
    pub failures: Vec<BookFailure>,
}

impl<T> Default for PassReport<T> {
    fn default() -> Self {
        Self {
            books: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<T> PassReport<T> {
    fn fail(&mut self, book: &str, error: anyhow::Error) {
        warn!(book, error = %format!("{:#}", error), "Book failed");
        self.failures.push(BookFailure {
            book: book.to_string(),
            error: format!("{:#}", error),
        });
    }
}

pub type ImportReport = PassReport<SyncOutcome>;
pub type ExtractReport = PassReport<ExtractionReport>;
pub type StatsReport = PassReport<BookStats>;

impl ImportReport {
    /// Highlights appended across all books
    pub fn added(&self) -> usize {
        self.books.iter().map(|outcome| outcome.added).sum()
    }
}

impl ExtractReport {
    /// Insight links written across all books
    pub fn links_written(&self) -> usize {
        self.books.iter().map(ExtractionReport::links_written).sum()
    }
}

/// Live and cached counters of one book document
#[derive(Debug, Clone, Serialize)]
pub struct BookStats {
    pub book: String,
    pub path: PathBuf,
    /// Counted from the body right now
    pub current: Stats,
    /// What the header says (before a refresh, if one ran)
    pub cached: Option<StatsCache>,
}

impl BookStats {
    /// Whether the header disagrees with the body
    pub fn is_stale(&self) -> bool {
        match self.cached {
            Some(cache) => {
                cache.highlights_total != self.current.highlights_total
                    || cache.insights_created != self.current.insights_created
            }
            None => true,
        }
    }
}

/// A book from the record source and its document, if one exists
#[derive(Debug, Clone, Serialize)]
pub struct BookListing {
    #[serde(flatten)]
    pub book: Book,
    pub document: Option<PathBuf>,
}

/// Unified interface over the vault
pub struct Store<S: DocumentStorage = FsStorage> {
    config: Config,
    storage: S,
}

impl Store<FsStorage> {
    /// Open the vault named by the default configuration
    pub fn open() -> Result<Self> {
        let config = Config::load().context("Failed to load configuration")?;
        Self::open_with_config(config)
    }

    /// Open the vault with a specific configuration
    ///
    /// Creates the vault directory on first use.
    pub fn open_with_config(config: Config) -> Result<Self> {
        config.ensure_vault_dir()?;
        let storage = FsStorage::new(&config.vault_dir);
        Ok(Self { config, storage })
    }
}

impl<S: DocumentStorage> Store<S> {
    /// Use an arbitrary storage backend
    pub fn with_storage(config: Config, storage: S) -> Self {
        Self { config, storage }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Open the Kobo database named in the configuration
    pub fn open_source(&self) -> Result<KoboSource> {
        let path = self.config.kobo_db.as_ref().ok_or_else(|| {
            anyhow!("No Kobo database configured. Run: marginalia config set kobo_db <path>")
        })?;
        KoboSource::open(path).context("Failed to open Kobo database")
    }

    // ==================== Import ====================

    /// Merge highlights from a record source into the book documents
    pub fn import<R: RecordSource>(
        &mut self,
        source: &R,
        options: &ImportOptions,
    ) -> Result<ImportReport> {
        let order = options.order.unwrap_or(self.config.sort_order);
        let all_books = options.all_books.unwrap_or(self.config.import_all_books);

        let books = match options.book {
            Some(ref title) => vec![source
                .book_by_title(title)
                .context("Failed to look up book")?
                .ok_or_else(|| anyhow!("No book titled '{}' on the reader", title))?],
            None if all_books => source
                .fetch_book_catalog()
                .context("Failed to read book catalog")?,
            None => source
                .fetch_annotated_books()
                .context("Failed to read annotated books")?,
        };

        let folder = self.config.highlights_path();
        let mut report = ImportReport::default();
        for book in &books {
            let result = source
                .fetch_highlights(&book.id, order)
                .context("Failed to fetch highlights")
                .and_then(|records| {
                    sync::sync_book(&mut self.storage, &folder, book, &records, Utc::now())
                        .context("Failed to write book document")
                });
            match result {
                Ok(outcome) => report.books.push(outcome),
                Err(e) => report.fail(&book.title, e),
            }
        }

        info!(
            books = books.len(),
            added = report.added(),
            failed = report.failures.len(),
            "Import finished"
        );
        Ok(report)
    }

    /// Books known to the source, with their documents
    pub fn books<R: RecordSource>(&self, source: &R, all: bool) -> Result<Vec<BookListing>> {
        let books = if all {
            source.fetch_book_catalog()
        } else {
            source.fetch_annotated_books()
        }
        .context("Failed to list books")?;

        let folder = self.config.highlights_path();
        Ok(books
            .into_iter()
            .map(|book| {
                let path = note_path(&folder, &sync::book_note_name(&book));
                let document = self.storage.exists(&path).then_some(path);
                BookListing { book, document }
            })
            .collect())
    }

    // ==================== Extraction ====================

    /// Extract the annotated highlights of one book document
    pub fn extract_book(&mut self, title: &str) -> Result<ExtractionReport> {
        let path = self.book_document(title)?;
        self.extract_path(&path)
    }

    /// Extract annotated highlights from every book document
    pub fn extract_all(&mut self) -> Result<ExtractReport> {
        let mut report = ExtractReport::default();
        for path in self.book_documents()? {
            match self.extract_path(&path) {
                Ok(book) => report.books.push(book),
                Err(e) => report.fail(&display_name(&path), e),
            }
        }
        Ok(report)
    }

    fn extract_path(&mut self, path: &Path) -> Result<ExtractionReport> {
        let insights = self.config.insights_path();
        extract::extract_book(&mut self.storage, path, &insights, Utc::now())
            .with_context(|| format!("Failed to extract insights from {}", path.display()))
    }

    // ==================== Stats ====================

    /// Live and cached stats of one book document
    pub fn book_stats(&self, title: &str) -> Result<BookStats> {
        let path = self.book_document(title)?;
        self.read_stats(&path)
    }

    /// Live and cached stats of every book document
    pub fn stats(&self) -> Result<StatsReport> {
        let mut report = StatsReport::default();
        for path in self.book_documents()? {
            match self.read_stats(&path) {
                Ok(stats) => report.books.push(stats),
                Err(e) => report.fail(&display_name(&path), e),
            }
        }
        Ok(report)
    }

    /// Recompute the stats cache of one book document, or of all of them
    pub fn refresh_stats(&mut self, title: Option<&str>) -> Result<StatsReport> {
        let paths = match title {
            Some(title) => vec![self.book_document(title)?],
            None => self.book_documents()?,
        };

        let now = Utc::now();
        let mut report = StatsReport::default();
        let mut metadata = FrontmatterMetadata::new(&mut self.storage);
        for path in paths {
            let result = metadata.read_stats(&path).and_then(|cached| {
                let fresh = stats::refresh_cache(&mut metadata, &path, now)?;
                Ok(BookStats {
                    book: display_name(&path),
                    path: path.clone(),
                    current: Stats {
                        highlights_total: fresh.highlights_total,
                        insights_created: fresh.insights_created,
                    },
                    cached,
                })
            });
            match result {
                Ok(stats) => report.books.push(stats),
                Err(e) => report.fail(&display_name(&path), e.into()),
            }
        }
        Ok(report)
    }

    fn read_stats(&self, path: &Path) -> Result<BookStats> {
        let doc = Document::parse(&self.storage.read(path)?);
        Ok(BookStats {
            book: display_name(path),
            path: path.to_path_buf(),
            current: stats::compute_stats(&doc.body()),
            cached: doc.header().and_then(stats::read_cache),
        })
    }

    // ==================== Documents ====================

    /// Paths of all book documents
    pub fn book_documents(&self) -> Result<Vec<PathBuf>> {
        let folder = self.config.highlights_path();
        self.storage
            .list(&folder)
            .with_context(|| format!("Failed to list {}", folder.display()))
    }

    /// Path of the document for a book title
    fn book_document(&self, title: &str) -> Result<PathBuf> {
        let name = sanitize_title(title);
        if name.is_empty() {
            bail!("'{}' is not a usable book title", title);
        }
        let path = note_path(&self.config.highlights_path(), &name);
        if !self.storage.exists(&path) {
            bail!(
                "No book document for '{}' (looked for {})",
                title,
                path.display()
            );
        }
        Ok(path)
    }
}

fn display_name(path: &Path) -> String {
    note_name(path).unwrap_or_else(|| path.display().to_string())
}
