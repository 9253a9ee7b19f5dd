//! Kobo e-reader database
//!
//! Reads `KoboReader.sqlite` read-only. Books are `content` rows with
//! `ContentType = 6`; highlights are `Bookmark` rows keyed by `VolumeID`.
//!
//! ## Columns used
//!
//! - `content`: `ContentID`, `ContentType`, `Title`, `Attribution`
//! - `Bookmark`: `BookmarkID`, `VolumeID`, `Text`, `Annotation`,
//!   `DateCreated`, `ChapterProgress`

use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use tracing::{debug, warn};

use super::{RecordSource, SourceError, SourceResult};
use crate::models::{normalize_whitespace, Book, HighlightRecord, SortOrder};

/// Content type of a whole book in the `content` table
const BOOK_CONTENT_TYPE: i64 = 6;

const BOOK_COLUMNS: &str = "SELECT ContentID, Title, Attribution FROM content";

/// Record source backed by a Kobo database
pub struct KoboSource {
    conn: Connection,
}

impl KoboSource {
    /// Open a Kobo database without write access
    pub fn open(path: &Path) -> SourceResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|source| SourceError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self { conn })
    }

    /// Wrap an already open connection
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    fn query_books(&self, filter: &str) -> SourceResult<Vec<Book>> {
        let sql = format!(
            "{} WHERE ContentType = ?1{} ORDER BY Title COLLATE NOCASE",
            BOOK_COLUMNS, filter
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![BOOK_CONTENT_TYPE], BookRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows.into_iter().filter_map(BookRow::into_book).collect())
    }
}

/// Bookmark rows that carry highlighted text; dog-ears have none
const HIGHLIGHT_ROW_FILTER: &str = "Text IS NOT NULL \
    AND trim(Text, ' ' || char(9) || char(10) || char(13)) <> '' \
    AND DateCreated IS NOT NULL";

impl RecordSource for KoboSource {
    fn fetch_highlights(
        &self,
        book_id: &str,
        order: SortOrder,
    ) -> SourceResult<Vec<HighlightRecord>> {
        let order_by = match order {
            SortOrder::Chapter => "ChapterProgress, DateCreated",
            SortOrder::Created => "DateCreated",
        };
        let sql = format!(
            "SELECT BookmarkID, VolumeID, Text, Annotation, DateCreated
             FROM Bookmark WHERE VolumeID = ?1 ORDER BY {}",
            order_by
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![book_id], BookmarkRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let total = rows.len();
        let records: Vec<HighlightRecord> =
            rows.into_iter().filter_map(BookmarkRow::into_record).collect();
        debug!(
            book_id,
            fetched = total,
            kept = records.len(),
            "Fetched highlights"
        );
        Ok(records)
    }

    fn fetch_book_catalog(&self) -> SourceResult<Vec<Book>> {
        self.query_books("")
    }

    fn fetch_annotated_books(&self) -> SourceResult<Vec<Book>> {
        self.query_books(&format!(
            " AND ContentID IN (SELECT DISTINCT VolumeID FROM Bookmark WHERE {})",
            HIGHLIGHT_ROW_FILTER
        ))
    }

    fn book_by_title(&self, title: &str) -> SourceResult<Option<Book>> {
        let sql = format!(
            "{} WHERE ContentType = ?1 AND Title = ?2 LIMIT 1",
            BOOK_COLUMNS
        );
        let row = self
            .conn
            .query_row(&sql, params![BOOK_CONTENT_TYPE, title], BookRow::from_row)
            .optional()?;
        Ok(row.and_then(BookRow::into_book))
    }
}

/// Raw `content` row, before validation
struct BookRow {
    id: Option<String>,
    title: Option<String>,
    author: Option<String>,
}

impl BookRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            author: row.get(2)?,
        })
    }

    fn into_book(self) -> Option<Book> {
        let (Some(id), Some(title)) = (self.id, self.title) else {
            warn!("Skipping book row without id or title");
            return None;
        };
        let title = normalize_whitespace(&title);
        if title.is_empty() {
            warn!(book_id = %id, "Skipping book with a blank title");
            return None;
        }

        let book = Book::new(id, title);
        match self.author.map(|a| normalize_whitespace(&a)) {
            Some(author) if !author.is_empty() => Some(book.with_author(author)),
            _ => Some(book),
        }
    }
}

/// Raw `Bookmark` row, before validation
struct BookmarkRow {
    id: Option<String>,
    volume_id: Option<String>,
    text: Option<String>,
    annotation: Option<String>,
    created: Option<String>,
}

impl BookmarkRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            volume_id: row.get(1)?,
            text: row.get(2)?,
            annotation: row.get(3)?,
            created: row.get(4)?,
        })
    }

    fn into_record(self) -> Option<HighlightRecord> {
        let Some(id) = self.id else {
            warn!("Dropping highlight without an id");
            return None;
        };
        let Some(book_id) = self.volume_id else {
            warn!(record_id = %id, "Dropping highlight without a book reference");
            return None;
        };
        let Some(text) = self.text.filter(|t| !t.trim().is_empty()) else {
            warn!(record_id = %id, "Dropping highlight without text");
            return None;
        };
        let Some(created_at) = self.created.as_deref().and_then(parse_timestamp) else {
            warn!(
                record_id = %id,
                created = ?self.created,
                "Dropping highlight with a missing or unreadable timestamp"
            );
            return None;
        };

        let record = HighlightRecord::new(id, &text, created_at, book_id);
        Some(match self.annotation {
            Some(note) => record.with_note(&note),
            None => record,
        })
    }
}

/// Parse a Kobo timestamp
///
/// Accepts RFC 3339 and the naive `YYYY-MM-DDTHH:MM:SS[.fff]` /
/// `YYYY-MM-DD HH:MM:SS[.fff]` forms, which are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}
