//! Data models for Marginalia
//!
//! Defines the plain value types that flow between the record source,
//! the engines and the CLI: highlight records, books, insight notes and
//! the derived stats cache.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A highlight fetched from the reading device
///
/// Immutable once fetched. Text fields are already whitespace-normalized
/// by the record source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HighlightRecord {
    /// Stable, source-assigned identifier
    pub id: String,
    /// The highlighted passage
    pub text: String,
    /// Optional annotation typed on the device
    pub note: Option<String>,
    /// When the highlight was made
    pub created_at: DateTime<Utc>,
    /// Identifier of the book the highlight belongs to
    pub book_id: String,
}

impl HighlightRecord {
    /// Create a record with normalized text and no annotation
    pub fn new(
        id: impl Into<String>,
        text: &str,
        created_at: DateTime<Utc>,
        book_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            text: normalize_whitespace(text),
            note: None,
            created_at,
            book_id: book_id.into(),
        }
    }

    /// Attach a device annotation (normalized; blank becomes `None`)
    pub fn with_note(mut self, note: &str) -> Self {
        let note = normalize_whitespace(note);
        self.note = if note.is_empty() { None } else { Some(note) };
        self
    }
}

/// A book known to the record source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Book {
    /// Source identifier (Kobo VolumeID)
    pub id: String,
    /// Display title; names the book document
    pub title: String,
    /// Author, when the source knows it
    pub author: Option<String>,
}

impl Book {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            author: None,
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }
}

/// Ordering of highlights within a book
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Chapter progress ascending, then creation ascending
    #[default]
    Chapter,
    /// Creation ascending
    Created,
}

impl std::str::FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chapter" => Ok(SortOrder::Chapter),
            "created" => Ok(SortOrder::Created),
            other => Err(format!(
                "Invalid sort order '{}'. Use 'chapter' or 'created'.",
                other
            )),
        }
    }
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortOrder::Chapter => write!(f, "chapter"),
            SortOrder::Created => write!(f, "created"),
        }
    }
}

/// A standalone note promoted from an annotated highlight
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InsightNote {
    /// Sanitized title; doubles as the note's storage name
    pub title: String,
    /// The highlighted passage, one entry per line
    pub quoted_text: String,
    /// Name of the book document this came from
    pub source_book_title: String,
    /// Record id of the source highlight, if the block carried one
    pub source_record_id: Option<String>,
    /// Creation date
    pub created_at: NaiveDate,
}

/// Derived counters cached in a document's header
///
/// Always recomputed from the body, never patched in place.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatsCache {
    pub highlights_total: usize,
    pub insights_created: usize,
    pub updated_at: DateTime<Utc>,
}

/// Collapse runs of whitespace into single spaces and trim the ends
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  a \n\t b   c "), "a b c");
        assert_eq!(normalize_whitespace("\n \t"), "");
    }

    #[test]
    fn test_record_normalizes_text_and_note() {
        let record = HighlightRecord::new("b1", "the  quick\nfox", Utc::now(), "vol")
            .with_note("  ");
        assert_eq!(record.text, "the quick fox");
        assert!(record.note.is_none());

        let record = record.with_note(" see\tchapter 2 ");
        assert_eq!(record.note.as_deref(), Some("see chapter 2"));
    }

    #[test]
    fn test_sort_order_parse() {
        assert_eq!("chapter".parse::<SortOrder>().unwrap(), SortOrder::Chapter);
        assert_eq!("Created".parse::<SortOrder>().unwrap(), SortOrder::Created);
        assert!("title".parse::<SortOrder>().is_err());
        assert_eq!(SortOrder::Created.to_string(), "created");
    }

    #[test]
    fn test_sort_order_serializes_lowercase() {
        let json = serde_json::to_string(&SortOrder::Created).unwrap();
        assert_eq!(json, "\"created\"");
    }
}
