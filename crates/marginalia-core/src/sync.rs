//! Merging fetched highlights into book documents
//!
//! A merge only ever appends. Records are matched by their stable id, so
//! running the same import twice leaves the document byte-identical, and
//! blocks written by earlier merges (and whatever the user typed into
//! their memos since) are never touched.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::document::{format, Block, Document, HeaderBlock, HighlightBlock, MemoLine};
use crate::models::{Book, HighlightRecord};
use crate::sanitize::{note_path, sanitize_title};
use crate::stats;
use crate::storage::{DocumentStorage, StorageResult};

/// Note name used when a book title sanitizes to nothing
const UNTITLED: &str = "Untitled";

/// What a sync did to a book document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// The document did not exist and was written
    Created,
    /// New highlights were appended
    Appended,
    /// Nothing to add; the document was not written
    Unchanged,
}

/// Result of syncing one book
#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    pub book_title: String,
    pub path: PathBuf,
    pub added: usize,
    pub status: SyncStatus,
}

/// Append blocks for records the document does not contain yet
///
/// Each new record becomes a blank separator line, its highlight block
/// and an empty memo. A record id seen earlier (in the document or in
/// `records` itself) is skipped: the first writer wins. Returns the
/// number of highlights appended.
pub fn merge_records(doc: &mut Document, records: &[HighlightRecord]) -> usize {
    let mut known: HashSet<String> = doc.record_ids().into_iter().map(str::to_string).collect();

    let mut blocks = Vec::new();
    let mut added = 0;
    for record in records {
        if !known.insert(record.id.clone()) {
            debug!(record_id = %record.id, "Skipping known highlight");
            continue;
        }
        blocks.push(Block::Text(String::new()));
        blocks.push(Block::Highlight(HighlightBlock::from_record(record)));
        blocks.push(Block::Memo(MemoLine::empty()));
        added += 1;
    }

    doc.append_blocks(blocks);
    added
}

/// Fresh document for a book: header and title heading
pub fn new_book_document(book: &Book, created: NaiveDate) -> Document {
    let mut header = HeaderBlock::new();
    header.set(format::keys::TITLE, &book.title);
    if let Some(ref author) = book.author {
        header.set(format::keys::AUTHOR, author);
    }
    header.set(format::keys::BOOK_ID, &book.id);
    header.set(format::keys::CREATED, &created.format("%Y-%m-%d").to_string());

    let mut doc = Document::with_header(header);
    doc.append_blocks([
        Block::Text(String::new()),
        Block::Text(format!("# {}", book.title)),
    ]);
    doc
}

/// Note name of a book's document
///
/// Falls back to the book id, then to a fixed name, when the title has
/// nothing usable left after sanitizing.
pub fn book_note_name(book: &Book) -> String {
    [book.title.as_str(), book.id.as_str()]
        .iter()
        .map(|raw| sanitize_title(raw))
        .find(|name| !name.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string())
}

/// Merge a book's records into its document inside `folder`
///
/// An existing document with nothing new is left alone. A missing
/// document is created even when there are no records, so every book
/// of an import gets a note. The stats cache is refreshed before the
/// single write.
pub fn sync_book<S: DocumentStorage>(
    storage: &mut S,
    folder: &Path,
    book: &Book,
    records: &[HighlightRecord],
    now: DateTime<Utc>,
) -> StorageResult<SyncOutcome> {
    let path = note_path(folder, &book_note_name(book));

    let (mut doc, status) = if storage.exists(&path) {
        (Document::parse(&storage.read(&path)?), SyncStatus::Appended)
    } else {
        storage.create_container(folder)?;
        (new_book_document(book, now.date_naive()), SyncStatus::Created)
    };

    let added = merge_records(&mut doc, records);
    let status = if added == 0 && status == SyncStatus::Appended {
        info!(book = %book.title, "Nothing to add");
        SyncStatus::Unchanged
    } else {
        stats::refresh_document(&mut doc, now);
        storage.write(&path, &doc.serialize())?;
        info!(book = %book.title, added, ?status, path = %path.display(), "Synced book");
        status
    };

    Ok(SyncOutcome {
        book_title: book.title.clone(),
        path,
        added,
        status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap()
    }

    fn dune() -> Book {
        Book::new("dune-id", "Dune").with_author("Frank Herbert")
    }

    fn record(id: &str, text: &str) -> HighlightRecord {
        HighlightRecord::new(id, text, now(), "dune-id")
    }

    fn folder() -> &'static Path {
        Path::new("Highlights")
    }

    const SCENARIO_A: &str = "---
title: Dune
author: Frank Herbert
book_id: dune-id
created: 2024-05-01
highlights_total: 2
insights_created: 0
stats_updated: 2024-05-01T12:30:00Z
---

# Dune

> [!quote]
> <!-- highlight-id: b1 -->
> Fear is the mind-killer.
- [ ] memo:

> [!quote]
> <!-- highlight-id: b2 -->
> I must not fear.
> **Note:** litany
- [ ] memo:
";

    fn scenario_records() -> Vec<HighlightRecord> {
        vec![
            record("b1", "Fear is the mind-killer."),
            record("b2", "I must not fear.").with_note("litany"),
        ]
    }

    #[test]
    fn test_first_sync_creates_document() {
        let mut storage = MemoryStorage::new();

        let outcome =
            sync_book(&mut storage, folder(), &dune(), &scenario_records(), now()).unwrap();

        assert_eq!(outcome.status, SyncStatus::Created);
        assert_eq!(outcome.added, 2);
        assert_eq!(outcome.path, PathBuf::from("Highlights/Dune.md"));
        assert_eq!(storage.read(&outcome.path).unwrap(), SCENARIO_A);
    }

    #[test]
    fn test_resync_is_a_no_op() {
        let mut storage = MemoryStorage::new();
        sync_book(&mut storage, folder(), &dune(), &scenario_records(), now()).unwrap();
        let writes = storage.write_count();

        let later = now() + chrono::Duration::days(3);
        let outcome =
            sync_book(&mut storage, folder(), &dune(), &scenario_records(), later).unwrap();

        assert_eq!(outcome.status, SyncStatus::Unchanged);
        assert_eq!(outcome.added, 0);
        assert_eq!(storage.write_count(), writes);
        assert_eq!(storage.read(&outcome.path).unwrap(), SCENARIO_A);
    }

    #[test]
    fn test_incremental_sync_appends_after_user_edits() {
        let mut storage = MemoryStorage::new();
        let path = PathBuf::from("Highlights/Dune.md");
        storage.create_container(folder()).unwrap();
        let edited = SCENARIO_A.replacen("- [ ] memo:\n", "- [ ] memo: about fear\n", 1);
        storage.write(&path, &edited).unwrap();

        let mut records = scenario_records();
        records.push(record("b3", "Fear is the little-death."));
        let outcome = sync_book(&mut storage, folder(), &dune(), &records, now()).unwrap();

        assert_eq!(outcome.status, SyncStatus::Appended);
        assert_eq!(outcome.added, 1);

        let text = storage.read(&path).unwrap();
        let edited_body = edited.split("---\n").nth(2).unwrap();
        assert!(text.contains(edited_body));
        assert!(text.ends_with(
            "- [ ] memo:\n\n> [!quote]\n> <!-- highlight-id: b3 -->\n> Fear is the little-death.\n- [ ] memo:\n"
        ));
        assert!(text.contains("highlights_total: 3\n"));
    }

    #[test]
    fn test_first_writer_wins() {
        let mut doc = Document::parse(SCENARIO_A);
        let records = vec![
            record("b1", "Rewritten text"),
            record("b9", "new"),
            record("b9", "duplicate in same batch"),
        ];

        assert_eq!(merge_records(&mut doc, &records), 1);

        let text = doc.serialize();
        assert!(text.contains("> Fear is the mind-killer."));
        assert!(!text.contains("Rewritten text"));
        assert!(text.contains("> new\n"));
        assert!(!text.contains("duplicate in same batch"));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut doc = Document::parse(SCENARIO_A);
        let before = doc.serialize();

        assert_eq!(merge_records(&mut doc, &scenario_records()), 0);
        assert_eq!(doc.serialize(), before);
    }

    #[test]
    fn test_header_only_document_for_book_without_highlights() {
        let mut storage = MemoryStorage::new();
        let book = Book::new("anathem-id", "Anathem");

        let outcome = sync_book(&mut storage, folder(), &book, &[], now()).unwrap();

        assert_eq!(outcome.status, SyncStatus::Created);
        assert_eq!(outcome.added, 0);
        let text = storage.read(&outcome.path).unwrap();
        assert!(text.contains("highlights_total: 0\ninsights_created: 0\n"));
        assert!(text.ends_with("---\n\n# Anathem\n"));
        assert!(!text.contains("author:"));
    }

    #[test]
    fn test_title_needing_quotes_in_header() {
        let book = Book::new("id", "Dune: Messiah");
        let doc = new_book_document(&book, now().date_naive());

        let header = doc.header().unwrap();
        assert_eq!(header.lines()[0], "title: \"Dune: Messiah\"");
        assert_eq!(header.get("title").as_deref(), Some("Dune: Messiah"));
        assert_eq!(book_note_name(&book), "Dune Messiah");
    }

    #[test]
    fn test_book_note_name_fallbacks() {
        assert_eq!(book_note_name(&Book::new("vol-1", "???")), "vol-1");
        assert_eq!(book_note_name(&Book::new("///", "???")), UNTITLED);
    }

    #[test]
    fn test_write_failure_is_reported() {
        let mut storage = MemoryStorage::new();
        storage.deny_writes_to("Highlights/Dune.md");

        let err = sync_book(&mut storage, folder(), &dune(), &scenario_records(), now())
            .unwrap_err();
        assert!(err.to_string().contains("Permission denied"));
    }
}
