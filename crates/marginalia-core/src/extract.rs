//! Promoting annotated highlights into insight notes
//!
//! A highlight whose memo carries text is *annotated*. Extraction writes
//! one insight note per annotated highlight and swaps the memo for an
//! `- insight:: [[note]]` reference, which is terminal: an extracted
//! highlight is never picked up again.
//!
//! Candidates are independent. A note that already exists counts as
//! success and gets linked; a note that cannot be written is reported,
//! and the link is written anyway so the intent is not lost.

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::document::{
    format, Block, BlockId, ControlLine, Document, HeaderBlock, HighlightState, InsightLinkLine,
};
use crate::models::InsightNote;
use crate::sanitize::{note_name, note_path, sanitize_title};
use crate::stats;
use crate::storage::{DocumentStorage, StorageError, StorageResult};

/// A candidate whose note could not be written
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionFailure {
    pub title: String,
    pub error: String,
}

/// Outcome of one extraction pass over a book document
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractionReport {
    /// Book note the highlights came from
    pub source: String,
    /// Notes written by this pass
    pub created: Vec<String>,
    /// Notes that already existed and were linked
    pub linked: Vec<String>,
    /// Annotated highlights left alone (empty title or empty quote)
    pub skipped: usize,
    /// Notes that failed to write; their links were still added
    pub failures: Vec<ExtractionFailure>,
}

impl ExtractionReport {
    /// Number of insight links written into the book document
    pub fn links_written(&self) -> usize {
        self.created.len() + self.linked.len() + self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links_written() == 0 && self.skipped == 0
    }
}

struct Candidate {
    id: BlockId,
    title: String,
    quoted_text: String,
    record_id: Option<String>,
}

/// Extract every annotated highlight of `doc` into `insights_folder`
///
/// Rewrites `doc` in memory; the caller persists it. Candidates are
/// handled from the end of the document backwards, so when two memos
/// sanitize to the same title the later one creates the note and the
/// earlier one links to it.
pub fn extract_insights<S: DocumentStorage>(
    doc: &mut Document,
    book_note_name: &str,
    storage: &mut S,
    insights_folder: &Path,
    today: NaiveDate,
) -> ExtractionReport {
    let mut report = ExtractionReport {
        source: book_note_name.to_string(),
        ..Default::default()
    };

    let candidates: Vec<Candidate> = doc
        .find_highlight_blocks(|entry| entry.state() == HighlightState::Annotated)
        .into_iter()
        .filter_map(|entry| {
            Some(Candidate {
                id: entry.id,
                title: sanitize_title(entry.candidate_title()?),
                quoted_text: entry.highlight.quoted_text(),
                record_id: entry.highlight.record_id().map(str::to_string),
            })
        })
        .collect();

    for candidate in candidates.into_iter().rev() {
        if candidate.title.is_empty() {
            debug!(block = %candidate.id, "Memo has no usable title; skipping");
            report.skipped += 1;
            continue;
        }
        if candidate.quoted_text.is_empty() {
            debug!(title = %candidate.title, "Highlight has no quoted text; skipping");
            report.skipped += 1;
            continue;
        }

        let note = InsightNote {
            title: candidate.title.clone(),
            quoted_text: candidate.quoted_text,
            source_book_title: book_note_name.to_string(),
            source_record_id: candidate.record_id,
            created_at: today,
        };

        match write_note(storage, insights_folder, &note) {
            Ok(true) => {
                debug!(title = %note.title, "Created insight note");
                report.created.push(note.title.clone());
            }
            Ok(false) => {
                debug!(title = %note.title, "Insight note exists; linking");
                report.linked.push(note.title.clone());
            }
            Err(e) => {
                warn!(title = %note.title, error = %e, "Failed to write insight note");
                report.failures.push(ExtractionFailure {
                    title: note.title.clone(),
                    error: e.to_string(),
                });
            }
        }

        let link = ControlLine::InsightLink(InsightLinkLine::new(&note.title));
        if let Err(e) = doc.replace_adjacent_line(candidate.id, link) {
            warn!(title = %note.title, error = %e, "Failed to link insight note");
        }
    }

    report
}

/// Create a note unless one with that name exists; `Ok(false)` means it did
fn write_note<S: DocumentStorage>(
    storage: &mut S,
    folder: &Path,
    note: &InsightNote,
) -> StorageResult<bool> {
    let path = note_path(folder, &note.title);
    storage.create_container(folder)?;
    match storage.create(&path, &render_insight_note(note)) {
        Ok(()) => Ok(true),
        Err(e) if e.is_conflict() => Ok(false),
        Err(e) => Err(e),
    }
}

/// Render an insight note: frontmatter, heading, quotation, back-reference
pub fn render_insight_note(note: &InsightNote) -> String {
    let backlink = format!("[[{}]]", note.source_book_title);

    let mut header = HeaderBlock::new();
    header.set(format::keys::TITLE, &note.title);
    header.set(format::keys::SOURCE, &backlink);
    if let Some(ref id) = note.source_record_id {
        header.set(format::keys::SOURCE_HIGHLIGHT, id);
    }
    header.set(
        format::keys::CREATED,
        &note.created_at.format("%Y-%m-%d").to_string(),
    );

    let mut lines = vec![String::new(), format!("# {}", note.title), String::new()];
    lines.extend(note.quoted_text.lines().map(format::render_quote_line));
    lines.push(String::new());
    lines.push(format!("Source: {}", backlink));

    let mut doc = Document::with_header(header);
    doc.append_blocks(lines.into_iter().map(Block::Text));
    doc.serialize()
}

/// Run extraction on a stored book document
///
/// Reads the document, extracts, refreshes the stats cache and writes
/// the document back once. A document without annotated highlights is
/// not written.
pub fn extract_book<S: DocumentStorage>(
    storage: &mut S,
    path: &Path,
    insights_folder: &Path,
    now: DateTime<Utc>,
) -> StorageResult<ExtractionReport> {
    let mut doc = Document::parse(&storage.read(path)?);
    let name = note_name(path).ok_or_else(|| StorageError::NotFound {
        path: path.to_path_buf(),
    })?;

    let report = extract_insights(&mut doc, &name, storage, insights_folder, now.date_naive());
    if report.links_written() == 0 {
        info!(book = %name, "No annotated highlights");
        return Ok(report);
    }

    stats::refresh_document(&mut doc, now);
    storage.write(path, &doc.serialize())?;
    info!(
        book = %name,
        created = report.created.len(),
        linked = report.linked.len(),
        failed = report.failures.len(),
        "Extracted insights"
    );
    Ok(report)
}
