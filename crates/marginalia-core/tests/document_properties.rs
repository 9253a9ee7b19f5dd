//! Property tests for the book document model and the engines built on it
//!
//! Properties:
//! - parse → serialize reproduces any document (LF or CRLF) up to the
//!   trailing-whitespace normalization at the very end
//! - cached stats always equal a count of the parsed blocks
//! - merging records is idempotent and never duplicates a record id
//! - extraction only ever moves highlights forward and is a no-op when run again

use std::path::Path;

use chrono::{NaiveDate, TimeZone, Utc};
use marginalia_core::document::{Block, HighlightState};
use marginalia_core::extract::extract_insights;
use marginalia_core::stats::compute_stats;
use marginalia_core::sync::merge_records;
use marginalia_core::{Document, DocumentStorage, HighlightRecord, MemoryStorage};
use proptest::prelude::*;

// ============================================================================
// GENERATORS
// ============================================================================

/// A `>` line: openers, markers, annotations and quoted text
fn arb_quote_line() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("> [!quote]".to_string()),
        Just("> [!quote]  ".to_string()),
        "[a-d][0-9]".prop_map(|id| format!("> <!-- highlight-id: {} -->", id)),
        "[a-z ]{0,10}".prop_map(|note| format!("> **Note:** {}", note)),
        Just(">".to_string()),
        "[a-zA-Z !*<>\\[\\]\\\\-]{0,16}".prop_map(|text| format!("> {}", text)),
    ]
}

/// Memo, label and insight lines, frontmatter pieces and free text
fn arb_other_line() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("---".to_string()),
        Just("--- ".to_string()),
        ("[ xX]", "[a-z ]{0,10}").prop_map(|(mark, memo)| format!("- [{}] memo: {}", mark, memo)),
        ("[ x]", "[a-z]{1,8}").prop_map(|(mark, label)| format!("- [{}] {}", mark, label)),
        "[a-z][a-z ]{0,8}".prop_map(|target| format!("- insight:: [[{}]]", target)),
        "[a-z]{1,8}: [a-z0-9]{0,6}",
        Just(String::new()),
        "[a-zA-Z #>*:\\[\\]!-]{0,20}",
    ]
}

/// One line of a book document, biased towards the block syntax
fn arb_line() -> impl Strategy<Value = String> {
    prop_oneof![arb_quote_line(), arb_other_line()]
}

/// Document text with uniform line endings
fn arb_document() -> impl Strategy<Value = (String, bool)> {
    (
        prop::collection::vec(arb_line(), 0..30),
        any::<bool>(),
        0usize..3,
    )
        .prop_map(|(lines, crlf, trailing_blanks)| {
            let eol = if crlf { "\r\n" } else { "\n" };
            let mut text = String::new();
            for line in &lines {
                text.push_str(line);
                text.push_str(eol);
            }
            text.push_str(&eol.repeat(trailing_blanks));
            (text, crlf)
        })
}

/// Highlight text, including passages that look like block syntax
fn arb_highlight_text() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z][a-zA-Z .,!?'*:<>\\[\\]-]{0,30}",
        Just("[!quote]".to_string()),
        Just("**Note:** the author says".to_string()),
        Just("<!-- highlight-id: zz -->".to_string()),
        Just("\\leading backslash".to_string()),
        Just("> nested quote".to_string()),
    ]
}

fn arb_records() -> impl Strategy<Value = Vec<HighlightRecord>> {
    prop::collection::vec(("[a-d][0-9]", arb_highlight_text()), 0..12).prop_map(|pairs| {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        pairs
            .into_iter()
            .map(|(id, text)| HighlightRecord::new(id, &text, created, "dune-id"))
            .collect()
    })
}

// ============================================================================
// HELPERS
// ============================================================================

fn normalized(text: &str, crlf: bool) -> String {
    let trimmed = text.trim_end();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}{}", trimmed, if crlf { "\r\n" } else { "\n" })
    }
}

fn count_highlights_with_id(doc: &Document, id: &str) -> usize {
    doc.highlights()
        .iter()
        .filter(|entry| entry.highlight.record_id() == Some(id))
        .count()
}

fn count_state(doc: &Document, state: HighlightState) -> usize {
    doc.highlights()
        .iter()
        .filter(|entry| entry.state() == state)
        .count()
}

// ============================================================================
// PROPERTIES
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_round_trip_reproduces_document((text, crlf) in arb_document()) {
        let doc = Document::parse(&text);
        let serialized = doc.serialize();

        prop_assert_eq!(&serialized, &normalized(&text, crlf));
        prop_assert_eq!(Document::parse(&serialized).serialize(), serialized);
    }

    #[test]
    fn prop_stats_match_parsed_blocks((text, _crlf) in arb_document()) {
        let doc = Document::parse(&text);
        let stats = compute_stats(&doc.body());

        let links = doc
            .blocks()
            .filter(|(_, block)| matches!(block, Block::InsightLink(_)))
            .count();
        prop_assert_eq!(stats.highlights_total, doc.highlights().len());
        prop_assert_eq!(stats.insights_created, links);
    }

    #[test]
    fn prop_merge_is_idempotent_and_first_writer_wins(
        (text, crlf) in arb_document(),
        records in arb_records(),
    ) {
        let base = Document::parse(&text);
        let mut doc = base.clone();
        let added = merge_records(&mut doc, &records);
        let merged = doc.serialize();

        // Every input id is present exactly once unless the base already carried it
        let mut ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        let new_ids = ids
            .iter()
            .filter(|id| count_highlights_with_id(&base, id) == 0)
            .count();
        prop_assert_eq!(added, new_ids);

        let mut reparsed = Document::parse(&merged);
        for id in &ids {
            let before = count_highlights_with_id(&base, id);
            prop_assert_eq!(count_highlights_with_id(&reparsed, id), before.max(1));
        }

        let stats = compute_stats(&reparsed.body());
        prop_assert_eq!(stats.highlights_total, base.highlights().len() + added);

        prop_assert_eq!(merge_records(&mut reparsed, &records), 0);
        prop_assert_eq!(reparsed.serialize(), merged.clone());

        if crlf && !text.is_empty() {
            prop_assert_eq!(merged.matches('\n').count(), merged.matches("\r\n").count());
        }
    }

    #[test]
    fn prop_extraction_is_monotonic((text, _crlf) in arb_document()) {
        let mut doc = Document::parse(&text);
        let extracted_before = count_state(&doc, HighlightState::Extracted);
        let annotated_before = count_state(&doc, HighlightState::Annotated);
        let links_before = compute_stats(&doc.body()).insights_created;

        let mut storage = MemoryStorage::new();
        let insights = Path::new("Insights");
        let today = NaiveDate::from_ymd_opt(2024, 6, 2).unwrap();

        let report = extract_insights(&mut doc, "Dune", &mut storage, insights, today);

        prop_assert_eq!(report.links_written() + report.skipped, annotated_before);
        prop_assert_eq!(
            count_state(&doc, HighlightState::Extracted),
            extracted_before + report.links_written()
        );
        prop_assert_eq!(
            compute_stats(&doc.body()).insights_created,
            links_before + report.links_written()
        );
        for title in &report.created {
            let insight_path = insights.join(format!("{}.md", title));
            prop_assert!(storage.exists(&insight_path));
        }

        let serialized = doc.serialize();
        let mut again = Document::parse(&serialized);
        let second = extract_insights(&mut again, "Dune", &mut storage, insights, today);
        prop_assert_eq!(second.links_written(), 0);
        prop_assert_eq!(again.serialize(), serialized);
    }
}
