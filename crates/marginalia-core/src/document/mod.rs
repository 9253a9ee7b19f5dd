//! Book document model
//!
//! A book document is parsed into typed blocks stored in an arena, with a
//! separate order list of [`BlockId`] handles. Handles stay valid across
//! mutations, so engines can collect positions first and rewrite later
//! without tracking line offsets.
//!
//! Parsing is tolerant: anything that is not a recognised block is kept
//! as a [`Block::Text`] line, and `serialize(parse(text))` reproduces the
//! input except for trailing whitespace at the very end. Documents whose
//! first line ends in CRLF keep CRLF for every line added later.

pub mod block;
pub mod format;

use std::collections::HashSet;
use std::fmt;

use thiserror::Error;

pub use block::{
    Block, HeaderBlock, HighlightBlock, InsightLinkLine, MemoLayout, MemoLine, MemoState,
};

/// Errors from block-level mutations
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DocumentError {
    #[error("Block {0} is not part of this document")]
    UnknownBlock(BlockId),

    #[error("Block {0} is not a highlight block")]
    NotAHighlight(BlockId),

    #[error("Highlight {0} was already extracted; its insight link cannot become a memo again")]
    InsightLinkIsTerminal(BlockId),
}

/// Stable handle to a block in a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(usize);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The line that follows a highlight's quote run
#[derive(Debug, Clone, PartialEq)]
pub enum ControlLine {
    Memo(MemoLine),
    InsightLink(InsightLinkLine),
}

impl From<ControlLine> for Block {
    fn from(line: ControlLine) -> Self {
        match line {
            ControlLine::Memo(memo) => Block::Memo(memo),
            ControlLine::InsightLink(link) => Block::InsightLink(link),
        }
    }
}

/// Lifecycle of a highlight block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightState {
    /// No memo text yet (or no memo line at all)
    Imported,
    /// Memo carries text; ready for extraction
    Annotated,
    /// Memo was replaced by an insight link
    Extracted,
}

/// A highlight block together with its control line
#[derive(Debug, Clone, Copy)]
pub struct HighlightEntry<'a> {
    pub id: BlockId,
    pub highlight: &'a HighlightBlock,
    pub control: Option<&'a Block>,
}

impl<'a> HighlightEntry<'a> {
    pub fn memo(&self) -> Option<&'a MemoLine> {
        match self.control {
            Some(Block::Memo(memo)) => Some(memo),
            _ => None,
        }
    }

    pub fn insight_link(&self) -> Option<&'a InsightLinkLine> {
        match self.control {
            Some(Block::InsightLink(link)) => Some(link),
            _ => None,
        }
    }

    pub fn state(&self) -> HighlightState {
        if self.insight_link().is_some() {
            return HighlightState::Extracted;
        }
        match self.memo().map(MemoLine::state) {
            Some(MemoState::Filled(_)) => HighlightState::Annotated,
            _ => HighlightState::Imported,
        }
    }

    /// Memo text to promote, if this highlight is annotated
    pub fn candidate_title(&self) -> Option<&'a str> {
        match self.memo()?.state() {
            MemoState::Filled(text) => Some(text),
            MemoState::Empty => None,
        }
    }
}

/// An ordered sequence of blocks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    arena: Vec<Block>,
    order: Vec<BlockId>,
    crlf: bool,
}

impl Document {
    /// Create an empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a document that starts with the given header
    pub fn with_header(header: HeaderBlock) -> Self {
        let mut doc = Self::new();
        doc.push(Block::Header(header));
        doc
    }

    /// Parse document text into blocks
    pub fn parse(text: &str) -> Self {
        let mut doc = Self {
            crlf: text
                .split_once('\n')
                .is_some_and(|(first, _)| first.ends_with('\r')),
            ..Self::default()
        };
        let trimmed = text.trim_end();
        if trimmed.is_empty() {
            return doc;
        }

        let lines: Vec<&str> = trimmed.split('\n').collect();
        let mut i = 0;

        if lines[0].trim_end() == format::FRONTMATTER_DELIMITER {
            if let Some(close) = lines[1..]
                .iter()
                .position(|line| line.trim_end() == format::FRONTMATTER_DELIMITER)
            {
                let close = close + 1;
                let header_lines = lines[1..close].iter().map(|s| s.to_string()).collect();
                doc.push(Block::Header(HeaderBlock::from_parts(
                    lines[0].to_string(),
                    header_lines,
                    lines[close].to_string(),
                )));
                i = close + 1;
            }
        }

        while i < lines.len() {
            let line = lines[i];

            if format::is_quote_opener(line) {
                let mut end = i + 1;
                while end < lines.len()
                    && format::is_quote_line(lines[end])
                    && !format::is_quote_opener(lines[end])
                {
                    end += 1;
                }
                let run = lines[i..end].iter().map(|s| s.to_string()).collect();
                doc.push(Block::Highlight(HighlightBlock::from_lines(run)));
                i = end;

                if let Some(memo) = lines.get(i).and_then(|next| MemoLine::parse(next)) {
                    doc.push(Block::Memo(memo));
                    i += 1;
                }
                continue;
            }

            let block = match InsightLinkLine::parse(line) {
                Some(link) => Block::InsightLink(link),
                None => Block::Text(line.to_string()),
            };
            doc.push(block);
            i += 1;
        }

        doc
    }

    /// Render the document back to text
    ///
    /// Trailing whitespace at the end is normalized to a single line
    /// terminator, CRLF for CRLF documents.
    pub fn serialize(&self) -> String {
        let lines = self.render_lines(self.order.iter());
        self.finish(lines)
    }

    /// Render everything except the header
    pub fn body(&self) -> String {
        let lines = self.render_lines(
            self.order
                .iter()
                .filter(|id| !matches!(self.arena[id.0], Block::Header(_))),
        );
        self.finish(lines)
    }

    fn finish(&self, lines: Vec<String>) -> String {
        let mut text = lines.join("\n");
        let trimmed_len = text.trim_end().len();
        text.truncate(trimmed_len);
        if !text.is_empty() {
            text.push_str(if self.crlf { "\r\n" } else { "\n" });
        }
        text
    }

    fn render_lines<'a>(&self, ids: impl Iterator<Item = &'a BlockId>) -> Vec<String> {
        let mut lines = Vec::new();
        for id in ids {
            self.arena[id.0].render(&mut lines);
        }
        lines
    }

    fn push(&mut self, block: Block) -> BlockId {
        let id = BlockId(self.arena.len());
        self.arena.push(block);
        self.order.push(id);
        id
    }

    /// Store a block built by this crate, matching the document's line endings
    fn alloc(&mut self, mut block: Block) -> BlockId {
        if self.crlf {
            block.use_crlf();
        }
        let id = BlockId(self.arena.len());
        self.arena.push(block);
        id
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Blocks in document order
    pub fn blocks(&self) -> impl Iterator<Item = (BlockId, &Block)> + '_ {
        self.order.iter().map(move |id| (*id, &self.arena[id.0]))
    }

    pub fn header(&self) -> Option<&HeaderBlock> {
        match self.order.first().map(|id| &self.arena[id.0]) {
            Some(Block::Header(header)) => Some(header),
            _ => None,
        }
    }

    /// Header of the document, inserting an empty one if missing
    pub fn header_mut(&mut self) -> &mut HeaderBlock {
        let has_header = matches!(
            self.order.first().map(|id| &self.arena[id.0]),
            Some(Block::Header(_))
        );
        if !has_header {
            let id = self.alloc(Block::Header(HeaderBlock::new()));
            self.order.insert(0, id);
        }

        let first = self.order[0];
        match &mut self.arena[first.0] {
            Block::Header(header) => header,
            _ => unreachable!("header was inserted at position 0"),
        }
    }

    /// Append blocks after the current end of the document
    pub fn append_blocks(&mut self, blocks: impl IntoIterator<Item = Block>) -> Vec<BlockId> {
        blocks
            .into_iter()
            .map(|block| {
                let id = self.alloc(block);
                self.order.push(id);
                id
            })
            .collect()
    }

    /// All highlight blocks, in document order, with their control lines
    pub fn highlights(&self) -> Vec<HighlightEntry<'_>> {
        self.find_highlight_blocks(|_| true)
    }

    /// Highlight blocks matching a predicate, in document order
    pub fn find_highlight_blocks<F>(&self, mut predicate: F) -> Vec<HighlightEntry<'_>>
    where
        F: FnMut(&HighlightEntry<'_>) -> bool,
    {
        let mut found = Vec::new();
        for (pos, id) in self.order.iter().enumerate() {
            let Block::Highlight(highlight) = &self.arena[id.0] else {
                continue;
            };
            let control = self
                .order
                .get(pos + 1)
                .map(|next| &self.arena[next.0])
                .filter(|block| matches!(block, Block::Memo(_) | Block::InsightLink(_)));
            let entry = HighlightEntry {
                id: *id,
                highlight,
                control,
            };
            if predicate(&entry) {
                found.push(entry);
            }
        }
        found
    }

    /// Record ids of every highlight block in the document
    pub fn record_ids(&self) -> HashSet<&str> {
        self.arena_in_order()
            .filter_map(Block::as_highlight)
            .filter_map(HighlightBlock::record_id)
            .collect()
    }

    fn arena_in_order(&self) -> impl Iterator<Item = &Block> + '_ {
        self.order.iter().map(move |id| &self.arena[id.0])
    }

    /// Replace the control line that follows a highlight
    ///
    /// If the highlight has no control line yet, the new line is inserted
    /// right after it. An insight link is terminal: replacing it with a
    /// memo fails with [`DocumentError::InsightLinkIsTerminal`].
    pub fn replace_adjacent_line(
        &mut self,
        highlight: BlockId,
        line: ControlLine,
    ) -> Result<(), DocumentError> {
        let pos = self
            .order
            .iter()
            .position(|id| *id == highlight)
            .ok_or(DocumentError::UnknownBlock(highlight))?;
        if !matches!(self.arena[highlight.0], Block::Highlight(_)) {
            return Err(DocumentError::NotAHighlight(highlight));
        }

        let next = self.order.get(pos + 1).copied();
        match next.map(|id| (id, &self.arena[id.0])) {
            Some((_, Block::InsightLink(_))) if matches!(line, ControlLine::Memo(_)) => {
                Err(DocumentError::InsightLinkIsTerminal(highlight))
            }
            Some((id, Block::Memo(_) | Block::InsightLink(_))) => {
                let mut block: Block = line.into();
                if self.crlf {
                    block.use_crlf();
                }
                self.arena[id.0] = block;
                Ok(())
            }
            _ => {
                let id = self.alloc(line.into());
                self.order.insert(pos + 1, id);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HighlightRecord;
    use chrono::Utc;

    const SAMPLE: &str = "---
title: Dune
highlights_total: 2
---

# Dune

> [!quote]
> <!-- highlight-id: b1 -->
> Fear is the mind-killer.
- [ ] memo: connects to X

> [!quote]
> <!-- highlight-id: b2 -->
> I must not fear.
> **Note:** litany
- insight:: [[Courage]]

Some freeform text the user wrote.
> a plain blockquote
";

    fn record(id: &str, text: &str) -> HighlightRecord {
        HighlightRecord::new(id, text, Utc::now(), "vol-1")
    }

    #[test]
    fn test_round_trip_is_byte_identical() {
        let doc = Document::parse(SAMPLE);
        assert_eq!(doc.serialize(), SAMPLE);
    }

    #[test]
    fn test_round_trip_normalizes_trailing_whitespace() {
        let doc = Document::parse("line one\nline two  \n\n\n");
        assert_eq!(doc.serialize(), "line one\nline two\n");
    }

    #[test]
    fn test_round_trip_preserves_unknown_shapes() {
        let text = "no header here\n---\n> [!quote]\n>\n- [ ] label line\n  indented\r\n- [x] done\n";
        assert_eq!(Document::parse(text).serialize(), text);
    }

    #[test]
    fn test_crlf_round_trip_is_byte_identical() {
        let text = SAMPLE.replace('\n', "\r\n");
        assert_eq!(Document::parse(&text).serialize(), text);

        let padded = "--- \r\ntitle: Dune\r\n---  \r\n\r\n# Dune\r\n";
        assert_eq!(Document::parse(padded).serialize(), padded);
    }

    #[test]
    fn test_crlf_document_stays_crlf_after_edits() {
        let text = SAMPLE.replace('\n', "\r\n");
        let mut doc = Document::parse(&text);
        doc.header_mut().set("highlights_total", "3");
        doc.append_blocks([
            Block::Text(String::new()),
            Block::Highlight(HighlightBlock::from_record(&record("b3", "new one"))),
            Block::Memo(MemoLine::empty()),
        ]);
        let first = doc.highlights()[0].id;
        doc.replace_adjacent_line(
            first,
            ControlLine::InsightLink(InsightLinkLine::new("connects to X")),
        )
        .unwrap();

        let out = doc.serialize();
        assert_eq!(out.matches('\n').count(), out.matches("\r\n").count());
        assert!(out.contains("highlights_total: 3\r\n"));
        assert!(out.contains("- insight:: [[connects to X]]\r\n"));
        assert!(out.ends_with("> new one\r\n- [ ] memo:\r\n"));
        assert_eq!(doc.highlights().len(), 3);
    }

    #[test]
    fn test_unclosed_frontmatter_is_text() {
        let text = "---\ntitle: x\n";
        let doc = Document::parse(text);
        assert!(doc.header().is_none());
        assert_eq!(doc.serialize(), text);
    }

    #[test]
    fn test_empty_document() {
        let doc = Document::parse("  \n\n");
        assert!(doc.is_empty());
        assert_eq!(doc.serialize(), "");
    }

    #[test]
    fn test_parse_blocks() {
        let doc = Document::parse(SAMPLE);
        assert_eq!(doc.header().unwrap().get("title").as_deref(), Some("Dune"));

        let highlights = doc.highlights();
        assert_eq!(highlights.len(), 2);

        assert_eq!(highlights[0].highlight.record_id(), Some("b1"));
        assert_eq!(highlights[0].state(), HighlightState::Annotated);
        assert_eq!(highlights[0].candidate_title(), Some("connects to X"));

        assert_eq!(highlights[1].highlight.record_id(), Some("b2"));
        assert_eq!(highlights[1].highlight.source_note(), Some("litany"));
        assert_eq!(highlights[1].state(), HighlightState::Extracted);
        assert_eq!(highlights[1].insight_link().unwrap().target(), "Courage");
    }

    #[test]
    fn test_adjacent_openers_split_blocks() {
        let text = "> [!quote]\n> <!-- highlight-id: a -->\n> one\n> [!quote]\n> <!-- highlight-id: b -->\n> two\n- [ ] memo:\n";
        let doc = Document::parse(text);
        let highlights = doc.highlights();
        assert_eq!(highlights.len(), 2);
        assert!(highlights[0].control.is_none());
        assert_eq!(highlights[1].state(), HighlightState::Imported);
        assert_eq!(doc.serialize(), text);
    }

    #[test]
    fn test_syntax_in_highlight_text_keeps_one_block() {
        let mut doc = Document::new();
        for (id, text) in [("b1", "[!quote]"), ("b2", "**Note:** the author says")] {
            doc.append_blocks([
                Block::Text(String::new()),
                Block::Highlight(HighlightBlock::from_record(&record(id, text))),
                Block::Memo(MemoLine::empty()),
            ]);
        }

        let reparsed = Document::parse(&doc.serialize());
        let highlights = reparsed.highlights();
        assert_eq!(highlights.len(), 2);
        assert_eq!(highlights[0].highlight.quoted_text(), "[!quote]");
        assert_eq!(
            highlights[1].highlight.quoted_text(),
            "**Note:** the author says"
        );
        assert!(highlights
            .iter()
            .all(|entry| entry.state() == HighlightState::Imported));
        assert_eq!(reparsed.serialize(), doc.serialize());
    }

    #[test]
    fn test_memo_line_away_from_highlight_is_text() {
        let doc = Document::parse("intro\n- [ ] memo: stray\n");
        assert!(doc
            .blocks()
            .all(|(_, block)| matches!(block, Block::Text(_))));
    }

    #[test]
    fn test_record_ids() {
        let doc = Document::parse(SAMPLE);
        let ids = doc.record_ids();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains("b1"));
        assert!(ids.contains("b2"));
    }

    #[test]
    fn test_append_blocks_goes_to_end() {
        let mut doc = Document::parse(SAMPLE);
        doc.append_blocks([
            Block::Text(String::new()),
            Block::Highlight(HighlightBlock::from_record(&record("b3", "new one"))),
            Block::Memo(MemoLine::empty()),
        ]);

        let text = doc.serialize();
        assert!(text.starts_with(SAMPLE));
        assert!(text.ends_with(
            "\n> [!quote]\n> <!-- highlight-id: b3 -->\n> new one\n- [ ] memo:\n"
        ));
    }

    #[test]
    fn test_replace_adjacent_memo_with_link() {
        let mut doc = Document::parse(SAMPLE);
        let target = doc.highlights()[0].id;

        doc.replace_adjacent_line(
            target,
            ControlLine::InsightLink(InsightLinkLine::new("connects to X")),
        )
        .unwrap();

        let text = doc.serialize();
        assert!(text.contains("> Fear is the mind-killer.\n- insight:: [[connects to X]]\n"));
        assert!(!text.contains("memo: connects to X"));
        assert_eq!(doc.highlights()[0].state(), HighlightState::Extracted);
    }

    #[test]
    fn test_insight_link_is_terminal() {
        let mut doc = Document::parse(SAMPLE);
        let extracted = doc.highlights()[1].id;
        let before = doc.serialize();

        let err = doc
            .replace_adjacent_line(extracted, ControlLine::Memo(MemoLine::filled("again")))
            .unwrap_err();
        assert_eq!(err, DocumentError::InsightLinkIsTerminal(extracted));
        assert_eq!(doc.serialize(), before);
    }

    #[test]
    fn test_replace_inserts_when_no_control_line() {
        let mut doc = Document::parse("> [!quote]\n> <!-- highlight-id: a -->\n> text\ntrailing\n");
        let id = doc.highlights()[0].id;
        doc.replace_adjacent_line(id, ControlLine::Memo(MemoLine::empty()))
            .unwrap();
        assert_eq!(
            doc.serialize(),
            "> [!quote]\n> <!-- highlight-id: a -->\n> text\n- [ ] memo:\ntrailing\n"
        );
    }

    #[test]
    fn test_replace_rejects_non_highlight() {
        let mut doc = Document::parse("just text\n");
        let (id, _) = doc.blocks().next().unwrap();
        let err = doc
            .replace_adjacent_line(id, ControlLine::Memo(MemoLine::empty()))
            .unwrap_err();
        assert_eq!(err, DocumentError::NotAHighlight(id));
    }

    #[test]
    fn test_handles_survive_insertions() {
        let mut doc = Document::parse(
            "> [!quote]\n> <!-- highlight-id: a -->\n> one\n\n> [!quote]\n> <!-- highlight-id: b -->\n> two\n- [ ] memo: later\n",
        );
        let ids: Vec<BlockId> = doc.highlights().iter().map(|e| e.id).collect();

        // Inserting after the first highlight must not disturb the second handle
        doc.replace_adjacent_line(ids[0], ControlLine::Memo(MemoLine::empty()))
            .unwrap();
        doc.replace_adjacent_line(ids[1], ControlLine::InsightLink(InsightLinkLine::new("later")))
            .unwrap();

        let highlights = doc.highlights();
        assert_eq!(highlights[0].state(), HighlightState::Imported);
        assert_eq!(highlights[1].insight_link().unwrap().target(), "later");
    }

    #[test]
    fn test_header_mut_inserts_header() {
        let mut doc = Document::parse("# Title\n");
        doc.header_mut().set("title", "Title");
        assert_eq!(doc.serialize(), "---\ntitle: Title\n---\n# Title\n");
        assert_eq!(doc.body(), "# Title\n");
    }
}
