//! Block variants of a book document
//!
//! Each block keeps the exact lines it was parsed from, so rendering an
//! untouched block reproduces the input byte-for-byte. Blocks built by
//! this crate start out with canonical lines from [`super::format`].

use crate::models::HighlightRecord;

use super::format;

/// One unit of a document
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// Frontmatter region
    Header(HeaderBlock),
    /// An imported highlight (quote run)
    Highlight(HighlightBlock),
    /// Memo slot following a highlight
    Memo(MemoLine),
    /// Reference to an extracted insight note
    InsightLink(InsightLinkLine),
    /// Any other line, preserved verbatim
    Text(String),
}

impl Block {
    /// Render the block back to its lines
    pub fn render(&self, out: &mut Vec<String>) {
        match self {
            Block::Header(header) => {
                out.push(header.open.clone());
                out.extend(header.lines.iter().cloned());
                out.push(header.close.clone());
            }
            Block::Highlight(highlight) => out.extend(highlight.lines.iter().cloned()),
            Block::Memo(memo) => out.push(memo.raw.clone()),
            Block::InsightLink(link) => out.push(link.raw.clone()),
            Block::Text(line) => out.push(line.clone()),
        }
    }

    /// End every line with `\r`, for blocks added to a CRLF document
    pub(crate) fn use_crlf(&mut self) {
        match self {
            Block::Header(header) => {
                crlf(&mut header.open);
                header.lines.iter_mut().for_each(crlf);
                crlf(&mut header.close);
            }
            Block::Highlight(highlight) => highlight.lines.iter_mut().for_each(crlf),
            Block::Memo(memo) => crlf(&mut memo.raw),
            Block::InsightLink(link) => crlf(&mut link.raw),
            Block::Text(line) => crlf(line),
        }
    }

    pub fn as_highlight(&self) -> Option<&HighlightBlock> {
        match self {
            Block::Highlight(highlight) => Some(highlight),
            _ => None,
        }
    }
}

fn crlf(line: &mut String) {
    if !line.ends_with('\r') {
        line.push('\r');
    }
}

/// Frontmatter key/value region
///
/// Lines are kept as written, delimiters included; only keys touched
/// through [`HeaderBlock::set`] are rewritten.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderBlock {
    open: String,
    lines: Vec<String>,
    close: String,
}

impl Default for HeaderBlock {
    fn default() -> Self {
        Self::from_lines(Vec::new())
    }
}

impl HeaderBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_lines(lines: Vec<String>) -> Self {
        Self::from_parts(
            format::FRONTMATTER_DELIMITER.to_string(),
            lines,
            format::FRONTMATTER_DELIMITER.to_string(),
        )
    }

    /// Header parsed with its delimiter lines exactly as written
    pub(crate) fn from_parts(open: String, lines: Vec<String>, close: String) -> Self {
        Self { open, lines, close }
    }

    /// Look up a value by key, unquoting JSON-style quoted strings
    pub fn get(&self, key: &str) -> Option<String> {
        self.lines.iter().find_map(|line| {
            let value = value_for(line, key)?;
            if value.starts_with('"') {
                serde_json::from_str::<String>(value).ok()
            } else {
                Some(value.to_string())
            }
        })
    }

    /// Set a key, replacing the existing line or appending a new one
    ///
    /// The new line takes the line ending of the one it replaces, or of
    /// the closing delimiter when appended.
    pub fn set(&mut self, key: &str, value: &str) {
        let mut line = format!("{}: {}", key, quote_if_needed(value));
        match self
            .lines
            .iter()
            .position(|existing| value_for(existing, key).is_some())
        {
            Some(pos) => {
                if self.lines[pos].ends_with('\r') {
                    line.push('\r');
                }
                self.lines[pos] = line;
            }
            None => {
                if self.close.ends_with('\r') {
                    line.push('\r');
                }
                self.lines.push(line);
            }
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

fn value_for<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    line.strip_prefix(key)?.strip_prefix(':').map(str::trim)
}

/// Quote values that would not survive as plain YAML scalars
fn quote_if_needed(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value.contains(": ")
        || value.contains(" #")
        || value.starts_with(|c: char| "[]{}&*!|>'\"%@`#,?-".contains(c))
        || value.trim() != value;
    if needs_quotes {
        serde_json::Value::String(value.to_string()).to_string()
    } else {
        value.to_string()
    }
}

/// An imported highlight: the quote run from opener to last `>` line
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightBlock {
    lines: Vec<String>,
    record_id: Option<String>,
    quoted: Vec<String>,
    source_note: Option<String>,
}

impl HighlightBlock {
    /// Render a fetched record in canonical form
    pub fn from_record(record: &HighlightRecord) -> Self {
        let mut lines = vec![
            format::QUOTE_OPENER.to_string(),
            format::render_marker(&record.id),
        ];
        let quoted: Vec<String> = record.text.lines().map(str::to_string).collect();
        lines.extend(quoted.iter().map(|line| format::render_quote_line(line)));
        if let Some(ref note) = record.note {
            lines.push(format::render_annotation(note));
        }

        Self {
            lines,
            record_id: Some(record.id.clone()),
            quoted,
            source_note: record.note.clone(),
        }
    }

    /// Interpret a quote run that starts with the opener line
    pub(crate) fn from_lines(lines: Vec<String>) -> Self {
        let mut record_id = None;
        let mut quoted = Vec::new();
        let mut source_note = None;

        for line in lines.iter().skip(1) {
            if let Some(id) = format::parse_marker(line) {
                if record_id.is_none() {
                    record_id = Some(id.to_string());
                }
            } else if let Some(note) = format::parse_annotation(line) {
                source_note = Some(note.to_string());
            } else if !format::is_quote_opener(line) {
                quoted.push(format::quoted_content(line).to_string());
            }
        }

        Self {
            lines,
            record_id,
            quoted,
            source_note,
        }
    }

    /// Stable record identifier from the marker comment
    pub fn record_id(&self) -> Option<&str> {
        self.record_id.as_deref()
    }

    /// Quoted passage without the callout title, marker or annotation
    ///
    /// Leading and trailing blank quote lines are dropped.
    pub fn quoted_text(&self) -> String {
        let start = self.quoted.iter().position(|l| !l.trim().is_empty());
        let end = self.quoted.iter().rposition(|l| !l.trim().is_empty());
        match (start, end) {
            (Some(start), Some(end)) => self.quoted[start..=end].join("\n"),
            _ => String::new(),
        }
    }

    pub fn source_note(&self) -> Option<&str> {
        self.source_note.as_deref()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

/// Which memo syntax a line uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoLayout {
    /// `- [ ] memo: text`; the checkbox state is not significant
    Keyword,
    /// `- [x] label`; only a checked box marks the label as a memo
    Label,
}

/// Memo state as seen by the extraction engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoState<'a> {
    Empty,
    Filled(&'a str),
}

/// The user-editable slot after a highlight
#[derive(Debug, Clone, PartialEq)]
pub struct MemoLine {
    raw: String,
    checked: bool,
    layout: MemoLayout,
    text: String,
}

impl MemoLine {
    /// Empty placeholder: checkbox + keyword + nothing
    pub fn empty() -> Self {
        Self::filled("")
    }

    pub fn filled(text: &str) -> Self {
        let text = text.trim();
        Self {
            raw: format::render_memo(Some(text)),
            checked: false,
            layout: MemoLayout::Keyword,
            text: text.to_string(),
        }
    }

    /// Recognize a memo line in either layout
    pub fn parse(line: &str) -> Option<Self> {
        let (checked, label) = format::parse_checkbox(line)?;
        let (layout, text) = match label.strip_prefix(format::MEMO_KEYWORD) {
            Some(rest) => (MemoLayout::Keyword, rest.trim()),
            None => (MemoLayout::Label, label.trim()),
        };
        Some(Self {
            raw: line.to_string(),
            checked,
            layout,
            text: strip_placeholder(text).to_string(),
        })
    }

    pub fn state(&self) -> MemoState<'_> {
        let filled = match self.layout {
            MemoLayout::Keyword => !self.text.is_empty(),
            MemoLayout::Label => self.checked && !self.text.is_empty(),
        };
        if filled {
            MemoState::Filled(&self.text)
        } else {
            MemoState::Empty
        }
    }

    pub fn layout(&self) -> MemoLayout {
        self.layout
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }
}

/// Drop repeated placeholder keywords a user may have left in the memo
fn strip_placeholder(mut text: &str) -> &str {
    while let Some(rest) = text.strip_prefix(format::MEMO_KEYWORD) {
        text = rest.trim_start();
    }
    text
}

/// Terminal reference to the note a memo was promoted into
#[derive(Debug, Clone, PartialEq)]
pub struct InsightLinkLine {
    raw: String,
    target: String,
}

impl InsightLinkLine {
    pub fn new(target: impl Into<String>) -> Self {
        let target = target.into();
        Self {
            raw: format::render_insight_link(&target),
            target,
        }
    }

    pub fn parse(line: &str) -> Option<Self> {
        format::parse_insight_link(line).map(|target| Self {
            raw: line.to_string(),
            target: target.to_string(),
        })
    }

    /// Name of the linked note
    pub fn target(&self) -> &str {
        &self.target
    }
}
