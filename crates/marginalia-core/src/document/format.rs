//! Line-level syntax of book documents
//!
//! Every marker here is an exact-match contract: other tooling (and
//! previously written vaults) depend on these spellings.

use std::sync::OnceLock;

use regex::Regex;

/// Frontmatter delimiter
pub const FRONTMATTER_DELIMITER: &str = "---";

/// Opening line of a highlight's quote run
pub const QUOTE_OPENER: &str = "> [!quote]";

/// Prefix shared by every line of a quote run
pub const QUOTE_PREFIX: char = '>';

/// Leads quoted text that would otherwise read as block syntax
pub const QUOTE_ESCAPE: char = '\\';

/// Keyword that introduces memo text after the checkbox
pub const MEMO_KEYWORD: &str = "memo:";

/// Header keys written by this crate
pub mod keys {
    pub const TITLE: &str = "title";
    pub const AUTHOR: &str = "author";
    pub const BOOK_ID: &str = "book_id";
    pub const CREATED: &str = "created";
    pub const HIGHLIGHTS_TOTAL: &str = "highlights_total";
    pub const INSIGHTS_CREATED: &str = "insights_created";
    pub const STATS_UPDATED: &str = "stats_updated";
    pub const SOURCE: &str = "source";
    pub const SOURCE_HIGHLIGHT: &str = "source_highlight";
}

fn marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^>\s*<!--\s*highlight-id:\s*(.+?)\s*-->\s*$").expect("valid marker regex")
    })
}

fn annotation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^>\s*\*\*Note:\*\*\s?(.*)$").expect("valid annotation regex"))
}

fn checkbox_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^- \[([ xX])\](?: (.*?))?\s*$").expect("valid checkbox regex"))
}

fn insight_link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^- insight:: \[\[([^\]]+)\]\]\s*$").expect("valid insight link regex")
    })
}

/// Whether a line opens a highlight block
pub fn is_quote_opener(line: &str) -> bool {
    line.trim_end() == QUOTE_OPENER
}

/// Whether a line continues a quote run
pub fn is_quote_line(line: &str) -> bool {
    line.starts_with(QUOTE_PREFIX)
}

/// Record id carried by a marker comment line
pub fn parse_marker(line: &str) -> Option<&str> {
    marker_re()
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Annotation text carried by an annotation line
pub fn parse_annotation(line: &str) -> Option<&str> {
    annotation_re()
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

/// Checkbox state and label of a task line
pub fn parse_checkbox(line: &str) -> Option<(bool, &str)> {
    let caps = checkbox_re().captures(line)?;
    let checked = caps.get(1).map(|m| m.as_str() != " ").unwrap_or(false);
    let label = caps.get(2).map(|m| m.as_str()).unwrap_or("");
    Some((checked, label))
}

/// Target note name of an insight reference line
pub fn parse_insight_link(line: &str) -> Option<&str> {
    insight_link_re()
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Strip the quote prefix (and one following space) from a quote line
pub fn strip_quote(line: &str) -> &str {
    let rest = line.strip_prefix(QUOTE_PREFIX).unwrap_or(line);
    rest.strip_prefix(' ').unwrap_or(rest)
}

pub fn render_marker(record_id: &str) -> String {
    format!("> <!-- highlight-id: {} -->", record_id)
}

pub fn render_annotation(note: &str) -> String {
    format!("> **Note:** {}", note)
}

/// Quoted text as recorded, with the escape undone
pub fn quoted_content(line: &str) -> &str {
    let text = strip_quote(line);
    text.strip_prefix(QUOTE_ESCAPE).unwrap_or(text)
}

/// Render one line of quoted text
///
/// Text that would parse as an opener, marker or annotation (or that
/// starts with the escape itself) gets a leading `\`, which Markdown
/// renders away.
pub fn render_quote_line(text: &str) -> String {
    if text.is_empty() {
        return QUOTE_PREFIX.to_string();
    }
    let line = format!("> {}", text);
    let collides = text.starts_with(QUOTE_ESCAPE)
        || is_quote_opener(&line)
        || parse_marker(&line).is_some()
        || parse_annotation(&line).is_some();
    if collides {
        format!("> {}{}", QUOTE_ESCAPE, text)
    } else {
        line
    }
}

pub fn render_memo(text: Option<&str>) -> String {
    match text {
        Some(text) if !text.is_empty() => format!("- [ ] {} {}", MEMO_KEYWORD, text),
        _ => format!("- [ ] {}", MEMO_KEYWORD),
    }
}

pub fn render_insight_link(target: &str) -> String {
    format!("- insight:: [[{}]]", target)
}
