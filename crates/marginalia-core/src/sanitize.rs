//! Note names and storage paths
//!
//! Titles coming from books and memos become file names inside the vault,
//! so they are stripped of path-unsafe and link-breaking characters.

use std::path::{Path, PathBuf};

/// Maximum length of a note name, in characters
pub const MAX_TITLE_CHARS: usize = 100;

/// Markdown file extension for notes
pub const NOTE_EXTENSION: &str = "md";

const UNSAFE_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|', '#', '^', '[', ']'];

/// Turn arbitrary text into a note name
///
/// Strips path-unsafe characters, collapses whitespace and caps the
/// length. Leading dots are removed so a title can never produce a hidden
/// file. May return an empty string.
pub fn sanitize_title(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if UNSAFE_CHARS.contains(&c) || c.is_control() {
                ' '
            } else {
                c
            }
        })
        .collect();

    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    let capped: String = collapsed
        .trim_start_matches('.')
        .chars()
        .take(MAX_TITLE_CHARS)
        .collect();
    capped.trim().trim_end_matches('.').trim_end().to_string()
}

/// Path of a note named `name` inside `folder`
pub fn note_path(folder: &Path, name: &str) -> PathBuf {
    folder.join(format!("{}.{}", name, NOTE_EXTENSION))
}

/// Note name of a stored document (its file stem)
pub fn note_name(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
}
