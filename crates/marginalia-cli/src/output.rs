//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use serde::Serialize;

use marginalia_core::store::{
    BookFailure, BookListing, BookStats, ExtractReport, ImportReport, StatsReport,
};
use marginalia_core::{ExtractionReport, SyncStatus};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print the result of an import pass
    pub fn print_import(&self, report: &ImportReport) {
        match self.format {
            OutputFormat::Human => {
                if report.books.is_empty() && report.failures.is_empty() {
                    println!("No books to import.");
                    return;
                }
                for outcome in &report.books {
                    let detail = match outcome.status {
                        SyncStatus::Created => format!("created, {} highlight(s)", outcome.added),
                        SyncStatus::Appended => format!("+{} highlight(s)", outcome.added),
                        SyncStatus::Unchanged => "nothing to add".to_string(),
                    };
                    println!("{} | {}", truncate(&outcome.book_title, 45), detail);
                }
                print_failures(&report.failures);
                println!(
                    "\n{} new highlight(s) across {} book(s)",
                    report.added(),
                    report.books.len()
                );
            }
            OutputFormat::Json => print_json(report),
            OutputFormat::Quiet => {
                for outcome in &report.books {
                    if outcome.status != SyncStatus::Unchanged {
                        println!("{}", outcome.path.display());
                    }
                }
            }
        }
    }

    /// Print the result of extracting one book
    pub fn print_extraction(&self, report: &ExtractionReport) {
        match self.format {
            OutputFormat::Human => print_extraction_human(report),
            OutputFormat::Json => print_json(report),
            OutputFormat::Quiet => {
                for title in &report.created {
                    println!("{}", title);
                }
            }
        }
    }

    /// Print the result of extracting every book
    pub fn print_extract_pass(&self, report: &ExtractReport) {
        match self.format {
            OutputFormat::Human => {
                let active: Vec<&ExtractionReport> =
                    report.books.iter().filter(|book| !book.is_empty()).collect();
                if active.is_empty() && report.failures.is_empty() {
                    println!("No annotated highlights.");
                    return;
                }
                for book in active {
                    print_extraction_human(book);
                }
                print_failures(&report.failures);
                println!("\n{} insight link(s) written", report.links_written());
            }
            OutputFormat::Json => print_json(report),
            OutputFormat::Quiet => {
                for title in report.books.iter().flat_map(|book| &book.created) {
                    println!("{}", title);
                }
            }
        }
    }

    /// Print live and cached stats of book documents
    pub fn print_stats(&self, report: &StatsReport) {
        match self.format {
            OutputFormat::Human => {
                if report.books.is_empty() && report.failures.is_empty() {
                    println!("No book documents found.");
                    return;
                }
                for stats in &report.books {
                    println!("{}", format_stats_line(stats));
                }
                print_failures(&report.failures);
                println!("\n{} book(s)", report.books.len());
            }
            OutputFormat::Json => print_json(report),
            OutputFormat::Quiet => {
                for stats in &report.books {
                    println!(
                        "{}\t{}\t{}",
                        stats.book, stats.current.highlights_total, stats.current.insights_created
                    );
                }
            }
        }
    }

    /// Print books known to the reader
    pub fn print_books(&self, books: &[BookListing]) {
        match self.format {
            OutputFormat::Human => {
                if books.is_empty() {
                    println!("No books found.");
                    return;
                }
                for listing in books {
                    let marker = if listing.document.is_some() { "*" } else { " " };
                    println!(
                        "{} {} | {}",
                        marker,
                        truncate(&listing.book.title, 45),
                        truncate(listing.book.author.as_deref().unwrap_or("-"), 30)
                    );
                }
                println!("\n{} book(s); * = has a note", books.len());
            }
            OutputFormat::Json => print_json(books),
            OutputFormat::Quiet => {
                for listing in books {
                    println!("{}", listing.book.title);
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize output: {}", e),
    }
}

fn print_failures(failures: &[BookFailure]) {
    for failure in failures {
        eprintln!("✗ {}: {}", failure.book, failure.error);
    }
}

fn print_extraction_human(report: &ExtractionReport) {
    if report.is_empty() {
        println!("{}: no annotated highlights", report.source);
        return;
    }

    println!("{}", report.source);
    for title in &report.created {
        println!("  + {}", title);
    }
    for title in &report.linked {
        println!("  = {} (already existed, linked)", title);
    }
    for failure in &report.failures {
        println!("  ! {} (linked, note not written: {})", failure.title, failure.error);
    }
    if report.skipped > 0 {
        println!("  {} skipped (no usable title or quote)", report.skipped);
    }
}

fn format_stats_line(stats: &BookStats) -> String {
    let stale = if stats.is_stale() { " (cache stale)" } else { "" };
    format!(
        "{} | {} highlight(s) | {} insight(s){}",
        truncate(&stats.book, 45),
        stats.current.highlights_total,
        stats.current.insights_created,
        stale
    )
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
