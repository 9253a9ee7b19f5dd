//! Stats command handler

use anyhow::Result;

use marginalia_core::store::StatsReport;
use marginalia_core::Store;

use crate::output::{Output, OutputFormat};

/// Show the counters of book documents, recomputing the caches first
/// when `refresh` is set
pub fn run(store: &mut Store, book: Option<&str>, refresh: bool, output: &Output) -> Result<()> {
    if refresh {
        let refreshed = store.refresh_stats(book)?;
        let stale = refreshed.books.iter().filter(|s| s.is_stale()).count();
        if output.format == OutputFormat::Human {
            output.success(&format!(
                "Refreshed {} book(s); {} cache(s) were stale",
                refreshed.books.len(),
                stale
            ));
        }
        super::check_failures(&refreshed)?;
    }

    let report = match book {
        Some(title) => StatsReport {
            books: vec![store.book_stats(title)?],
            failures: Vec::new(),
        },
        None => store.stats()?,
    };

    output.print_stats(&report);
    super::check_failures(&report)
}
