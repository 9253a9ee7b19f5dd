//! Extract command handler

use anyhow::Result;

use marginalia_core::Store;

use crate::output::Output;

/// Promote annotated highlights of one book, or of every book
pub fn run(store: &mut Store, book: Option<&str>, output: &Output) -> Result<()> {
    match book {
        Some(title) => {
            let report = store.extract_book(title)?;
            output.print_extraction(&report);
            Ok(())
        }
        None => {
            let report = store.extract_all()?;
            output.print_extract_pass(&report);
            super::check_failures(&report)
        }
    }
}
