//! Books command handler

use anyhow::Result;

use marginalia_core::Store;

use crate::output::Output;

/// List books on the reader (annotated ones unless `all`)
pub fn list(store: &Store, all: bool, output: &Output) -> Result<()> {
    let source = store.open_source()?;
    let books = store.books(&source, all)?;
    output.print_books(&books);
    Ok(())
}
