//! Import command handler

use anyhow::Result;

use marginalia_core::{ImportOptions, Store};

use crate::output::Output;

/// Merge new highlights from the reader into the book documents
pub fn run(store: &mut Store, options: ImportOptions, output: &Output) -> Result<()> {
    let source = store.open_source()?;
    let report = store.import(&source, &options)?;

    output.print_import(&report);
    super::check_failures(&report)
}
