//! Command handlers

pub mod books;
pub mod config;
pub mod extract;
pub mod import;
pub mod stats;

use anyhow::{bail, Result};

use marginalia_core::store::PassReport;

/// Fail the command when any book of a pass failed
///
/// Called after the report was printed, so the successful books are
/// still shown.
fn check_failures<T>(report: &PassReport<T>) -> Result<()> {
    if report.failures.is_empty() {
        return Ok(());
    }
    bail!(
        "{} of {} book(s) failed",
        report.failures.len(),
        report.failures.len() + report.books.len()
    )
}
