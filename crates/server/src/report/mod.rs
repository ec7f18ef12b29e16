//! The report pipeline: per-column aggregation and run orchestration.
//!
//! Failures are isolated to the smallest unit that can independently fail
//! (one column, one period, one integration); the cell gets an error
//! sentinel and every other cell is still written.

pub mod aggregate;
pub mod runner;

use std::time::Duration;

use spendsheet_core::Mode;

/// Sentinel written when a column lacks Meta credentials.
pub const MISSING_META_CREDENTIALS: &str = "ERROR CREDENTIALS (Meta)";

/// Sentinel written when a column lacks Shopify credentials.
pub const MISSING_SHOPIFY_CREDENTIALS: &str = "ERROR CREDENTIALS (Shopify)";

/// Outcome of one report run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub mode: Mode,
    /// Data columns processed (the label column excluded).
    pub columns: usize,
    /// Cells written to the sheet, sentinels included.
    pub cells_written: usize,
    pub elapsed: Duration,
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "report complete: mode={} columns={} cells={} elapsed={:.1}s",
            self.mode,
            self.columns,
            self.cells_written,
            self.elapsed.as_secs_f64()
        )
    }
}
