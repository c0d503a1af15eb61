//! One-line scan overviews for listings and JSON output.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;

/// Compact, serializable description of one scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanSummary {
    pub index: usize,
    pub key: String,
    pub number: u32,
    pub order: u32,
    pub command: String,
    pub date: Option<NaiveDateTime>,
    pub labels: Vec<String>,
    pub rows: usize,
    pub columns: usize,
    pub motors: usize,
    pub spectra: usize,
}

impl fmt::Display for ScanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:>4}] {:<8} {:<40} {:>5} x {:<3}",
            self.index, self.key, self.command, self.rows, self.columns
        )?;
        if self.spectra > 0 {
            write!(f, "  mca: {}", self.spectra)?;
        }
        Ok(())
    }
}
