//! Error taxonomy shared by the tokenizer, the scan index and the lazy scan records.

use std::io;
use std::sync::Arc;
use thiserror::Error;

/// Every failure a SPEC file read or query can produce.
///
/// The type is `Clone` so that a failure cached by a lazily materialized
/// field can be handed out again on every later access.
#[derive(Error, Debug, Clone)]
pub enum SpecError {
    #[error("I/O error: {0}")]
    Io(Arc<io::Error>),

    /// Absolute scan index outside `[0, len)`.
    #[error("Scan index must be in range 0..{len}, got {index}")]
    OutOfRange { index: usize, len: usize },

    /// Unknown scan key, column label, motor or header key.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A string key that is neither `N` nor `N.M`.
    #[error("Invalid scan key {0:?}: expected \"N\" or \"N.M\"")]
    InvalidKey(String),

    /// A key of a type that cannot address a scan (e.g. a float).
    #[error("The scan identification key must be an integer index or a \"N.M\" string, got {0}")]
    KeyType(String),

    /// `line` is 1-based.
    #[error("Malformed data row at line {line}: {reason}")]
    MalformedRow { line: usize, reason: String },

    /// `line` is 1-based.
    #[error("Malformed header line {line}: {reason}")]
    MalformedMarker { line: usize, reason: String },

    #[error("MCA spectra do not match data rows: {rows} rows, {spectra} spectra")]
    MalformedSpectrum { rows: usize, spectra: usize },
}

impl From<io::Error> for SpecError {
    fn from(err: io::Error) -> Self {
        SpecError::Io(Arc::new(err))
    }
}

/// Convenience alias used across the workspace.
pub type Result<T> = std::result::Result<T, SpecError>;
