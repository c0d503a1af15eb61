//! Scan addressing: absolute index or `N.M` (scan number, order) key.

use crate::error::{Result, SpecError};
use std::fmt;
use std::str::FromStr;

/// How a caller designates one scan of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanRef {
    /// 0-based position in the file.
    Index(usize),
    /// Scan number and 1-based order among scans sharing that number.
    Key { number: u32, order: u32 },
}

impl ScanRef {
    pub fn key(number: u32, order: u32) -> Self {
        ScanRef::Key { number, order }
    }
}

/// Parse `"N"` or `"N.M"` into `(number, order)`. `"N"` means order 1.
///
/// Both parts must be plain unsigned decimal integers and the order must be
/// at least 1. Well-formed parts too large for `u32` name no scan and fail
/// with `NotFound`.
pub fn parse_key(key: &str) -> Result<(u32, u32)> {
    let invalid = || SpecError::InvalidKey(key.to_string());
    let too_large = || SpecError::NotFound(format!("scan {}", key));
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());

    let (number, order) = match key.split_once('.') {
        Some((n, o)) => (n, Some(o)),
        None => (key, None),
    };
    if !all_digits(number) {
        return Err(invalid());
    }
    let number: u32 = number.parse().map_err(|_| too_large())?;

    let order = match order {
        None => 1,
        Some(o) if all_digits(o) => o.parse::<u32>().map_err(|_| too_large())?,
        Some(_) => return Err(invalid()),
    };
    if order == 0 {
        return Err(invalid());
    }
    Ok((number, order))
}

impl FromStr for ScanRef {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self> {
        let (number, order) = parse_key(s)?;
        Ok(ScanRef::Key { number, order })
    }
}

impl From<usize> for ScanRef {
    fn from(index: usize) -> Self {
        ScanRef::Index(index)
    }
}

/// Float keys are rejected: `1.2` could mean index 1 or scan 1 order 2.
impl TryFrom<f64> for ScanRef {
    type Error = SpecError;

    fn try_from(value: f64) -> Result<Self> {
        Err(SpecError::KeyType(format!("float {}", value)))
    }
}

impl fmt::Display for ScanRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanRef::Index(i) => write!(f, "index {}", i),
            ScanRef::Key { number, order } => write!(f, "{}.{}", number, order),
        }
    }
}
