//! Data block of a scan: numeric rows and the spectrum lines interleaved with them.

use crate::reader::RowPolicy;
use specfile_core::{Line, LineKind, Lines, Result, SpecError};

/// One item of a scan's data block.
#[derive(Debug, Clone, Copy)]
pub(crate) enum BodyItem<'a> {
    Row(Line<'a>),
    /// Spectrum tokens from an `@A` line or from a line continuing one.
    Spectrum(Line<'a>, &'a str),
}

/// Walks the data block of a scan, skipping its header and any marker
/// lines interleaved with the data.
///
/// A spectrum line ending in `\` continues on the next line, which carries
/// no `@A` prefix and would otherwise look like a data row.
pub(crate) struct Body<'a> {
    lines: Lines<'a>,
    continued: bool,
}

impl<'a> Body<'a> {
    pub fn new(lines: Lines<'a>) -> Self {
        Self {
            lines,
            continued: false,
        }
    }
}

fn strip_continuation(payload: &str) -> (&str, bool) {
    match payload.strip_suffix('\\') {
        Some(head) => (head.trim_end(), true),
        None => (payload, false),
    }
}

impl<'a> Iterator for Body<'a> {
    type Item = BodyItem<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.lines.next()?;
            match line.kind {
                LineKind::Separator => return None,
                LineKind::Marker => {
                    self.continued = false;
                }
                LineKind::Spectrum => {
                    let (tokens, more) = strip_continuation(line.payload);
                    self.continued = more;
                    return Some(BodyItem::Spectrum(line, tokens));
                }
                LineKind::Data if self.continued => {
                    let (tokens, more) = strip_continuation(line.payload);
                    self.continued = more;
                    return Some(BodyItem::Spectrum(line, tokens));
                }
                LineKind::Data => return Some(BodyItem::Row(line)),
            }
        }
    }
}

/// Row-major numeric matrix of a scan's data lines.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataMatrix {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
}

impl DataMatrix {
    /// Parse every data row. The first row fixes the width; shorter rows are
    /// padded with NaN or rejected according to `policy`, longer rows are
    /// always rejected.
    pub(crate) fn read(body: Body<'_>, policy: RowPolicy) -> Result<Self> {
        let mut matrix = DataMatrix::default();

        for item in body {
            let line = match item {
                BodyItem::Row(line) => line,
                BodyItem::Spectrum(..) => continue,
            };
            let row = parse_row(&line)?;
            if matrix.rows == 0 {
                matrix.cols = row.len();
            } else if row.len() > matrix.cols {
                return Err(SpecError::MalformedRow {
                    line: line.number + 1,
                    reason: format!("{} values, expected {}", row.len(), matrix.cols),
                });
            } else if row.len() < matrix.cols && policy == RowPolicy::Strict {
                return Err(SpecError::MalformedRow {
                    line: line.number + 1,
                    reason: format!("{} values, expected {}", row.len(), matrix.cols),
                });
            }
            let missing = matrix.cols - row.len();
            matrix.values.extend(row);
            matrix.values.extend(std::iter::repeat(f64::NAN).take(missing));
            matrix.rows += 1;
        }

        Ok(matrix)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// All values, row after row.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn row(&self, i: usize) -> Option<&[f64]> {
        if i >= self.rows {
            return None;
        }
        Some(&self.values[i * self.cols..(i + 1) * self.cols])
    }

    pub fn column(&self, j: usize) -> Option<Vec<f64>> {
        if j >= self.cols {
            return None;
        }
        Some(self.iter_rows().map(|row| row[j]).collect())
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.row(row).and_then(|r| r.get(col).copied())
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        self.values.chunks(self.cols.max(1))
    }

    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }
}

fn parse_row(line: &Line<'_>) -> Result<Vec<f64>> {
    line.text
        .split_whitespace()
        .map(|tok| {
            tok.parse::<f64>().map_err(|_| SpecError::MalformedRow {
                line: line.number + 1,
                reason: format!("non-numeric value {:?}", tok),
            })
        })
        .collect()
}
