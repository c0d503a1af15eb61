//! One scan of a SPEC file.
//!
//! A `Scan` is created by the index as a light entry: its identity plus the
//! byte range of its lines in the shared file text. Headers, data and
//! spectra are parsed from that range on first access and cached in
//! `OnceLock` cells, so concurrent first readers compute each field once.

use crate::data::{Body, DataMatrix};
use crate::header::{parse_date, FileHeader, ScanHeader};
use crate::mca::Mca;
use crate::reader::RowPolicy;
use crate::summary::ScanSummary;
use chrono::NaiveDateTime;
use specfile_core::{HeaderValue, LineKind, Lines, Result, SpecError};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;
use std::sync::{Arc, OnceLock};

static EMPTY_MAP: BTreeMap<String, String> = BTreeMap::new();

pub struct Scan {
    index: usize,
    number: u32,
    order: u32,
    command: String,
    text: Arc<str>,
    span: Range<usize>,
    first_line: usize,
    file_header: Option<Arc<FileHeader>>,
    row_policy: RowPolicy,

    header: OnceLock<ScanHeader>,
    comments: OnceLock<Vec<String>>,
    data: OnceLock<Result<DataMatrix>>,
    mca: OnceLock<Result<Mca>>,
}

/// Identity and location of a scan, as found by the index pass.
pub(crate) struct ScanEntry {
    pub index: usize,
    pub number: u32,
    pub order: u32,
    pub command: String,
    pub span: Range<usize>,
    pub first_line: usize,
    pub file_header: Option<Arc<FileHeader>>,
}

impl Scan {
    pub(crate) fn new(entry: ScanEntry, text: Arc<str>, row_policy: RowPolicy) -> Self {
        Self {
            index: entry.index,
            number: entry.number,
            order: entry.order,
            command: entry.command,
            text,
            span: entry.span,
            first_line: entry.first_line,
            file_header: entry.file_header,
            row_policy,
            header: OnceLock::new(),
            comments: OnceLock::new(),
            data: OnceLock::new(),
            mca: OnceLock::new(),
        }
    }

    fn lines(&self) -> Lines<'_> {
        Lines::range(&self.text, self.span.start, self.span.end, self.first_line)
    }

    fn header(&self) -> &ScanHeader {
        self.header.get_or_init(|| ScanHeader::parse(self.lines()))
    }

    // ─── Identity ───────────────────────────────────────────────────────

    /// 0-based position in the file.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    /// 1-based occurrence of this scan's number in the file.
    pub fn order(&self) -> u32 {
        self.order
    }

    /// `"N.M"` key of this scan.
    pub fn key(&self) -> String {
        format!("{}.{}", self.number, self.order)
    }

    /// Everything after the scan number on the `#S` line.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Byte range of the scan's lines in the file, `#S` line included.
    pub fn byte_range(&self) -> Range<usize> {
        self.span.clone()
    }

    /// 1-based line number of the `#S` line.
    pub fn line_number(&self) -> usize {
        self.first_line + 1
    }

    // ─── Headers ────────────────────────────────────────────────────────

    pub fn file_header(&self) -> Option<&FileHeader> {
        self.file_header.as_deref()
    }

    /// Lines of the file header in effect for this scan; empty when the
    /// scan is not preceded by any `#F` block.
    pub fn file_header_lines(&self) -> &[String] {
        match self.file_header.as_deref() {
            Some(header) => header.lines(),
            None => &[],
        }
    }

    pub fn file_header_map(&self) -> &BTreeMap<String, String> {
        match self.file_header.as_deref() {
            Some(header) => header.map(),
            None => &EMPTY_MAP,
        }
    }

    pub fn file_header_value(&self, key: &str) -> Result<HeaderValue> {
        self.file_header_map()
            .get(key)
            .map(|v| HeaderValue::parse(v))
            .ok_or_else(|| SpecError::NotFound(format!("file header key {:?}", key)))
    }

    /// Marker lines from `#S` up to the first data line.
    pub fn scan_header_lines(&self) -> &[String] {
        &self.header().lines
    }

    /// Scan header as key → value, `#@` lines excluded.
    pub fn scan_header(&self) -> &BTreeMap<String, String> {
        &self.header().map
    }

    pub fn scan_header_value(&self, key: &str) -> Result<HeaderValue> {
        self.scan_header()
            .get(key)
            .map(|v| HeaderValue::parse(v))
            .ok_or_else(|| SpecError::NotFound(format!("scan header key {:?}", key)))
    }

    /// Every scan header entry with its numeric interpretation.
    pub fn scan_header_values(&self) -> BTreeMap<String, HeaderValue> {
        self.scan_header()
            .iter()
            .map(|(k, v)| (k.clone(), HeaderValue::parse(v)))
            .collect()
    }

    /// `#@<TAG>` entries, keyed by `TAG`.
    pub fn mca_header(&self) -> &BTreeMap<String, String> {
        &self.header().mca
    }

    /// Column labels from `#L`.
    pub fn labels(&self) -> &[String] {
        &self.header().labels
    }

    /// `#N` column-count hint.
    pub fn column_count(&self) -> Option<usize> {
        self.scan_header().get("N")?.trim().parse().ok()
    }

    /// `#D` timestamp of the scan.
    pub fn date(&self) -> Option<NaiveDateTime> {
        self.scan_header().get("D").and_then(|d| parse_date(d))
    }

    /// Payloads of every `#C` line of the scan, header and data block alike.
    pub fn comments(&self) -> &[String] {
        self.comments.get_or_init(|| {
            self.lines()
                .take_while(|l| l.kind != LineKind::Separator)
                .filter(|l| l.is_marker("C"))
                .map(|l| l.payload.to_string())
                .collect()
        })
    }

    // ─── Motors ─────────────────────────────────────────────────────────

    /// Motor names from the file header's `#O` lines.
    pub fn motor_names(&self) -> &[String] {
        match self.file_header.as_deref() {
            Some(header) => header.motor_names(),
            None => &[],
        }
    }

    /// Motor positions from the scan's `#P` lines. Available even when the
    /// file header is missing and names are not.
    pub fn motor_positions(&self) -> Result<&[f64]> {
        match &self.header().positions {
            Ok(values) => Ok(values.as_slice()),
            Err(err) => Err(err.clone()),
        }
    }

    pub fn motor_position_by_name(&self, name: &str) -> Result<f64> {
        let idx = self
            .motor_names()
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| SpecError::NotFound(format!("motor {:?}", name)))?;
        self.motor_positions()?
            .get(idx)
            .copied()
            .ok_or_else(|| SpecError::NotFound(format!("position of motor {:?}", name)))
    }

    // ─── Data ───────────────────────────────────────────────────────────

    pub fn data(&self) -> Result<&DataMatrix> {
        self.data
            .get_or_init(|| DataMatrix::read(Body::new(self.lines()), self.row_policy))
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Row `i` of the data block.
    pub fn data_line(&self, i: usize) -> Result<&[f64]> {
        let data = self.data()?;
        data.row(i).ok_or(SpecError::OutOfRange {
            index: i,
            len: data.rows(),
        })
    }

    /// The data column labelled `name` in `#L`.
    pub fn data_column_by_name(&self, name: &str) -> Result<Vec<f64>> {
        let idx = self
            .labels()
            .iter()
            .position(|l| l == name)
            .ok_or_else(|| SpecError::NotFound(format!("column {:?}", name)))?;
        let data = self.data()?;
        if data.is_empty() {
            return Ok(Vec::new());
        }
        data.column(idx)
            .ok_or_else(|| SpecError::NotFound(format!("data for column {:?}", name)))
    }

    pub fn mca(&self) -> Result<&Mca> {
        self.mca
            .get_or_init(|| Mca::assemble(Body::new(self.lines()), self.mca_header()))
            .as_ref()
            .map_err(Clone::clone)
    }

    pub fn summary(&self) -> Result<ScanSummary> {
        let data = self.data()?;
        Ok(ScanSummary {
            index: self.index,
            key: self.key(),
            number: self.number,
            order: self.order,
            command: self.command.clone(),
            date: self.date(),
            labels: self.labels().to_vec(),
            rows: data.rows(),
            columns: data.cols(),
            motors: self.motor_names().len(),
            spectra: self.mca()?.len(),
        })
    }
}

impl fmt::Debug for Scan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scan")
            .field("index", &self.index)
            .field("number", &self.number)
            .field("order", &self.order)
            .field("command", &self.command)
            .field("span", &self.span)
            .finish()
    }
}
