//! Single pass over the classified lines that finds every scan.
//!
//! Only marker codes `F` and `S`, separators and the first data line of a
//! scan matter here; everything else is left for the lazy per-scan parsers.

use crate::header::FileHeader;
use crate::reader::ReadOptions;
use crate::scan::{Scan, ScanEntry};
use log::{debug, info, warn};
use specfile_core::{Line, LineKind, Lines, Result, SpecError};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AwaitingScan,
    InFileHeader,
    InScanHeader,
    InData,
}

/// A scan whose end has not been seen yet.
struct OpenScan {
    number: u32,
    command: String,
    start: usize,
    first_line: usize,
}

#[derive(Debug)]
pub(crate) struct ScanIndex {
    pub scans: Vec<Scan>,
    pub orders: HashMap<u32, Vec<usize>>,
}

struct Builder<'a> {
    shared: Arc<str>,
    options: &'a ReadOptions,
    state: State,
    scans: Vec<Scan>,
    orders: HashMap<u32, Vec<usize>>,
    file_header: Option<Arc<FileHeader>>,
    pending_header: Vec<Line<'a>>,
    open: Option<OpenScan>,
}

impl<'a> Builder<'a> {
    fn feed(&mut self, line: Line<'a>) -> Result<()> {
        match (line.kind, self.state) {
            (LineKind::Marker, _) if line.code == "F" => {
                self.close_scan(line.offset);
                self.pending_header.clear();
                self.pending_header.push(line);
                self.state = State::InFileHeader;
            }
            (LineKind::Marker, state) if line.code == "S" => {
                self.close_scan(line.offset);
                if state == State::InFileHeader {
                    let block = FileHeader::from_lines(self.pending_header.drain(..));
                    self.file_header = Some(Arc::new(block));
                }
                let (number, command) = parse_scan_line(&line)?;
                self.open = Some(OpenScan {
                    number,
                    command,
                    start: line.offset,
                    first_line: line.number,
                });
                self.state = State::InScanHeader;
            }
            (LineKind::Separator, State::InScanHeader | State::InData) => {
                self.close_scan(line.offset);
                self.state = State::AwaitingScan;
            }
            (LineKind::Separator, _) => {}
            (LineKind::Marker, State::InFileHeader) => self.pending_header.push(line),
            (_, State::InFileHeader) => {
                warn!(
                    "line {}: ignoring non-header line inside file header",
                    line.number + 1
                );
            }
            (LineKind::Data | LineKind::Spectrum, State::InScanHeader) => {
                self.state = State::InData;
            }
            (_, State::InScanHeader | State::InData) => {}
            (_, State::AwaitingScan) => {
                debug!("line {}: outside any scan, ignored", line.number + 1);
            }
        }
        Ok(())
    }

    fn close_scan(&mut self, end: usize) {
        let Some(open) = self.open.take() else {
            return;
        };
        let index = self.scans.len();
        let orders = self.orders.entry(open.number).or_default();
        orders.push(index);
        let order = orders.len() as u32;

        if self.options.verbose {
            info!(
                "scan {}.{} (#{}) at line {}: {}",
                open.number,
                order,
                index,
                open.first_line + 1,
                open.command
            );
        } else {
            debug!("scan {}.{} (#{}) at line {}", open.number, order, index, open.first_line + 1);
        }

        let entry = ScanEntry {
            index,
            number: open.number,
            order,
            command: open.command,
            span: open.start..end,
            first_line: open.first_line,
            file_header: self.file_header.clone(),
        };
        self.scans
            .push(Scan::new(entry, Arc::clone(&self.shared), self.options.row_policy));
    }
}

/// `#S <number> <command>`
fn parse_scan_line(line: &Line<'_>) -> Result<(u32, String)> {
    let payload = line.payload;
    let (number, command) = match payload.split_once(char::is_whitespace) {
        Some((n, rest)) => (n, rest.trim()),
        None => (payload, ""),
    };
    let number = number.parse::<u32>().map_err(|_| SpecError::MalformedMarker {
        line: line.number + 1,
        reason: format!("scan number {:?} is not an integer", number),
    })?;
    Ok((number, command.to_string()))
}

/// Index every scan of `text`.
pub(crate) fn build(text: Arc<str>, options: &ReadOptions) -> Result<ScanIndex> {
    let mut builder = Builder {
        shared: Arc::clone(&text),
        options,
        state: State::AwaitingScan,
        scans: Vec::new(),
        orders: HashMap::new(),
        file_header: None,
        pending_header: Vec::new(),
        open: None,
    };

    for line in Lines::new(&text) {
        builder.feed(line)?;
    }
    builder.close_scan(text.len());

    if !builder.pending_header.is_empty() {
        debug!("trailing file header without scans ignored");
    }

    Ok(ScanIndex {
        scans: builder.scans,
        orders: builder.orders,
    })
}
