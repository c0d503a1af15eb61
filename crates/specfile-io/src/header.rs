//! File-header blocks and scan-header parsing.
//!
//! A file header starts at a `#F` line and takes every marker line up to the
//! next `#S` (blank lines inside it are skipped). It stays in effect for all
//! following scans until the next `#F`. A scan header is every marker line
//! from `#S` up to the first data or spectrum line.

use chrono::{DateTime, NaiveDateTime, Utc};
use specfile_core::{split_names, Line, LineKind, Lines, SpecError};
use std::collections::BTreeMap;

/// `Thu Feb 11 09:55:20 2016`
const DATE_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

/// Concatenate indexed sub-blocks (`#O0`, `#O1`, …) in sub-index order.
/// Lines without digits sort as index 0; equal indices keep file order.
fn concat_ordered<T>(mut blocks: Vec<(u32, Vec<T>)>) -> Vec<T> {
    blocks.sort_by_key(|(k, _)| *k);
    blocks.into_iter().flat_map(|(_, v)| v).collect()
}

/// Parse a `#D` style timestamp.
pub fn parse_date(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

/// One `#F` block, shared by every scan it applies to.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FileHeader {
    lines: Vec<String>,
    map: BTreeMap<String, String>,
    motor_names: Vec<String>,
}

impl FileHeader {
    pub(crate) fn from_lines<'a>(lines: impl IntoIterator<Item = Line<'a>>) -> Self {
        let mut header = FileHeader::default();
        let mut motors = Vec::new();
        for line in lines {
            header.lines.push(line.text.to_string());
            if !line.key.is_empty() {
                header.map.insert(line.key.to_string(), line.payload.to_string());
            }
            if line.code == "O" {
                let names = split_names(line.payload).into_iter().map(String::from).collect();
                motors.push((line.sub_index.unwrap_or(0), names));
            }
        }
        header.motor_names = concat_ordered(motors);
        header
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn map(&self) -> &BTreeMap<String, String> {
        &self.map
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(String::as_str)
    }

    /// Motor names from the `#O<k>` lines.
    pub fn motor_names(&self) -> &[String] {
        &self.motor_names
    }

    /// `#E` epoch as a UTC timestamp.
    pub fn epoch(&self) -> Option<DateTime<Utc>> {
        let secs = self.get("E")?.trim().parse::<i64>().ok()?;
        DateTime::from_timestamp(secs, 0)
    }

    pub fn date(&self) -> Option<NaiveDateTime> {
        self.get("D").and_then(parse_date)
    }
}

/// Scan header, parsed once on first access.
#[derive(Debug, Clone)]
pub(crate) struct ScanHeader {
    pub lines: Vec<String>,
    pub map: BTreeMap<String, String>,
    pub mca: BTreeMap<String, String>,
    pub labels: Vec<String>,
    pub positions: Result<Vec<f64>, SpecError>,
}

impl ScanHeader {
    pub fn parse(lines: Lines<'_>) -> Self {
        let mut header = ScanHeader {
            lines: Vec::new(),
            map: BTreeMap::new(),
            mca: BTreeMap::new(),
            labels: Vec::new(),
            positions: Ok(Vec::new()),
        };
        let mut positions = Vec::new();
        let mut bad_position = None;

        for line in lines {
            match line.kind {
                LineKind::Data | LineKind::Spectrum | LineKind::Separator => break,
                LineKind::Marker => {}
            }
            header.lines.push(line.text.to_string());

            if let Some(tag) = line.key.strip_prefix('@') {
                header.mca.insert(tag.to_string(), line.payload.to_string());
                continue;
            }
            if !line.key.is_empty() {
                header.map.insert(line.key.to_string(), line.payload.to_string());
            }
            match line.code {
                "L" => {
                    header.labels = split_names(line.payload).into_iter().map(String::from).collect();
                }
                "P" => {
                    let parsed: Result<Vec<f64>, _> =
                        line.payload.split_whitespace().map(str::parse::<f64>).collect();
                    match parsed {
                        Ok(values) => positions.push((line.sub_index.unwrap_or(0), values)),
                        Err(_) if bad_position.is_none() => {
                            bad_position = Some(SpecError::MalformedMarker {
                                line: line.number + 1,
                                reason: format!("non-numeric motor position in {:?}", line.text),
                            });
                        }
                        Err(_) => {}
                    }
                }
                _ => {}
            }
        }

        header.positions = match bad_position {
            Some(err) => Err(err),
            None => Ok(concat_ordered(positions)),
        };
        header
    }
}
