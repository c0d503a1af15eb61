//! Line tokenizer for SPEC files.
//!
//! A SPEC file is a flat sequence of lines. Each line falls into one of four
//! classes:
//!   - `#<code>[<n>] payload` marker line (`#F`, `#S`, `#O0`, `#UMI2`, `#@CALIB`)
//!   - `@A payload`           MCA spectrum line
//!   - blank                  separator between blocks
//!   - anything else          data line (one row of numbers)
//!
//! The tokenizer never rejects input: a `#` line that does not follow the
//! marker grammar is passed on as a marker with an empty code.

use regex::Regex;
use std::sync::OnceLock;

/// Runs of two or more whitespace characters separate names that may
/// themselves contain single spaces (`#L`, `#O`).
static MULTI_SPACE: OnceLock<Regex> = OnceLock::new();

fn multi_space() -> &'static Regex {
    MULTI_SPACE.get_or_init(|| Regex::new(r"\s{2,}").expect("Invalid multi-space pattern"))
}

/// Classification of one physical line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Marker,
    Spectrum,
    Separator,
    Data,
}

/// One classified line, borrowing from the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    pub kind: LineKind,
    /// Letters of the marker code, including a leading `@` (`S`, `UMI`, `@MCADEV`).
    /// Empty for non-marker lines and for opaque `#` lines.
    pub code: &'a str,
    /// Code plus its sub-block digits, as written (`UMI0`). Used as header key.
    pub key: &'a str,
    /// Trailing digits of the code, ordering multi-line arrays (`#O0`, `#O1`).
    pub sub_index: Option<u32>,
    /// Text after the code with surrounding whitespace removed.
    pub payload: &'a str,
    /// Whole line without its terminator.
    pub text: &'a str,
    /// Byte offset of the first character of the line.
    pub offset: usize,
    /// 0-based line number.
    pub number: usize,
}

impl<'a> Line<'a> {
    /// Classify a single line (terminator already removed).
    pub fn classify(text: &'a str, offset: usize, number: usize) -> Self {
        let mut line = Line {
            kind: LineKind::Data,
            code: "",
            key: "",
            sub_index: None,
            payload: text.trim(),
            text,
            offset,
            number,
        };

        if text.trim().is_empty() {
            line.kind = LineKind::Separator;
            line.payload = "";
        } else if let Some(rest) = text.strip_prefix('#') {
            line.kind = LineKind::Marker;
            if let Some((code, key, sub_index, payload)) = split_marker(rest) {
                line.code = code;
                line.key = key;
                line.sub_index = sub_index;
                line.payload = payload;
            } else {
                line.payload = rest.trim();
            }
        } else if let Some(rest) = text.strip_prefix("@A") {
            let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
            let tail = &rest[digits..];
            if tail.is_empty() || tail.starts_with(char::is_whitespace) {
                line.kind = LineKind::Spectrum;
                line.code = "@A";
                line.key = &text[..2 + digits];
                line.sub_index = rest[..digits].parse().ok();
                line.payload = tail.trim();
            }
        }

        line
    }

    /// Is this a marker line with the given code (`is_marker("S")`)?
    pub fn is_marker(&self, code: &str) -> bool {
        self.kind == LineKind::Marker && self.code == code
    }
}

/// Split `<@?letters><digits?> payload` into its parts. `None` when the text
/// after `#` does not follow the marker grammar.
fn split_marker(rest: &str) -> Option<(&str, &str, Option<u32>, &str)> {
    let bytes = rest.as_bytes();
    let mut i = 0;
    if bytes.first() == Some(&b'@') {
        i += 1;
    }
    let letters_start = i;
    while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
        i += 1;
    }
    if i == letters_start {
        return None;
    }
    let code_end = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let key_end = i;
    let tail = &rest[key_end..];
    if !(tail.is_empty() || tail.starts_with(char::is_whitespace)) {
        return None;
    }
    let sub_index = if key_end > code_end {
        rest[code_end..key_end].parse().ok()
    } else {
        None
    };
    Some((&rest[..code_end], &rest[..key_end], sub_index, tail.trim()))
}

/// Iterator over the classified lines of a text, or of a byte range of it.
///
/// Offsets and line numbers are always absolute with respect to the full
/// text, so a scan can re-read its own lines later from the recorded range.
#[derive(Debug, Clone)]
pub struct Lines<'a> {
    text: &'a str,
    pos: usize,
    end: usize,
    number: usize,
}

impl<'a> Lines<'a> {
    /// Lines of the whole text.
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            pos: 0,
            end: text.len(),
            number: 0,
        }
    }

    /// Lines of `text[start..end]`; `first_line` is the number of the line at `start`.
    pub fn range(text: &'a str, start: usize, end: usize, first_line: usize) -> Self {
        let end = end.min(text.len());
        Self {
            text,
            pos: start.min(end),
            end,
            number: first_line,
        }
    }
}

impl<'a> Iterator for Lines<'a> {
    type Item = Line<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.end {
            return None;
        }
        let rest = &self.text[self.pos..self.end];
        let (raw, advance) = match rest.find('\n') {
            Some(i) => (&rest[..i], i + 1),
            None => (rest, rest.len()),
        };
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        let line = Line::classify(raw, self.pos, self.number);
        self.pos += advance;
        self.number += 1;
        Some(line)
    }
}

/// Classify every line of `text`.
pub fn tokenize(text: &str) -> Lines<'_> {
    Lines::new(text)
}

/// Split on runs of two or more spaces, keeping single spaces inside names.
///
/// `"first column  second column  3rd_col"` → `["first column", "second column", "3rd_col"]`.
/// A name followed by a single space and another name cannot be told apart
/// from a single name with an inner space; both are kept together.
pub fn split_names(s: &str) -> Vec<&str> {
    multi_space()
        .split(s.trim())
        .filter(|t| !t.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_markers() {
        let line = Line::classify("#S 25  ascan  c3th 1.33245", 0, 0);
        assert_eq!(line.kind, LineKind::Marker);
        assert_eq!(line.code, "S");
        assert_eq!(line.key, "S");
        assert_eq!(line.sub_index, None);
        assert_eq!(line.payload, "25  ascan  c3th 1.33245");

        let line = Line::classify("#UMI0     Current AutoM      Shutter", 0, 0);
        assert_eq!(line.code, "UMI");
        assert_eq!(line.key, "UMI0");
        assert_eq!(line.sub_index, Some(0));
        assert_eq!(line.payload, "Current AutoM      Shutter");

        let line = Line::classify("#@MCADEV 1", 0, 0);
        assert_eq!(line.code, "@MCADEV");
        assert_eq!(line.payload, "1");

        let line = Line::classify("#Q", 0, 0);
        assert!(line.is_marker("Q"));
        assert_eq!(line.payload, "");
    }

    #[test]
    fn test_opaque_marker_is_not_rejected() {
        let line = Line::classify("#2theta scan", 0, 0);
        assert_eq!(line.kind, LineKind::Marker);
        assert_eq!(line.code, "");
        assert_eq!(line.payload, "2theta scan");

        let line = Line::classify("#G1x 0", 0, 0);
        assert_eq!(line.code, "");
    }

    #[test]
    fn test_classify_other_kinds() {
        assert_eq!(Line::classify("   ", 0, 0).kind, LineKind::Separator);
        assert_eq!(Line::classify("1.0 2.0", 0, 0).kind, LineKind::Data);

        let spectrum = Line::classify("@A 0 1 2", 0, 0);
        assert_eq!(spectrum.kind, LineKind::Spectrum);
        assert_eq!(spectrum.payload, "0 1 2");

        // '@A' must be followed by whitespace to be a spectrum line
        assert_eq!(Line::classify("@Abc 1", 0, 0).kind, LineKind::Data);
    }

    #[test]
    fn test_offsets_and_crlf() {
        let text = "#F a\r\n\r\n#S 1 x\n1 2";
        let lines: Vec<Line> = tokenize(text).collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0].payload, "a");
        assert_eq!(lines[1].kind, LineKind::Separator);
        assert_eq!(lines[2].offset, 8);
        assert_eq!(lines[2].number, 2);
        assert_eq!(lines[3].text, "1 2");
        assert_eq!(lines[3].kind, LineKind::Data);
    }

    #[test]
    fn test_range_keeps_absolute_positions() {
        let text = "#S 1 a\n1 2\n3 4\n";
        let lines: Vec<Line> = Lines::range(text, 7, text.len(), 1).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].offset, 7);
        assert_eq!(lines[0].number, 1);
        assert_eq!(lines[1].text, "3 4");
    }

    #[test]
    fn test_split_names() {
        assert_eq!(
            split_names("first column  second column  3rd_col"),
            vec!["first column", "second column", "3rd_col"]
        );
        assert_eq!(
            split_names("Pslit HGap  MRTSlit UP  MRTSlit DOWN"),
            vec!["Pslit HGap", "MRTSlit UP", "MRTSlit DOWN"]
        );
        assert!(split_names("   ").is_empty());
    }
}
