//! Opening SPEC files and addressing their scans.

use crate::index;
use crate::scan::Scan;
use log::info;
use specfile_core::{parse_key, Result, ScanRef, SpecError};
use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What to do with a data row shorter than the first row of its scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowPolicy {
    /// Fill the missing trailing values with NaN.
    #[default]
    PadWithNan,
    /// Fail with `MalformedRow`.
    Strict,
}

/// Options for reading a SPEC file.
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    pub row_policy: RowPolicy,
    /// Log every indexed scan at info level instead of debug.
    pub verbose: bool,
}

/// A parsed SPEC file: the ordered scans and the `number → indices` map.
///
/// Immutable after construction and safe to share between threads.
#[derive(Debug)]
pub struct SpecFile {
    source: Option<PathBuf>,
    scans: Vec<Scan>,
    orders: HashMap<u32, Vec<usize>>,
}

impl SpecFile {
    /// Read and index the file at `path`.
    ///
    /// # Errors
    /// `SpecError::Io` if the file cannot be read, `MalformedMarker` if a
    /// `#S` line carries no integer scan number.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, &ReadOptions::default())
    }

    pub fn open_with(path: impl AsRef<Path>, options: &ReadOptions) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening SPEC file: {}", path.display());
        let bytes = fs::read(path)?;
        let mut file = Self::parse_with(String::from_utf8_lossy(&bytes).into_owned(), options)?;
        file.source = Some(path.to_path_buf());
        info!("SPEC file {} opened: {} scans", path.display(), file.len());
        Ok(file)
    }

    /// Read everything from `reader` and index it.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Self::from_reader_with(reader, &ReadOptions::default())
    }

    pub fn from_reader_with<R: Read>(mut reader: R, options: &ReadOptions) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::parse_with(String::from_utf8_lossy(&bytes).into_owned(), options)
    }

    /// Index text already in memory.
    pub fn parse(text: impl Into<Arc<str>>) -> Result<Self> {
        Self::parse_with(text, &ReadOptions::default())
    }

    pub fn parse_with(text: impl Into<Arc<str>>, options: &ReadOptions) -> Result<Self> {
        let index = index::build(text.into(), options)?;
        Ok(Self {
            source: None,
            scans: index.scans,
            orders: index.orders,
        })
    }

    /// Path the file was opened from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn len(&self) -> usize {
        self.scans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scans.is_empty()
    }

    pub fn scans(&self) -> &[Scan] {
        &self.scans
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Scan> {
        self.scans.iter()
    }

    /// Scan at absolute position `index`.
    pub fn scan_at(&self, index: usize) -> Result<&Scan> {
        self.scans.get(index).ok_or(SpecError::OutOfRange {
            index,
            len: self.scans.len(),
        })
    }

    /// Scan with the given number and 1-based order.
    pub fn scan_by(&self, number: u32, order: u32) -> Result<&Scan> {
        self.scan_at(self.index(number, order)?)
    }

    pub fn get(&self, scan: ScanRef) -> Result<&Scan> {
        match scan {
            ScanRef::Index(i) => self.scan_at(i),
            ScanRef::Key { number, order } => self.scan_by(number, order),
        }
    }

    /// Scan designated by a `"N"` or `"N.M"` key.
    pub fn lookup(&self, key: &str) -> Result<&Scan> {
        let (number, order) = parse_key(key)?;
        self.scan_by(number, order)
    }

    /// Absolute index of scan `number.order`.
    pub fn index(&self, number: u32, order: u32) -> Result<usize> {
        order
            .checked_sub(1)
            .and_then(|o| self.orders.get(&number)?.get(o as usize))
            .copied()
            .ok_or_else(|| SpecError::NotFound(format!("scan {}.{}", number, order)))
    }

    /// Scan number of the scan at `index`.
    pub fn number(&self, index: usize) -> Result<u32> {
        self.scan_at(index).map(Scan::number)
    }

    /// Order of the scan at `index` among scans sharing its number.
    pub fn order(&self, index: usize) -> Result<u32> {
        self.scan_at(index).map(Scan::order)
    }

    /// Scan numbers in file order, duplicates kept.
    pub fn list(&self) -> Vec<u32> {
        self.scans.iter().map(Scan::number).collect()
    }

    /// `"N.M"` keys in file order.
    pub fn keys(&self) -> Vec<String> {
        self.scans.iter().map(Scan::key).collect()
    }

    /// Does `key` (`"N"` or `"N.M"`) name a scan of this file?
    pub fn contains(&self, key: &str) -> bool {
        self.lookup(key).is_ok()
    }
}

impl<'a> IntoIterator for &'a SpecFile {
    type Item = &'a Scan;
    type IntoIter = std::slice::Iter<'a, Scan>;

    fn into_iter(self) -> Self::IntoIter {
        self.scans.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reference file: file header, scans 1 and 25, a second file header,
    /// then a second scan 1 with MCA spectra.
    const SFTEXT: &str = "#F /tmp/sf.dat
#E 1455180875
#D Thu Feb 11 09:54:35 2016
#C imaging  User = opid17
#U00 user comment first line
#U01 This is a dummy file to test SpecFile parsing
#U02
#U03 last line

#O0 Pslit HGap  MRTSlit UP  MRTSlit DOWN
#O1 Sslit1 VOff  Sslit1 HOff  Sslit1 VGap
#o0 pshg mrtu mrtd
#o2 ss1vo ss1ho ss1vg

#J0 Seconds  IA  ion.mono  Current
#J1 xbpmc2  idgap1  Inorm

#S 1  ascan  ss1vo -4.55687 -0.556875  40 0.2
#D Thu Feb 11 09:55:20 2016
#T 0.2  (Seconds)
#G0 0
#G1 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0
#G3 0 0 0 0 0 0 0 0 0
#G4 0
#Q
#P0 180.005 -0.66875 0.87125
#P1 14.74255 16.197579 12.238283
#UMI0     Current AutoM      Shutter
#UMI1      192.51   OFF     FE open
#UMI2 Refill in 39883 sec, Fill Mode: uniform multibunch / Message: Feb 11 08:00 Delivery:Next Refill at 21:00;
#N 4
#L first column  second column  3rd_col
-1.23 5.89  8
8.478100E+01  5 1.56
3.14 2.73 -3.14
1.2 2.3 3.4

#S 25  ascan  c3th 1.33245 1.52245  40 0.15
#D Thu Feb 11 10:00:31 2016
#P0 80.005 -1.66875 1.87125
#P1 4.74255 6.197579 2.238283
#N 5
#L column0  column1  col2  col3
0.0 0.1 0.2 0.3
1.0 1.1 1.2 1.3
2.0 2.1 2.2 2.3
3.0 3.1 3.2 3.3

#F /tmp/sf.dat
#E 1455180876
#D Thu Feb 11 09:54:36 2016

#S 1 aaaaaa
#@MCADEV 1
#@MCA %16C
#@CHANN 3 0 2 1
#@CALIB 1 2 3
#N 2
#L uno  duo
1 2
@A 0 1 2
3 4
@A 3.1 4 5
";

    fn sf() -> SpecFile {
        SpecFile::parse(SFTEXT).unwrap()
    }

    /// The same scans without the leading file header: starts on the blank
    /// line before `#S 1` and stops after the second `#S 1` line.
    fn sf_no_file_header() -> SpecFile {
        let start = SFTEXT.find("\n#S 1  ascan").unwrap();
        let end = SFTEXT.find("#@MCADEV").unwrap();
        SpecFile::parse(&SFTEXT[start..end]).unwrap()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_open() {
        let path = std::env::temp_dir().join(format!("specfile-open-{}.dat", std::process::id()));
        fs::write(&path, SFTEXT).unwrap();
        let file = SpecFile::open(&path).unwrap();
        assert_eq!(file.len(), 3);
        assert_eq!(file.source(), Some(path.as_path()));
        fs::remove_file(&path).unwrap();

        assert!(matches!(
            SpecFile::open("doesnt_exist.dat"),
            Err(SpecError::Io(_))
        ));
    }

    #[test]
    fn test_from_reader() {
        let file = SpecFile::from_reader(SFTEXT.as_bytes()).unwrap();
        assert_eq!(file.list(), vec![1, 25, 1]);
    }

    #[test]
    fn test_number_of_scans() {
        let file = sf();
        assert_eq!(file.len(), 3);
        assert_eq!(file.len(), SFTEXT.lines().filter(|l| l.starts_with("#S ")).count());
    }

    #[test]
    fn test_list_and_keys() {
        let file = sf();
        assert_eq!(file.list(), vec![1, 25, 1]);
        assert_eq!(file.keys(), vec!["1.1", "25.1", "1.2"]);
        assert!(file.contains("25"));
        assert!(!file.contains("25.2"));
    }

    #[test]
    fn test_index_number_order() {
        let file = sf();
        assert_eq!(file.index(1, 2).unwrap(), 2);
        assert_eq!(file.number(1).unwrap(), 25);
        assert_eq!(file.order(2).unwrap(), 2);
        assert!(matches!(file.index(3, 2), Err(SpecError::NotFound(_))));
        assert!(matches!(file.index(99, 1), Err(SpecError::NotFound(_))));
        assert!(matches!(file.index(1, 0), Err(SpecError::NotFound(_))));
        assert!(matches!(file.number(3), Err(SpecError::OutOfRange { index: 3, len: 3 })));
    }

    #[test]
    fn test_addressing_agrees() {
        let file = sf();
        for i in 0..file.len() {
            let (n, o) = (file.number(i).unwrap(), file.order(i).unwrap());
            let by_key = file.lookup(&format!("{}.{}", n, o)).unwrap();
            assert!(std::ptr::eq(by_key, file.scan_at(i).unwrap()));
            assert_eq!(file.index(n, o).unwrap(), i);
        }
    }

    #[test]
    fn test_getitem() {
        let file = sf();
        assert_eq!(file.get(ScanRef::Index(2)).unwrap().key(), "1.2");
        assert_eq!(file.get("1.2".parse().unwrap()).unwrap().index(), 2);
        assert_eq!(file.lookup("25").unwrap().index(), 1);

        let err = file.get(ScanRef::Index(107)).unwrap_err();
        assert!(err.to_string().starts_with("Scan index must be in range"));
        assert!(matches!(ScanRef::try_from(1.2), Err(SpecError::KeyType(_))));
        assert!(matches!(file.lookup("3.2"), Err(SpecError::NotFound(_))));
        assert!(matches!(file.lookup("1.2.3"), Err(SpecError::InvalidKey(_))));
    }

    #[test]
    fn test_iterator() {
        let file = sf();
        let mut count = 0;
        for (i, scan) in file.iter().enumerate() {
            if i == 1 {
                assert_eq!(
                    scan.motor_positions().unwrap(),
                    file.scan_at(1).unwrap().motor_positions().unwrap()
                );
            }
            count += 1;
        }
        assert_eq!(count, file.len());
        assert_eq!((&file).into_iter().count(), 3);
    }

    #[test]
    fn test_scan_index() {
        let file = sf();
        assert_eq!(file.scan_at(0).unwrap().index(), 0);
        assert_eq!(file.lookup("1.2").unwrap().index(), 2);
        assert_eq!(file.lookup("25.1").unwrap().index(), 1);
    }

    #[test]
    fn test_scan_headers() {
        let file = sf();
        let scan1 = file.scan_at(0).unwrap();
        let scan25 = file.lookup("25.1").unwrap();
        assert_eq!(scan1.scan_header()["S"], file.lookup("1.1").unwrap().scan_header()["S"]);
        assert_eq!(scan25.scan_header()["S"], "25  ascan  c3th 1.33245 1.52245  40 0.15");
        assert_eq!(scan1.scan_header()["N"], "4");
        assert_eq!(scan1.scan_header_lines()[3], "#G0 0");
        assert_eq!(scan1.scan_header_lines().len(), 15);
        assert_eq!(scan1.scan_header()["UMI0"], "Current AutoM      Shutter");
        assert_eq!(scan1.scan_header()["Q"], "");
    }

    #[test]
    fn test_file_headers() {
        let file = sf();
        let scan1 = file.scan_at(0).unwrap();
        assert_eq!(scan1.file_header_lines()[1], "#E 1455180875");
        assert_eq!(scan1.file_header_lines().len(), 14);
        assert_eq!(scan1.file_header_map()["F"], "/tmp/sf.dat");
    }

    #[test]
    fn test_multiple_file_headers() {
        let file = sf();
        assert_eq!(file.lookup("1.2").unwrap().file_header_lines()[1], "#E 1455180876");
    }

    #[test]
    fn test_scan_labels() {
        let file = sf();
        assert_eq!(
            file.scan_at(0).unwrap().labels(),
            &["first column", "second column", "3rd_col"]
        );
    }

    #[test]
    fn test_data() {
        let file = sf();
        let scan1 = file.scan_at(0).unwrap();
        assert!(close(scan1.data_line(1).unwrap()[2], 1.56));
        assert_eq!(scan1.data().unwrap().shape(), (4, 3));
        assert!(close(scan1.data().unwrap().sum(), 113.631));
        assert_eq!(scan1.data().unwrap().rows(), 4);
        for k in 0..scan1.labels().len() {
            assert_eq!(
                scan1.data_column_by_name(&scan1.labels()[k]).unwrap(),
                scan1.data().unwrap().column(k).unwrap()
            );
        }
    }

    #[test]
    fn test_data_column_by_name() {
        let file = sf();
        let scan25 = file.lookup("25.1").unwrap();
        let col2 = scan25.data_column_by_name("col2").unwrap();
        assert!(close(col2[1], 1.2));
        let by_index: f64 = scan25.data().unwrap().column(2).unwrap().iter().sum();
        assert!(close(col2.iter().sum(), by_index));
        assert!(matches!(
            scan25.data_column_by_name("ygfxgfyxg"),
            Err(SpecError::NotFound(_))
        ));
    }

    #[test]
    fn test_motors() {
        let file = sf();
        let scan1 = file.scan_at(0).unwrap();
        let scan25 = file.lookup("25.1").unwrap();
        assert_eq!(scan1.motor_names().len(), 6);
        assert_eq!(scan1.motor_positions().unwrap().len(), 6);
        assert!(close(scan1.motor_positions().unwrap().iter().sum(), 223.385912));
        assert_eq!(scan1.motor_names()[1], "MRTSlit UP");
        assert!(close(scan25.motor_position_by_name("MRTSlit UP").unwrap(), -1.66875));

        for (i, name) in scan1.motor_names().iter().enumerate() {
            assert_eq!(
                scan1.motor_position_by_name(name).unwrap(),
                scan1.motor_positions().unwrap()[i]
            );
        }
    }

    #[test]
    fn test_absence_of_file_header() {
        let file = sf_no_file_header();
        assert_eq!(file.len(), 3);
        let scan1 = file.scan_at(0).unwrap();
        assert_eq!(scan1.motor_names().len(), 0);
        // positions are still read from the scan header
        assert!(close(scan1.motor_positions().unwrap().iter().sum(), 223.385912));
        assert_eq!(scan1.scan_header_lines().len(), 15);
        assert!(scan1.file_header_lines().is_empty());
        assert!(matches!(
            scan1.motor_position_by_name("MRTSlit UP"),
            Err(SpecError::NotFound(_))
        ));
        // the last scan follows the second file header and has no data
        let last = file.scan_at(2).unwrap();
        assert_eq!(last.file_header_lines().len(), 3);
        assert!(last.data().unwrap().is_empty());
    }

    #[test]
    fn test_mca() {
        let file = sf();
        assert_eq!(file.scan_at(0).unwrap().mca().unwrap().len(), 0);
        let mca = file.lookup("1.2").unwrap().mca().unwrap();
        assert_eq!(mca.len(), 2);
        assert_eq!(mca.len(), file.lookup("1.2").unwrap().data().unwrap().rows());
        assert_eq!(mca.get(1).unwrap()[2], 5.0);
        assert!(close(mca.get(1).unwrap().iter().sum(), 12.1));
        assert_eq!(mca.channels(), &[0, 1, 2]);
        assert_eq!(mca.calibration(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_mca_header() {
        let file = sf();
        assert!(file.scan_at(0).unwrap().mca_header().is_empty());
        let scan = file.lookup("1.2").unwrap();
        assert_eq!(scan.mca_header().len(), 4);
        assert_eq!(scan.mca_header()["CALIB"], "1 2 3");
        // MCA directives stay out of the scan header map but not its lines
        assert!(!scan.scan_header().contains_key("@CALIB"));
        assert_eq!(scan.scan_header_lines().len(), 7);
    }

    #[test]
    fn test_empty_file() {
        let file = SpecFile::parse("#F x\n#C no scans\n").unwrap();
        assert!(file.is_empty());
        assert!(file.list().is_empty());
        assert!(matches!(file.scan_at(0), Err(SpecError::OutOfRange { index: 0, len: 0 })));
    }

    #[test]
    fn test_shared_across_threads() {
        let file = sf();
        std::thread::scope(|s| {
            for i in 0..file.len() {
                let file = &file;
                s.spawn(move || {
                    let scan = file.scan_at(i).unwrap();
                    assert!(scan.summary().is_ok());
                });
            }
        });
    }
}
