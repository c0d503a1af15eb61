//! SPEC file reader: scan index, lazily materialized scan records and MCA spectra.
//!
//! ```no_run
//! use specfile_io::SpecFile;
//!
//! let sf = SpecFile::open("data.spec")?;
//! for scan in &sf {
//!     println!("{} {} rows", scan.key(), scan.data()?.rows());
//! }
//! let col = sf.lookup("25.1")?.data_column_by_name("col2")?;
//! # Ok::<(), specfile_io::SpecError>(())
//! ```

pub mod data;
pub mod header;
mod index;
pub mod mca;
pub mod reader;
pub mod scan;
pub mod summary;

pub use data::DataMatrix;
pub use header::FileHeader;
pub use mca::Mca;
pub use reader::{ReadOptions, RowPolicy, SpecFile};
pub use scan::Scan;
pub use summary::ScanSummary;

pub use specfile_core::{parse_key, HeaderValue, ScanRef, SpecError};
