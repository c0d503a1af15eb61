//! SPEC file core types: line tokenizer, scan keys, header values and errors.
//!
//! This crate has no notion of scans; it only classifies lines and parses
//! the small value grammars shared by the reader and its callers.

pub mod error;
pub mod key;
pub mod line;
pub mod value;

pub use error::*;
pub use key::*;
pub use line::*;
pub use value::*;
