//! A parser for SPICE3 rawfiles, as written by ngspice and Xyce with `-r`.
//!
//! Both the ASCII (`Values:`) and binary (`Binary:`) encodings are supported,
//! with real or complex data. A file may hold several plots back to back.

use serde::Serialize;
use thiserror::Error;

pub mod parser;

pub use parser::{Analysis, ComplexVec, Data, Variable};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rawfile<'a> {
    pub analyses: Vec<Analysis<'a>>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("malformed rawfile at byte {offset} ({kind:?})")]
    Parse {
        offset: usize,
        kind: nom::error::ErrorKind,
    },
    #[error("rawfile ended before all {expected} points were read")]
    Truncated { expected: usize },
    #[error("invalid value for header `{key}`: {value}")]
    Header { key: String, value: String },
    #[error("rawfile has no plots")]
    Empty,
}

pub type Result<T> = std::result::Result<T, Error>;

/// Parse the given rawfile data.
pub fn parse(input: &[u8]) -> Result<Rawfile<'_>> {
    parser::parse_rawfile(input).map(|analyses| Rawfile { analyses })
}
