//! Defines structured error types for parsing cgroup statistics.
//!
//! - [`StatParseError::InvalidKeyValue`] — A known key carried a non-numeric value.
//! - [`StatParseError::InvalidValue`] — A single-value file (e.g., `memory.current`) failed to parse.
//! - [`StatParseError::DuplicateField`] — A flat keyed file listed the same key twice.
//! - [`StatParseError::Io`] — Reading the underlying file failed.

use std::num::ParseIntError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatParseError {
    #[error("duplicate field '{field}' at line {line}")]
    DuplicateField { field: String, line: usize },

    #[error("invalid value for '{key}' at line {line}: '{value}': {source}")]
    InvalidKeyValue {
        key: String,
        value: String,
        line: usize,
        #[source]
        source: ParseIntError,
    },

    #[error("invalid value at line {line}: '{value}': {source}")]
    InvalidValue {
        value: String,
        line: usize,
        #[source]
        source: ParseIntError,
    },

    #[error("error during I/O: {0}")]
    Io(#[from] std::io::Error),
}
