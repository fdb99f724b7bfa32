//! Errors raised while loading `GeoJSON` layers.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Location of a parse failure inside a `GeoJSON` sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourcePosition {
    /// Line number in the source (1-based)
    pub line: Option<u64>,
    /// Feature number in the source (1-based)
    pub record: Option<u64>,
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.line, self.record) {
            (Some(line), Some(record)) => write!(f, "line {line}, record {record}"),
            (Some(line), None) => write!(f, "line {line}"),
            (None, Some(record)) => write!(f, "record {record}"),
            (None, None) => write!(f, "unknown position"),
        }
    }
}

/// Failure to load a `GeoJSON` document into a layer.
#[derive(Debug, Error)]
pub enum GeoJsonReadError {
    /// The file could not be read.
    #[error("I/O error while reading {path}: {source}")]
    Io {
        /// The file being read
        path: PathBuf,
        /// The originating error
        #[source]
        source: std::io::Error,
    },

    /// The document is neither a `GeoJSON` object nor a `GeoJSON` sequence.
    #[error("Parse error while reading {context}{}: {message}", fmt_position(.position.as_ref()))]
    Parse {
        /// Human readable description of the failure
        message: String,
        /// Where the failure occurred, if known
        position: Option<SourcePosition>,
        /// What was being read
        context: String,
    },
}

fn fmt_position(position: Option<&SourcePosition>) -> String {
    position.map(|pos| format!(" at {pos}")).unwrap_or_default()
}

/// Result type alias that uses [`GeoJsonReadError`].
pub type GeoJsonResult<T> = Result<T, GeoJsonReadError>;
