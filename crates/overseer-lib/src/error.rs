//! Error types for the overseer library

use std::path::PathBuf;
use thiserror::Error;

/// Failures while reading or rewriting a table file
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Arrow error on {path}: {source}")]
    Arrow {
        path: PathBuf,
        #[source]
        source: arrow::error::ArrowError,
    },

    #[error("schema mismatch in {path}: column `{column}` {reason}")]
    Schema {
        path: PathBuf,
        column: String,
        reason: String,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn arrow(path: impl Into<PathBuf>, source: arrow::error::ArrowError) -> Self {
        Self::Arrow {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn schema(
        path: impl Into<PathBuf>,
        column: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Schema {
            path: path.into(),
            column: column.into(),
            reason: reason.into(),
        }
    }
}

/// Failures while expanding a node-range expression
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NodeListError {
    #[error("malformed node list `{0}`, expected e.g. `host[1,3-5]`")]
    Malformed(String),

    #[error("inverted range `{start}-{end}` in node list")]
    InvertedRange { start: u64, end: u64 },

    #[error("node number `{0}` is out of range")]
    Number(String),

    #[error("node list expands to more than {limit} hosts")]
    TooLarge { limit: u64 },
}

/// Failures while probing the host
#[derive(Debug, Error)]
pub enum SampleError {
    #[error("could not resolve hostname: {0}")]
    Hostname(#[source] std::io::Error),

    #[error("hostname is not valid UTF-8")]
    HostnameEncoding,
}

/// Failures while parsing the GPU query tool's CSV output
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GpuParseError {
    #[error("expected {expected} fields, found {found} in line `{line}`")]
    FieldCount {
        expected: usize,
        found: usize,
        line: String,
    },

    #[error("invalid GPU index `{0}`")]
    Index(String),
}
