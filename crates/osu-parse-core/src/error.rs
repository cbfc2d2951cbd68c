//! Error types for osu-parse-core

use std::fmt;

use thiserror::Error;

/// Which file format a version check failed for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatKind {
    Beatmap,
    Replay,
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatKind::Beatmap => write!(f, "beatmap"),
            FormatKind::Replay => write!(f, "replay"),
        }
    }
}

/// Main error type for decode and compute operations
///
/// Every variant is terminal for the call that raised it; no partial record
/// is ever returned alongside an error.
#[derive(Error, Debug)]
pub enum Error {
    #[error("unexpected end of input at offset {offset}: needed {need} bytes, {have} remaining")]
    UnexpectedEof {
        offset: usize,
        need: usize,
        have: usize,
    },

    #[error("malformed encoding at offset {offset}: {reason}")]
    MalformedEncoding { offset: usize, reason: String },

    #[error("unsupported {format} format version: {version}")]
    UnsupportedFormatVersion { format: FormatKind, version: i64 },

    #[error("truncated payload: declared {declared} bytes, only {available} available")]
    TruncatedPayload { declared: usize, available: usize },

    #[error("inconsistent score statistics: {0}")]
    InconsistentScoreStats(String),

    #[error("internal fault: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn malformed(offset: usize, reason: impl Into<String>) -> Self {
        Error::MalformedEncoding {
            offset,
            reason: reason.into(),
        }
    }
}

/// Result type alias for osu-parse operations
pub type Result<T> = std::result::Result<T, Error>;
