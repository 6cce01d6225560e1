//! Unified error types for The Watcher workspace.
//!
//! Only [`WatcherError::SourceUnavailable`] and
//! [`WatcherError::InvalidHeader`] ever escape a capture call. Row-level
//! variants are produced internally and absorbed by the table parsers.

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum WatcherError {
    /// The raw socket table or system query could not be obtained at all.
    #[error("socket source {source_name} unavailable: {source}")]
    SourceUnavailable {
        /// Path or query name that failed.
        source_name: String,
        /// Underlying I/O or OS error.
        source: std::io::Error,
    },

    /// One row of a text socket table failed to decode.
    #[error("malformed row {line}: {reason}")]
    MalformedRow {
        /// 1-based line number within the table, header included.
        line: usize,
        /// What was wrong with the row.
        reason: String,
    },

    /// A connection-state code outside the platform's known range.
    #[error("unknown socket state code {code:#x}")]
    UnknownState {
        /// The raw code as read from the table.
        code: i64,
    },

    /// The generation header of a pcblist buffer failed validation.
    #[error("invalid pcblist header: expected length {expected}, got {actual}")]
    InvalidHeader {
        /// Expected header length in bytes.
        expected: usize,
        /// Length declared by the buffer (or the buffer size if truncated).
        actual: usize,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },
}

impl WatcherError {
    /// Returns whether this error aborts a whole capture call.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::SourceUnavailable { .. } | Self::InvalidHeader { .. } | Self::Config { .. }
        )
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, WatcherError>;
