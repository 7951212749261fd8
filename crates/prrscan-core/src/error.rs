//! Error types for the prrscan-core library.
//!
//! This module provides comprehensive error handling using the `thiserror` crate,
//! with detailed error variants for different failure modes.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for prrscan operations
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type for all prrscan operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Failed to open input file
    #[error("failed to open file '{path}': {source}")]
    FileOpen {
        /// Path to the file that failed to open
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to probe file size
    #[error("failed to probe size of '{path}': {source}")]
    FileProbe {
        /// Path to the file that failed to probe
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// File does not start with a file-attributes record
    #[error("file does not start with a file-attributes record, found type {found}")]
    MissingFileHeader {
        /// Type code of the record actually found at offset 0
        found: u8,
    },

    /// File originates from an unsupported platform
    #[error("unsupported CPU type: {0}")]
    UnsupportedPlatform(u8),

    /// File uses an unsupported format version
    #[error("unsupported STDF version: {0}")]
    UnsupportedVersion(u8),

    /// Read or seek failure mid-scan
    #[error("stream error at offset {offset}: {source}")]
    Stream {
        /// Byte offset where the failure occurred
        offset: u64,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A record declared a length the cursor cannot be trusted past
    #[error("corrupt record at offset {offset}: declared length {length} exceeds {max} bytes")]
    CorruptRecord {
        /// Byte offset of the record
        offset: u64,
        /// The declared payload length
        length: u64,
        /// The sanity ceiling it exceeded
        max: u64,
    },

    /// A record payload ended before its required fields
    #[error("truncated record payload at offset {offset}: {details}")]
    TruncatedRecord {
        /// Byte offset of the record
        offset: u64,
        /// Detailed description of the issue
        details: String,
    },

    /// Cursor position could not be recovered
    #[error("cursor invalid after {attempts} consecutive position failures")]
    CursorLost {
        /// Number of consecutive failed position probes
        attempts: u32,
    },

    /// A sync-message field failed to parse
    #[error("invalid sync message field '{field}': {details}")]
    SyncField {
        /// Name of the offending field
        field: &'static str,
        /// Detailed description of the issue
        details: String,
    },

    /// Failed to write the output document
    #[error("failed to write report '{path}': {source}")]
    ReportWrite {
        /// Path to the artifact that failed to write
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Generic internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Creates a new file open error
    pub fn file_open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileOpen {
            path: path.into(),
            source,
        }
    }

    /// Creates a new file probe error
    pub fn file_probe(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileProbe {
            path: path.into(),
            source,
        }
    }

    /// Creates a new mid-scan stream error
    pub fn stream(offset: u64, source: std::io::Error) -> Self {
        Self::Stream { offset, source }
    }

    /// Creates a new corrupt record error
    pub fn corrupt_record(offset: u64, length: u64, max: u64) -> Self {
        Self::CorruptRecord {
            offset,
            length,
            max,
        }
    }

    /// Creates a new truncated record error
    pub fn truncated_record(offset: u64, details: impl Into<String>) -> Self {
        Self::TruncatedRecord {
            offset,
            details: details.into(),
        }
    }

    /// Creates a new sync-message field error
    pub fn sync_field(field: &'static str, details: impl Into<String>) -> Self {
        Self::SyncField {
            field,
            details: details.into(),
        }
    }

    /// Creates a new report write error
    pub fn report_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReportWrite {
            path: path.into(),
            source,
        }
    }

    /// Creates a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns true if this is a recoverable error that discards one
    /// record and lets the scan continue
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::TruncatedRecord { .. })
    }
}
