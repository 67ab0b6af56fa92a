//! Storage error types

use std::path::PathBuf;

use contracts::RECORD_LEN;
use thiserror::Error;

/// Storage-specific errors
///
/// Every variant is fatal to the session that owns the file.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Target file could not be created
    #[error("failed to open '{}': {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Append or flush failed
    #[error("failed to write '{}': {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Caller handed over something that is not one record
    #[error("record must be exactly {expected} bytes, got {actual}", expected = RECORD_LEN)]
    RecordSize { actual: usize },

    /// Append after close
    #[error("'{}' is already closed", .path.display())]
    Closed { path: PathBuf },

    /// Renaming the open file failed
    #[error("failed to rename '{}' to '{}': {source}", .from.display(), .to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Data file is not a whole number of records
    #[error("'{}' has {trailing} trailing bytes after {records} records", .path.display())]
    TrailingBytes {
        path: PathBuf,
        records: usize,
        trailing: usize,
    },

    /// Read failed
    #[error("failed to read '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    pub fn open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Open {
            path: path.into(),
            source,
        }
    }

    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
