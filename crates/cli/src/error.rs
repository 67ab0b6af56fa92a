//! Error types for CLI operations.

use std::path::PathBuf;

use contracts::{DisconnectReason, PeripheralKind};
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {}", .path.display())]
    ConfigNotFound { path: PathBuf },

    /// A capture line could not be parsed
    #[error("{}:{line}: {message}", .path.display())]
    CaptureParse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// The capture holds nothing to replay
    #[error("Capture is empty: {}", .path.display())]
    EmptyCapture { path: PathBuf },

    /// The replay session never connected
    #[error("{peripheral} session failed to connect")]
    ConnectFailed { peripheral: PeripheralKind },

    /// The session lost its link mid-replay
    #[error("{peripheral} session disconnected unexpectedly: {reason}")]
    UnexpectedDisconnect {
        peripheral: PeripheralKind,
        reason: DisconnectReason,
    },

    /// The session could not persist records
    #[error("{peripheral} storage failed: {message}")]
    StorageFailed {
        peripheral: PeripheralKind,
        message: String,
    },

    /// Replay did not finish in time
    #[error("Replay timed out after {seconds}s")]
    Timeout { seconds: u64 },
}

impl CliError {
    pub fn config_not_found(path: impl Into<PathBuf>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn capture_parse(path: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        Self::CaptureParse {
            path: path.into(),
            line,
            message: message.into(),
        }
    }
}
