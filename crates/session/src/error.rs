//! Session error types

use contracts::{ContractError, PeripheralKind};
use storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    /// The blueprint disables this peripheral, or no binding was registered
    #[error("no session configured for {0}")]
    NotConfigured(PeripheralKind),

    /// The session task has exited and no longer accepts commands
    #[error("{0} session runtime is gone")]
    RuntimeGone(PeripheralKind),

    /// A corrected participant id that cannot be used in file names
    #[error("invalid participant id: {0}")]
    InvalidParticipant(#[source] ContractError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("transport error: {0}")]
    Transport(#[from] ContractError),
}

pub type Result<T> = std::result::Result<T, SessionError>;
