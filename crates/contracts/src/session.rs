//! Session lifecycle states and the signals surfaced to the UI layer.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{DisconnectReason, PeripheralKind};

/// Session state machine
///
/// `Idle -> Connecting -> Recording -> Disconnecting -> Idle`, plus
/// `Connecting -> Idle` on connect timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Connecting,
    Recording,
    Disconnecting,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Connecting => "connecting",
            SessionState::Recording => "recording",
            SessionState::Disconnecting => "disconnecting",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-visible outcome of a session transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionSignal {
    /// Link up, data file open
    Connected,
    /// No connection within the timeout window
    ConnectFailed,
    /// Link lost while recording; the UI must alert the operator
    UnexpectedDisconnect { reason: DisconnectReason },
    /// Session closed and data file finalized
    RecordingStopped,
    /// Durable storage failed; the session is being torn down
    StorageFailed { message: String },
}

/// A signal tagged with the peripheral that raised it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalEvent {
    pub peripheral: PeripheralKind,
    pub signal: SessionSignal,
}
