//! Peripheral-side vocabulary: which device, which axis, which lifecycle event.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// The two peripheral families the recorder understands.
///
/// One session per kind may be active at a time; a ring session and a wrist
/// session are independent of each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeripheralKind {
    /// BLE ring streaming COBS-framed notifications
    Ring,
    /// Wrist-worn host delivering typed per-axis sensor events
    Wrist,
}

impl PeripheralKind {
    /// All kinds, in a stable order.
    pub const ALL: [PeripheralKind; 2] = [PeripheralKind::Ring, PeripheralKind::Wrist];

    /// Suffix used in session file names (`...-ring.data`, `...-watch.data`).
    pub fn file_suffix(self) -> &'static str {
        match self {
            PeripheralKind::Ring => "ring",
            PeripheralKind::Wrist => "watch",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PeripheralKind::Ring => "ring",
            PeripheralKind::Wrist => "wrist",
        }
    }
}

impl fmt::Display for PeripheralKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single-axis sensor families delivered by the wrist host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisKind {
    /// Gyroscope (rad/s)
    Gyro,
    /// Accelerometer including gravity (m/s²)
    Accel,
    /// Magnetometer (µT)
    Mag,
    /// Linear acceleration, gravity removed (m/s²)
    LinearAccel,
}

impl AxisKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AxisKind::Gyro => "gyro",
            AxisKind::Accel => "accel",
            AxisKind::Mag => "mag",
            AxisKind::LinearAccel => "linear_accel",
        }
    }
}

/// One raw reading from a wrist-host sensor callback.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisEvent {
    /// Which sensor produced the reading
    pub kind: AxisKind,

    /// x, y, z in the sensor's native unit
    pub values: [f32; 3],

    /// Device timestamp (nanoseconds since device boot)
    pub timestamp_nanos: i64,
}

impl AxisEvent {
    pub fn new(kind: AxisKind, values: [f32; 3], timestamp_nanos: i64) -> Self {
        Self {
            kind,
            values,
            timestamp_nanos,
        }
    }
}

/// Why a transport link went down.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisconnectReason {
    /// Link closed with a success status (local cancel or orderly shutdown)
    Clean,
    /// Peripheral went out of range or stopped responding
    Timeout,
    /// Peripheral initiated the disconnect
    RemoteTerminated,
    /// Host stack dropped the link on its own
    LocalHostTerminated,
    /// Anything else the platform reports
    Other(String),
}

impl DisconnectReason {
    /// Only a clean close is expected; every other reason warrants an alert.
    pub fn is_clean(&self) -> bool {
        matches!(self, DisconnectReason::Clean)
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::Clean => f.write_str("clean"),
            DisconnectReason::Timeout => f.write_str("connection timeout"),
            DisconnectReason::RemoteTerminated => f.write_str("remote terminated"),
            DisconnectReason::LocalHostTerminated => f.write_str("local host terminated"),
            DisconnectReason::Other(reason) => write!(f, "{reason}"),
        }
    }
}

/// Transport callbacks, flattened into one value so they can cross a channel
/// from the transport I/O thread to the session task.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Connected,
    Bytes(Bytes),
    Axis(AxisEvent),
    Disconnected(DisconnectReason),
}
