//! SensorRecord - the persisted unit
//!
//! Fixed 80-byte little-endian layout shared by ring and wrist files:
//!
//! | bytes  | content                                  |
//! |--------|------------------------------------------|
//! | 0-11   | gyroscope x, y, z (f32)                  |
//! | 12-23  | accelerometer x, y, z (f32)              |
//! | 24-35  | magnetometer x, y, z (f32)               |
//! | 36-51  | pose quaternion (4 × f32)                |
//! | 52-63  | linear acceleration x, y, z (f32)        |
//! | 64-71  | synchronized device timestamp (i64, ms)  |
//! | 72-79  | host-receipt timestamp (i64, ms)         |
//!
//! There is no header, trailer or record count in a data file; readers derive
//! the count from `file_len / RECORD_LEN`.

use serde::{Deserialize, Serialize};

use crate::ContractError;

/// Size of one persisted record.
pub const RECORD_LEN: usize = 80;

/// Size of the motion-channel block at the start of a record.
pub const CHANNELS_LEN: usize = 64;

/// One encoded record, ready to append.
pub type RecordBytes = [u8; RECORD_LEN];

/// The sixteen motion channels in storage order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MotionChannels {
    pub gyro: [f32; 3],
    pub accel: [f32; 3],
    pub mag: [f32; 3],
    pub pose: [f32; 4],
    pub linear_accel: [f32; 3],
}

impl MotionChannels {
    /// Flatten into storage order.
    pub fn to_array(&self) -> [f32; 16] {
        let mut out = [0.0f32; 16];
        out[0..3].copy_from_slice(&self.gyro);
        out[3..6].copy_from_slice(&self.accel);
        out[6..9].copy_from_slice(&self.mag);
        out[9..13].copy_from_slice(&self.pose);
        out[13..16].copy_from_slice(&self.linear_accel);
        out
    }

    pub fn from_array(values: [f32; 16]) -> Self {
        let mut channels = Self::default();
        channels.gyro.copy_from_slice(&values[0..3]);
        channels.accel.copy_from_slice(&values[3..6]);
        channels.mag.copy_from_slice(&values[6..9]);
        channels.pose.copy_from_slice(&values[9..13]);
        channels.linear_accel.copy_from_slice(&values[13..16]);
        channels
    }

    /// Decode the 64-byte channel block. Bit patterns are preserved exactly.
    pub fn from_le_bytes(bytes: &[u8; CHANNELS_LEN]) -> Self {
        let mut values = [0.0f32; 16];
        for (value, chunk) in values.iter_mut().zip(bytes.chunks_exact(4)) {
            *value = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Self::from_array(values)
    }

    pub fn to_le_bytes(&self) -> [u8; CHANNELS_LEN] {
        let mut out = [0u8; CHANNELS_LEN];
        for (chunk, value) in out.chunks_exact_mut(4).zip(self.to_array()) {
            chunk.copy_from_slice(&value.to_le_bytes());
        }
        out
    }
}

/// One synchronized sensor record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorRecord {
    /// Motion channels
    pub channels: MotionChannels,

    /// Device timestamp after clock-offset correction (ms since epoch)
    pub device_timestamp_ms: i64,

    /// Host wall-clock time when the record was decoded (ms since epoch)
    pub host_timestamp_ms: i64,
}

/// Record emitted by the ring pipeline.
pub type RingRecord = SensorRecord;

/// Record emitted by the wrist pipeline.
pub type WristRecord = SensorRecord;

impl SensorRecord {
    pub fn to_bytes(&self) -> RecordBytes {
        let mut out = [0u8; RECORD_LEN];
        out[..CHANNELS_LEN].copy_from_slice(&self.channels.to_le_bytes());
        out[64..72].copy_from_slice(&self.device_timestamp_ms.to_le_bytes());
        out[72..80].copy_from_slice(&self.host_timestamp_ms.to_le_bytes());
        out
    }

    /// Decode one record.
    ///
    /// # Errors
    /// `RecordLength` if `bytes` is not exactly [`RECORD_LEN`] long.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ContractError> {
        let bytes: &RecordBytes = bytes.try_into().map_err(|_| ContractError::RecordLength {
            expected: RECORD_LEN,
            actual: bytes.len(),
        })?;

        let mut channels = [0u8; CHANNELS_LEN];
        channels.copy_from_slice(&bytes[..CHANNELS_LEN]);
        let mut device = [0u8; 8];
        device.copy_from_slice(&bytes[64..72]);
        let mut host = [0u8; 8];
        host.copy_from_slice(&bytes[72..80]);

        Ok(Self {
            channels: MotionChannels::from_le_bytes(&channels),
            device_timestamp_ms: i64::from_le_bytes(device),
            host_timestamp_ms: i64::from_le_bytes(host),
        })
    }

    /// Host-receipt time minus synchronized device time.
    pub fn skew_ms(&self) -> i64 {
        self.host_timestamp_ms - self.device_timestamp_ms
    }
}
