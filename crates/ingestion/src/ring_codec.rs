//! Ring sensor-stream frame codec
//!
//! The ring multiplexes several packet types over one characteristic. Only
//! frames carrying the sensor-stream tag become records; everything else is
//! ignored without error.
//!
//! Decoded sensor-stream layout (109 bytes):
//!
//! | bytes   | content                          | kept |
//! |---------|----------------------------------|------|
//! | 0-3     | tag `03 01 69 00`                |      |
//! | 4-39    | gyro, accel, mag (9 × f32)       | yes  |
//! | 40-55   | raw pose quaternion              |      |
//! | 56-71   | current pose quaternion          | yes  |
//! | 72-83   | Euler angles                     |      |
//! | 84-95   | linear acceleration (3 × f32)    | yes  |
//! | 96-100  | peak flag and velocity           |      |
//! | 101-108 | device timestamp (i64, µs)       | yes  |

use std::ops::Range;
use std::sync::Arc;

use contracts::{MotionChannels, CHANNELS_LEN};
use tracing::trace;

use crate::metrics::IngestionMetrics;

/// Leading bytes of a sensor-stream frame.
pub const SENSOR_STREAM_TAG: [u8; 4] = [3, 1, 105, 0];

/// Decoded length of a sensor-stream frame.
pub const SENSOR_FRAME_LEN: usize = 109;

const MOTION_RANGE: Range<usize> = 4..40;
const POSE_RANGE: Range<usize> = 56..72;
const LINEAR_ACCEL_RANGE: Range<usize> = 84..96;
const TIMESTAMP_RANGE: Range<usize> = 101..109;

/// Channels and device clock extracted from one sensor-stream frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingPayload {
    pub channels: MotionChannels,

    /// Device clock, microseconds truncated to milliseconds
    pub device_timestamp_ms: i64,
}

/// Sensor-stream frame decoder.
#[derive(Debug, Clone)]
pub struct RingRecordCodec {
    metrics: Arc<IngestionMetrics>,
}

impl Default for RingRecordCodec {
    fn default() -> Self {
        Self::new(Arc::new(IngestionMetrics::new()))
    }
}

impl RingRecordCodec {
    pub fn new(metrics: Arc<IngestionMetrics>) -> Self {
        Self { metrics }
    }

    /// Extract a payload, or `None` for any frame that is not a sensor-stream
    /// packet.
    pub fn decode(&self, frame: &[u8]) -> Option<RingPayload> {
        if !frame.starts_with(&SENSOR_STREAM_TAG) {
            trace!(len = frame.len(), "non-sensor frame ignored");
            self.metrics.record_header_reject();
            return None;
        }

        if frame.len() < SENSOR_FRAME_LEN {
            trace!(len = frame.len(), "sensor frame too short");
            self.metrics.record_short_frame();
            return None;
        }

        let mut block = [0u8; CHANNELS_LEN];
        let motion_end = MOTION_RANGE.len();
        let pose_end = motion_end + POSE_RANGE.len();
        block[..motion_end].copy_from_slice(&frame[MOTION_RANGE]);
        block[motion_end..pose_end].copy_from_slice(&frame[POSE_RANGE]);
        block[pose_end..].copy_from_slice(&frame[LINEAR_ACCEL_RANGE]);

        let mut ts = [0u8; 8];
        ts.copy_from_slice(&frame[TIMESTAMP_RANGE]);
        let device_timestamp_us = i64::from_le_bytes(ts);

        self.metrics.record_payload();
        Some(RingPayload {
            channels: MotionChannels::from_le_bytes(&block),
            device_timestamp_ms: device_timestamp_us / 1000,
        })
    }

    pub fn metrics(&self) -> &Arc<IngestionMetrics> {
        &self.metrics
    }
}

/// Build a decoded sensor-stream frame. Used by replay tooling and tests.
pub fn encode_sensor_frame(channels: &MotionChannels, device_timestamp_us: i64) -> Vec<u8> {
    let block = channels.to_le_bytes();
    let motion_end = MOTION_RANGE.len();
    let pose_end = motion_end + POSE_RANGE.len();

    let mut frame = vec![0u8; SENSOR_FRAME_LEN];
    frame[..4].copy_from_slice(&SENSOR_STREAM_TAG);
    frame[MOTION_RANGE].copy_from_slice(&block[..motion_end]);
    frame[POSE_RANGE].copy_from_slice(&block[motion_end..pose_end]);
    frame[LINEAR_ACCEL_RANGE].copy_from_slice(&block[pose_end..]);
    frame[TIMESTAMP_RANGE].copy_from_slice(&device_timestamp_us.to_le_bytes());
    frame
}
