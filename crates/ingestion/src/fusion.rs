//! Wrist-path sensor fusion
//!
//! The wrist host delivers each axis as a separate callback at its own
//! cadence. The accumulator keeps the latest value per axis, derives a pose
//! whenever a fresh accelerometer/magnetometer pair is available, and releases
//! a sample only once every channel has been refreshed since the previous
//! release.

use std::sync::Arc;

use contracts::{AxisEvent, AxisKind, MotionChannels};
use tracing::trace;

use crate::metrics::IngestionMetrics;
use crate::orientation::pose_quaternion;

/// rad/s → deg/s
pub const DEGREES_PER_RADIAN: f32 = 57.29578;

/// m/s² per g
pub const STANDARD_GRAVITY: f32 = 9.80665;

const NANOS_PER_MILLI: i64 = 1_000_000;

/// One fused wrist sample, ready for clock synchronization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusedSample {
    pub channels: MotionChannels,

    /// Device clock of the last contributing event, in milliseconds
    pub device_timestamp_ms: i64,
}

/// Freshness flags, one per channel group.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Freshness {
    gyro: bool,
    accel: bool,
    mag: bool,
    pose: bool,
    linear_accel: bool,
}

impl Freshness {
    fn all(&self) -> bool {
        self.gyro && self.accel && self.mag && self.pose && self.linear_accel
    }
}

/// Barrier over the five wrist channel groups.
#[derive(Debug)]
pub struct SensorFusionAccumulator {
    fresh: Freshness,
    channels: MotionChannels,
    /// Accelerometer in m/s², as the pose math expects
    raw_accel: [f32; 3],
    timestamp_nanos: i64,
    metrics: Arc<IngestionMetrics>,
}

impl Default for SensorFusionAccumulator {
    fn default() -> Self {
        Self::new(Arc::new(IngestionMetrics::new()))
    }
}

impl SensorFusionAccumulator {
    pub fn new(metrics: Arc<IngestionMetrics>) -> Self {
        Self {
            fresh: Freshness::default(),
            channels: MotionChannels::default(),
            raw_accel: [0.0; 3],
            timestamp_nanos: 0,
            metrics,
        }
    }

    /// Absorb one axis callback.
    pub fn on_axis_event(&mut self, event: &AxisEvent) {
        let [x, y, z] = event.values;
        match event.kind {
            AxisKind::Gyro => {
                self.channels.gyro = [
                    x * DEGREES_PER_RADIAN,
                    y * DEGREES_PER_RADIAN,
                    z * DEGREES_PER_RADIAN,
                ];
                self.fresh.gyro = true;
            }
            AxisKind::Accel => {
                self.raw_accel = event.values;
                self.channels.accel = to_g(event.values);
                self.fresh.accel = true;
            }
            AxisKind::Mag => {
                self.channels.mag = event.values;
                self.fresh.mag = true;
            }
            AxisKind::LinearAccel => {
                self.channels.linear_accel = to_g(event.values);
                self.fresh.linear_accel = true;
            }
        }
        self.timestamp_nanos = event.timestamp_nanos;

        let pose_input = matches!(event.kind, AxisKind::Accel | AxisKind::Mag);
        if pose_input && self.fresh.accel && self.fresh.mag {
            self.derive_pose();
        }
    }

    /// Release a sample if every channel is fresh, clearing all flags.
    pub fn take_fused(&mut self) -> Option<FusedSample> {
        if !self.fresh.all() {
            return None;
        }
        self.fresh = Freshness::default();
        Some(FusedSample {
            channels: self.channels,
            device_timestamp_ms: self.timestamp_nanos / NANOS_PER_MILLI,
        })
    }

    /// Forget all accumulated state; used when a new session starts.
    pub fn reset(&mut self) {
        self.fresh = Freshness::default();
        self.channels = MotionChannels::default();
        self.raw_accel = [0.0; 3];
        self.timestamp_nanos = 0;
    }

    pub fn metrics(&self) -> &Arc<IngestionMetrics> {
        &self.metrics
    }

    // An undefined rotation matrix keeps the previous quaternion but still
    // counts as a pose update.
    fn derive_pose(&mut self) {
        match pose_quaternion(self.raw_accel, self.channels.mag) {
            Some(q) => self.channels.pose = q,
            None => trace!("rotation matrix undefined, keeping previous pose"),
        }
        self.fresh.pose = true;
    }
}

fn to_g(values: [f32; 3]) -> [f32; 3] {
    values.map(|v| v / STANDARD_GRAVITY)
}
