//! # Ingestion
//!
//! Turns raw transport input into motion samples.
//!
//! Responsibilities:
//! - Reassemble and COBS-decode ring notification bytes (`FrameDecoder`)
//! - Extract channels and device clock from sensor-stream frames (`RingRecordCodec`)
//! - Fuse per-axis wrist callbacks into complete samples (`SensorFusionAccumulator`)
//! - Cap wrist output at the target cadence (`SampleRateGovernor`)
//! - Count discarded and rejected input for diagnostics (`IngestionMetrics`)
//!
//! Nothing here touches the clock or the file system; the session layer owns
//! both.
//!
//! ## Usage Example
//!
//! ```
//! use ingestion::{cobs_encode, encode_sensor_frame, FrameDecoder, RingRecordCodec};
//! use contracts::MotionChannels;
//!
//! let wire = cobs_encode(&encode_sensor_frame(&MotionChannels::default(), 2_000_000));
//! let mut decoder = FrameDecoder::new(256);
//! let codec = RingRecordCodec::default();
//!
//! for frame in decoder.feed(&wire) {
//!     let payload = codec.decode(&frame).unwrap();
//!     assert_eq!(payload.device_timestamp_ms, 2_000);
//! }
//! ```

mod frame_decoder;
mod fusion;
mod governor;
mod metrics;
pub mod orientation;
mod ring_codec;

// Re-exports
pub use frame_decoder::{
    cobs_decode, cobs_encode, DecodedFrame, FrameDecoder, DEFAULT_FRAME_CAPACITY,
    FRAME_DELIMITER,
};
pub use fusion::{FusedSample, SensorFusionAccumulator, DEGREES_PER_RADIAN, STANDARD_GRAVITY};
pub use governor::{SampleRateGovernor, DEFAULT_TARGET_RATE_HZ};
pub use metrics::{IngestionMetrics, MetricsSnapshot};
pub use ring_codec::{
    encode_sensor_frame, RingPayload, RingRecordCodec, SENSOR_FRAME_LEN, SENSOR_STREAM_TAG,
};
