//! RecordPipeline - from transport payloads to synchronized records
//!
//! Ring: `FrameDecoder -> RingRecordCodec -> ClockSync`.
//! Wrist: `SensorFusionAccumulator -> SampleRateGovernor -> ClockSync`.
//!
//! Both paths end in the same place: a [`SensorRecord`] whose device
//! timestamp has been mapped onto host time, and a drift check against the
//! previous record. Persisting the record is the controller's job.

use std::sync::Arc;

use contracts::{AxisEvent, MotionChannels, PeripheralKind, RecorderBlueprint, SensorRecord};
use ingestion::{
    FrameDecoder, IngestionMetrics, RingRecordCodec, SampleRateGovernor, SensorFusionAccumulator,
    SENSOR_STREAM_TAG,
};
use sync_engine::{ClockSync, DriftMonitor};
use tracing::{debug, trace};

enum Source {
    Ring {
        decoder: FrameDecoder,
        codec: RingRecordCodec,
    },
    Wrist {
        fusion: SensorFusionAccumulator,
        governor: SampleRateGovernor,
    },
}

pub struct RecordPipeline {
    kind: PeripheralKind,
    source: Source,
    clock: ClockSync,
    drift: DriftMonitor,
    metrics: Arc<IngestionMetrics>,
    /// Host time the current session entered `Recording`
    started_at_ms: i64,
}

impl std::fmt::Debug for RecordPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordPipeline")
            .field("kind", &self.kind)
            .field("clock", &self.clock)
            .field("drift", &self.drift)
            .field("started_at_ms", &self.started_at_ms)
            .finish()
    }
}

impl RecordPipeline {
    pub fn new(kind: PeripheralKind, blueprint: &RecorderBlueprint) -> Self {
        let metrics = Arc::new(IngestionMetrics::new());
        let source = match kind {
            PeripheralKind::Ring => Source::Ring {
                decoder: FrameDecoder::with_metrics(blueprint.ring.max_frame_len, metrics.clone()),
                codec: RingRecordCodec::new(metrics.clone()),
            },
            PeripheralKind::Wrist => Source::Wrist {
                fusion: SensorFusionAccumulator::new(metrics.clone()),
                governor: SampleRateGovernor::new(blueprint.wrist.target_rate_hz),
            },
        };

        Self {
            kind,
            source,
            clock: ClockSync::new(),
            drift: DriftMonitor::new(kind, blueprint.clock(kind)),
            metrics,
            started_at_ms: 0,
        }
    }

    /// Forget everything from the previous session.
    pub fn reset(&mut self, started_at_ms: i64) {
        match &mut self.source {
            Source::Ring { decoder, .. } => decoder.reset(),
            Source::Wrist { fusion, governor } => {
                fusion.reset();
                governor.reset();
            }
        }
        self.clock.reset();
        self.drift.reset();
        self.started_at_ms = started_at_ms;
    }

    /// Ring path. Every frame completed by `chunk` that carries sensor data
    /// becomes one record, all stamped with the same receipt time.
    pub fn push_bytes(&mut self, chunk: &[u8], host_now_ms: i64) -> Vec<SensorRecord> {
        let Source::Ring { decoder, codec } = &mut self.source else {
            debug!(peripheral = %self.kind, len = chunk.len(), "byte chunk on a non-ring session ignored");
            return Vec::new();
        };

        let overflows_before = self.metrics.snapshot().overflow_discards;
        let frames = decoder.feed(chunk);
        let overflows = self.metrics.snapshot().overflow_discards - overflows_before;
        for _ in 0..overflows {
            observability::record_frame_discarded("overflow");
        }

        let mut payloads = Vec::with_capacity(frames.len());
        for frame in &frames {
            observability::record_frame_decoded();
            match codec.decode(frame) {
                Some(payload) => payloads.push(payload),
                None if frame.starts_with(&SENSOR_STREAM_TAG) => {
                    observability::record_frame_discarded("short")
                }
                None => observability::record_frame_discarded("header"),
            }
        }

        payloads
            .into_iter()
            .map(|p| self.synchronize(p.channels, p.device_timestamp_ms, host_now_ms))
            .collect()
    }

    /// Wrist path. Returns a record only when the barrier releases a sample
    /// and the governor admits it.
    pub fn push_axis(&mut self, event: &AxisEvent, host_now_ms: i64) -> Option<SensorRecord> {
        let Source::Wrist { fusion, governor } = &mut self.source else {
            debug!(peripheral = %self.kind, "axis event on a non-wrist session ignored");
            return None;
        };

        fusion.on_axis_event(event);
        let sample = fusion.take_fused()?;

        let elapsed_ms = host_now_ms - self.started_at_ms;
        let accepted = governor.admit(elapsed_ms);
        self.metrics.record_fused(accepted);
        observability::record_fused_sample(self.kind, accepted);
        if !accepted {
            trace!(elapsed_ms, emitted = governor.emitted(), "fused sample throttled");
            return None;
        }

        Some(self.synchronize(sample.channels, sample.device_timestamp_ms, host_now_ms))
    }

    fn synchronize(
        &mut self,
        channels: MotionChannels,
        device_ms: i64,
        host_now_ms: i64,
    ) -> SensorRecord {
        if !self.clock.is_established() {
            let offset = self.clock.establish(device_ms, host_now_ms);
            observability::record_clock_offset(self.kind, offset);
        }
        let synced = self.clock.synchronize(device_ms, host_now_ms);
        self.drift.observe(synced);

        SensorRecord {
            channels,
            device_timestamp_ms: synced,
            host_timestamp_ms: host_now_ms,
        }
    }

    pub fn kind(&self) -> PeripheralKind {
        self.kind
    }

    pub fn clock(&self) -> &ClockSync {
        &self.clock
    }

    pub fn drift(&self) -> &DriftMonitor {
        &self.drift
    }

    pub fn metrics(&self) -> &Arc<IngestionMetrics> {
        &self.metrics
    }
}
