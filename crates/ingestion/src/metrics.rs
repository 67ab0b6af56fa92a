//! Ingestion counters
//!
//! Shared between the frame decoder, the ring codec and the fusion stage of a
//! single session. Counters are monotonic; a snapshot is cheap and lock-free.

use std::sync::atomic::{AtomicU64, Ordering};

/// Ingestion metrics
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Raw transport bytes fed to the decoder
    pub bytes_received: AtomicU64,

    /// Complete frames decoded
    pub frames_decoded: AtomicU64,

    /// Frames thrown away because the reassembly buffer filled up
    pub overflow_discards: AtomicU64,

    /// Bare delimiters with no frame content
    pub empty_frames: AtomicU64,

    /// Frames that did not carry the sensor-stream tag
    pub header_rejects: AtomicU64,

    /// Sensor-tagged frames whose length differed from the expected size
    pub unexpected_length: AtomicU64,

    /// Sensor-tagged frames too short to hold a record
    pub short_frames: AtomicU64,

    /// Ring payloads turned into records
    pub payloads_decoded: AtomicU64,

    /// Wrist samples produced by the fusion barrier
    pub fused_samples: AtomicU64,

    /// Fused samples suppressed by the rate governor
    pub throttled_samples: AtomicU64,
}

impl IngestionMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_bytes(&self, n: usize) {
        self.bytes_received.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn record_frame(&self) {
        self.frames_decoded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_overflow(&self) {
        self.overflow_discards.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_empty_frame(&self) {
        self.empty_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_header_reject(&self) {
        self.header_rejects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unexpected_length(&self) {
        self.unexpected_length.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_short_frame(&self) {
        self.short_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_payload(&self) {
        self.payloads_decoded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fused(&self, accepted: bool) {
        self.fused_samples.fetch_add(1, Ordering::Relaxed);
        if !accepted {
            self.throttled_samples.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            frames_decoded: self.frames_decoded.load(Ordering::Relaxed),
            overflow_discards: self.overflow_discards.load(Ordering::Relaxed),
            empty_frames: self.empty_frames.load(Ordering::Relaxed),
            header_rejects: self.header_rejects.load(Ordering::Relaxed),
            unexpected_length: self.unexpected_length.load(Ordering::Relaxed),
            short_frames: self.short_frames.load(Ordering::Relaxed),
            payloads_decoded: self.payloads_decoded.load(Ordering::Relaxed),
            fused_samples: self.fused_samples.load(Ordering::Relaxed),
            throttled_samples: self.throttled_samples.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub bytes_received: u64,
    pub frames_decoded: u64,
    pub overflow_discards: u64,
    pub empty_frames: u64,
    pub header_rejects: u64,
    pub unexpected_length: u64,
    pub short_frames: u64,
    pub payloads_decoded: u64,
    pub fused_samples: u64,
    pub throttled_samples: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fused_counts_throttled_separately() {
        let metrics = IngestionMetrics::new();
        metrics.record_fused(true);
        metrics.record_fused(false);
        metrics.record_fused(false);

        let snap = metrics.snapshot();
        assert_eq!(snap.fused_samples, 3);
        assert_eq!(snap.throttled_samples, 2);
    }
}
