//! Fused-sample rate governor
//!
//! Caps wrist output at a target cadence by comparing the number of samples
//! already written with the number the elapsed session time allows. Samples
//! arriving faster than the cadence are dropped; gaps are never backfilled.

/// Cadence used by the wrist host.
pub const DEFAULT_TARGET_RATE_HZ: f64 = 100.0;

#[derive(Debug, Clone)]
pub struct SampleRateGovernor {
    period_ms: f64,
    emitted: u64,
}

impl Default for SampleRateGovernor {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_RATE_HZ)
    }
}

impl SampleRateGovernor {
    /// `target_rate_hz` must be finite and positive.
    pub fn new(target_rate_hz: f64) -> Self {
        Self {
            period_ms: 1000.0 / target_rate_hz,
            emitted: 0,
        }
    }

    /// Pure admission test: emit iff `emitted < floor(elapsed / period)`.
    pub fn should_emit(&self, elapsed_ms: i64, emitted: u64) -> bool {
        let target = (elapsed_ms as f64 / self.period_ms).floor();
        (emitted as f64) < target
    }

    /// Admission test against the governor's own emitted count, which is
    /// incremented on acceptance.
    pub fn admit(&mut self, elapsed_ms: i64) -> bool {
        let accepted = self.should_emit(elapsed_ms, self.emitted);
        if accepted {
            self.emitted += 1;
        }
        accepted
    }

    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    pub fn period_ms(&self) -> f64 {
        self.period_ms
    }

    pub fn reset(&mut self) {
        self.emitted = 0;
    }
}
