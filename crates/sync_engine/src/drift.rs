//! Log-only drift diagnostics.
//!
//! Consecutive synchronized device timestamps should be one sample period
//! apart. Deltas outside the tolerance band are logged and counted for
//! offline analysis; nothing here alters the timestamps that get written.

use std::fmt;

use contracts::{ClockConfig, PeripheralKind};
use ringbuf::{traits::*, HeapRb};
use tracing::{debug, warn};

/// Recent deltas kept for the rolling mean.
const WINDOW_LEN: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockAnomalyKind {
    /// Device clock went backwards
    Backwards,
    /// Samples closer together than the tolerance allows
    Burst,
    /// Samples further apart than the tolerance allows
    Gap,
}

impl ClockAnomalyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ClockAnomalyKind::Backwards => "backwards",
            ClockAnomalyKind::Burst => "burst",
            ClockAnomalyKind::Gap => "gap",
        }
    }
}

impl fmt::Display for ClockAnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockAnomaly {
    pub kind: ClockAnomalyKind,
    pub delta_ms: i64,
}

/// Snapshot of what the monitor has seen so far.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DriftSummary {
    pub observed: u64,
    pub anomalies: u64,
    /// Mean of the recent deltas, if any
    pub recent_mean_interval_ms: Option<f64>,
}

pub struct DriftMonitor {
    peripheral: PeripheralKind,
    config: ClockConfig,
    last_device_ms: Option<i64>,
    window: HeapRb<i64>,
    observed: u64,
    anomalies: u64,
}

impl fmt::Debug for DriftMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriftMonitor")
            .field("peripheral", &self.peripheral)
            .field("observed", &self.observed)
            .field("anomalies", &self.anomalies)
            .finish()
    }
}

impl DriftMonitor {
    pub fn new(peripheral: PeripheralKind, config: ClockConfig) -> Self {
        Self {
            peripheral,
            config,
            last_device_ms: None,
            window: HeapRb::new(WINDOW_LEN),
            observed: 0,
            anomalies: 0,
        }
    }

    /// Check one synchronized timestamp against its predecessor.
    pub fn observe(&mut self, device_ms: i64) -> Option<ClockAnomaly> {
        self.observed += 1;
        let last = self.last_device_ms.replace(device_ms)?;
        let delta = device_ms - last;
        self.window.push_overwrite(delta);

        let kind = self.classify(delta)?;
        self.anomalies += 1;
        observability::record_clock_anomaly(self.peripheral, delta);

        match kind {
            ClockAnomalyKind::Backwards => warn!(
                peripheral = %self.peripheral,
                delta_ms = delta,
                "device clock went backwards"
            ),
            _ => debug!(
                peripheral = %self.peripheral,
                delta_ms = delta,
                expected_ms = self.config.expected_interval_ms,
                anomaly = %kind,
                "device interval outside tolerance"
            ),
        }

        Some(ClockAnomaly {
            kind,
            delta_ms: delta,
        })
    }

    pub fn summary(&self) -> DriftSummary {
        let len = self.window.occupied_len();
        let recent_mean_interval_ms = (len > 0)
            .then(|| self.window.iter().map(|d| *d as f64).sum::<f64>() / len as f64);
        DriftSummary {
            observed: self.observed,
            anomalies: self.anomalies,
            recent_mean_interval_ms,
        }
    }

    pub fn reset(&mut self) {
        self.last_device_ms = None;
        self.window.clear();
        self.observed = 0;
        self.anomalies = 0;
    }

    fn classify(&self, delta: i64) -> Option<ClockAnomalyKind> {
        let expected = self.config.expected_interval_ms;
        let tolerance = self.config.drift_tolerance_ms;
        if delta < 0 {
            Some(ClockAnomalyKind::Backwards)
        } else if delta < expected - tolerance {
            Some(ClockAnomalyKind::Burst)
        } else if delta > expected + tolerance {
            Some(ClockAnomalyKind::Gap)
        } else {
            None
        }
    }
}
