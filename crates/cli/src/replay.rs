//! Capture replay transport
//!
//! Plays a recorded stream back through the same listener a platform
//! binding would call, on its own thread, advancing a [`ManualClock`] so
//! every event is stamped with its original host timing.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use contracts::{
    AxisEvent, Clock, ContractError, DisconnectReason, ManualClock, PeripheralKind, Transport,
    TransportListener,
};
use session::TransportEventSender;
use tracing::{debug, info, warn};

use crate::error::CliError;

const NANOS_PER_MILLI: i64 = 1_000_000;

/// One callback in a replay script.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplayPayload {
    Bytes(Vec<u8>),
    Axis(AxisEvent),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplayStep {
    /// Offset from the connection time
    pub offset_ms: i64,
    pub payload: ReplayPayload,
}

/// Split a raw ring capture into notification-sized chunks spaced
/// `interval_ms` apart.
pub fn ring_script(capture: &[u8], chunk_size: usize, interval_ms: i64) -> Vec<ReplayStep> {
    capture
        .chunks(chunk_size.max(1))
        .enumerate()
        .map(|(i, chunk)| ReplayStep {
            offset_ms: i as i64 * interval_ms,
            payload: ReplayPayload::Bytes(chunk.to_vec()),
        })
        .collect()
}

/// Parse a wrist capture (one JSON `AxisEvent` per line). Timing follows the
/// device clock relative to the first event.
pub fn wrist_script(path: &Path, text: &str) -> Result<Vec<ReplayStep>, CliError> {
    let mut events = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let event: AxisEvent = serde_json::from_str(line)
            .map_err(|e| CliError::capture_parse(path, index + 1, e.to_string()))?;
        events.push(event);
    }

    let Some(first) = events.first().map(|e| e.timestamp_nanos) else {
        return Ok(Vec::new());
    };
    Ok(events
        .into_iter()
        .map(|event| ReplayStep {
            offset_ms: (event.timestamp_nanos - first) / NANOS_PER_MILLI,
            payload: ReplayPayload::Axis(event),
        })
        .collect())
}

/// Transport that "connects" by replaying a script.
pub struct ReplayTransport {
    kind: PeripheralKind,
    listener: TransportEventSender,
    clock: ManualClock,
    script: Option<Vec<ReplayStep>>,
    cancelled: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl ReplayTransport {
    pub fn new(
        listener: TransportEventSender,
        clock: ManualClock,
        script: Vec<ReplayStep>,
    ) -> Self {
        Self {
            kind: listener.kind(),
            listener,
            clock,
            script: Some(script),
            cancelled: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }
}

impl Transport for ReplayTransport {
    fn kind(&self) -> PeripheralKind {
        self.kind
    }

    fn connect(&mut self) -> Result<(), ContractError> {
        let script = self
            .script
            .take()
            .ok_or_else(|| ContractError::transport(self.kind, "capture already replayed"))?;

        let listener = self.listener.clone();
        let clock = self.clock.clone();
        let cancelled = self.cancelled.clone();
        let kind = self.kind;

        let worker = std::thread::Builder::new()
            .name(format!("replay-{kind}"))
            .spawn(move || {
                let start = clock.now_millis();
                listener.on_connected();
                let mut delivered = 0usize;
                for step in script {
                    if cancelled.load(Ordering::Relaxed) {
                        debug!(delivered, "replay cancelled");
                        break;
                    }
                    clock.set(start + step.offset_ms);
                    match step.payload {
                        ReplayPayload::Bytes(chunk) => listener.on_bytes_received(&chunk),
                        ReplayPayload::Axis(event) => listener.on_axis_event(event),
                    }
                    delivered += 1;
                }
                info!(peripheral = %kind, delivered, "replay finished");
                listener.on_disconnected(DisconnectReason::Clean);
            })
            .map_err(|e| ContractError::transport(self.kind, e.to_string()))?;

        self.worker = Some(worker);
        Ok(())
    }

    fn disconnect(&mut self) {
        self.cancelled.store(true, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!(peripheral = %self.kind, "replay thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::AxisKind;

    #[test]
    fn test_ring_script_chunks_and_spacing() {
        let capture: Vec<u8> = (0..45).collect();
        let script = ring_script(&capture, 20, 10);
        assert_eq!(script.len(), 3);
        assert_eq!(script[2].offset_ms, 20);
        assert_eq!(script[2].payload, ReplayPayload::Bytes((40..45).collect()));
    }

    #[test]
    fn test_wrist_script_offsets_follow_device_clock() {
        let a = AxisEvent::new(AxisKind::Gyro, [0.0; 3], 3_000_000_000);
        let b = AxisEvent::new(AxisKind::Mag, [1.0; 3], 3_012_500_000);
        let text = format!(
            "{}\n\n{}\n",
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );

        let script = wrist_script(Path::new("w.jsonl"), &text).unwrap();
        assert_eq!(script.len(), 2);
        assert_eq!(script[0].offset_ms, 0);
        assert_eq!(script[1].offset_ms, 12);
        assert_eq!(script[1].payload, ReplayPayload::Axis(b));
    }

    #[test]
    fn test_wrist_script_reports_bad_line() {
        let err = wrist_script(Path::new("w.jsonl"), "{}\n").unwrap_err();
        assert!(err.to_string().starts_with("w.jsonl:1:"));
    }
}
