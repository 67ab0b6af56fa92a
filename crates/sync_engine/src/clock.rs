//! Device-to-host clock alignment.
//!
//! A peripheral stamps samples with its own monotonic clock. The first record
//! of a session pins that clock to host wall time; every later record is
//! shifted by the same offset. The offset is never revised mid-session.

use tracing::{debug, warn};

/// Per-session clock offset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClockSync {
    offset_ms: Option<i64>,
}

impl ClockSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the device clock to host time. Only the first call has an effect;
    /// the established offset is returned either way.
    pub fn establish(&mut self, first_device_ms: i64, host_now_ms: i64) -> i64 {
        if let Some(offset) = self.offset_ms {
            warn!(offset_ms = offset, "clock offset already established, ignoring");
            return offset;
        }
        let offset = host_now_ms.saturating_sub(first_device_ms);
        debug!(offset_ms = offset, first_device_ms, host_now_ms, "clock offset established");
        self.offset_ms = Some(offset);
        offset
    }

    /// Map a device timestamp onto host time. `None` before `establish`.
    pub fn apply(&self, device_ms: i64) -> Option<i64> {
        self.offset_ms.map(|offset| device_ms.saturating_add(offset))
    }

    /// Establish on first use, then apply.
    pub fn synchronize(&mut self, device_ms: i64, host_now_ms: i64) -> i64 {
        let offset = match self.offset_ms {
            Some(offset) => offset,
            None => self.establish(device_ms, host_now_ms),
        };
        device_ms.saturating_add(offset)
    }

    pub fn offset_ms(&self) -> Option<i64> {
        self.offset_ms
    }

    pub fn is_established(&self) -> bool {
        self.offset_ms.is_some()
    }

    /// Forget the offset; the next record re-establishes it.
    pub fn reset(&mut self) {
        self.offset_ms = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_record_lands_on_host_time() {
        let mut sync = ClockSync::new();
        assert_eq!(sync.apply(1_000), None);
        assert_eq!(sync.synchronize(1_000, 5_000), 5_000);
        assert_eq!(sync.offset_ms(), Some(4_000));
    }

    #[test]
    fn test_offset_never_mutates() {
        let mut sync = ClockSync::new();
        let device_t0 = 123_456;
        let host_t0 = 1_700_000_000_000;
        sync.establish(device_t0, host_t0);

        for d in (0..5_000i64).map(|i| i * 7 + (i % 3)) {
            assert_eq!(sync.apply(device_t0 + d), Some(host_t0 + d));
        }

        // A second establish is ignored.
        assert_eq!(sync.establish(0, 0), host_t0 - device_t0);
        assert_eq!(sync.apply(device_t0), Some(host_t0));

        // Host time passing does not move later samples either.
        assert_eq!(sync.synchronize(device_t0 + 10, 0), host_t0 + 10);
    }

    #[test]
    fn test_reset_allows_new_session() {
        let mut sync = ClockSync::new();
        sync.synchronize(100, 1_000);
        sync.reset();
        assert!(!sync.is_established());
        assert_eq!(sync.synchronize(100, 9_000), 9_000);
    }
}
