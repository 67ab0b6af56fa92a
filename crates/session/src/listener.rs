//! TransportEventSender - the listener a platform binding calls into
//!
//! Runs on the transport's I/O thread. Each callback is stamped with host
//! time at receipt and forwarded over an unbounded channel to the session
//! task, so the I/O thread never blocks on the recorder.

use std::sync::Arc;

use bytes::Bytes;
use contracts::{AxisEvent, Clock, DisconnectReason, PeripheralKind, TransportEvent, TransportListener};
use tracing::warn;

/// A transport event and the host time it was received.
#[derive(Debug, Clone, PartialEq)]
pub struct StampedEvent {
    pub event: TransportEvent,
    pub host_ms: i64,
}

#[derive(Clone)]
pub struct TransportEventSender {
    kind: PeripheralKind,
    clock: Arc<dyn Clock>,
    tx: async_channel::Sender<StampedEvent>,
}

impl TransportEventSender {
    pub fn new(
        kind: PeripheralKind,
        clock: Arc<dyn Clock>,
        tx: async_channel::Sender<StampedEvent>,
    ) -> Self {
        Self { kind, clock, tx }
    }

    pub fn kind(&self) -> PeripheralKind {
        self.kind
    }

    fn forward(&self, event: TransportEvent) {
        let stamped = StampedEvent {
            event,
            host_ms: self.clock.now_millis(),
        };
        if self.tx.try_send(stamped).is_err() {
            warn!(peripheral = %self.kind, "session task gone, transport event dropped");
        }
    }
}

impl std::fmt::Debug for TransportEventSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportEventSender")
            .field("kind", &self.kind)
            .field("pending", &self.tx.len())
            .finish()
    }
}

impl TransportListener for TransportEventSender {
    fn on_connected(&self) {
        self.forward(TransportEvent::Connected);
    }

    fn on_bytes_received(&self, chunk: &[u8]) {
        self.forward(TransportEvent::Bytes(Bytes::copy_from_slice(chunk)));
    }

    fn on_axis_event(&self, event: AxisEvent) {
        self.forward(TransportEvent::Axis(event));
    }

    fn on_disconnected(&self, reason: DisconnectReason) {
        self.forward(TransportEvent::Disconnected(reason));
    }
}
