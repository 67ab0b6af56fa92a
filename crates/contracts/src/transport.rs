//! Transport traits - the seam to the platform BLE / sensor layer
//!
//! The recorder never talks to a radio or a sensor manager directly. A
//! platform binding implements [`Transport`] (commands flowing out of the
//! recorder) and calls into a [`TransportListener`] (events flowing in).
//!
//! # Threading
//!
//! A binding must serialize all callbacks for one peripheral onto a single
//! thread. The recorder relies on that ordering and does no locking of its
//! own around decoder, clock and writer state.

use crate::{AxisEvent, ContractError, DisconnectReason, PeripheralKind};

/// Commands the recorder issues to a peripheral binding.
///
/// # Example
///
/// ```ignore
/// let mut transport: Box<dyn Transport> = platform::ring_transport(address);
/// transport.connect()?;      // begin discovery; completion arrives as on_connected()
/// // ... notifications flow into the listener ...
/// transport.disconnect();    // completion arrives as on_disconnected(Clean)
/// ```
pub trait Transport: Send {
    /// Which peripheral family this binding drives
    fn kind(&self) -> PeripheralKind;

    /// Begin discovery/connection. Must not block until connected.
    ///
    /// # Errors
    /// Returns an error if the binding cannot even start (radio off, no permission).
    fn connect(&mut self) -> Result<(), ContractError>;

    /// Cancel a pending connection or tear down an established one.
    ///
    /// Calling it when nothing is connected is a no-op.
    fn disconnect(&mut self);
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn kind(&self) -> PeripheralKind {
        (**self).kind()
    }

    fn connect(&mut self) -> Result<(), ContractError> {
        (**self).connect()
    }

    fn disconnect(&mut self) {
        (**self).disconnect()
    }
}

/// Events a peripheral binding delivers to the recorder.
///
/// Implementations must be cheap and non-blocking: they run on the
/// transport's I/O thread.
pub trait TransportListener: Send + Sync {
    /// Link established and notifications/sensor callbacks enabled
    fn on_connected(&self);

    /// Ring path: one raw notification chunk
    fn on_bytes_received(&self, chunk: &[u8]);

    /// Wrist path: one single-axis sensor reading
    fn on_axis_event(&self, event: AxisEvent);

    /// Link went down
    fn on_disconnected(&self, reason: DisconnectReason);
}
