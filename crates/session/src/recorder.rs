//! Recorder - the control surface handed to the UI layer
//!
//! One independent session per enabled peripheral. The UI starts and stops
//! sessions by kind and consumes [`SignalEvent`]s from a single receiver.

use std::collections::BTreeMap;
use std::sync::Arc;

use contracts::{
    Clock, ContractError, ParticipantConfig, PeripheralKind, RecorderBlueprint, SessionState,
    SignalEvent, SystemClock, Transport,
};
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};

use crate::controller::{SessionController, StartMode};
use crate::error::{Result, SessionError};
use crate::listener::TransportEventSender;
use crate::runtime::SessionHandle;

type TransportFactory = Box<dyn FnOnce(TransportEventSender) -> Box<dyn Transport>>;

/// Builder for [`Recorder`]
///
/// Each platform binding is registered as a factory: it receives the
/// listener it must call into and returns the transport the session drives.
pub struct RecorderBuilder {
    blueprint: RecorderBlueprint,
    clock: Arc<dyn Clock>,
    factories: BTreeMap<PeripheralKind, TransportFactory>,
}

impl RecorderBuilder {
    pub fn new(blueprint: RecorderBlueprint) -> Self {
        Self {
            blueprint,
            clock: Arc::new(SystemClock),
            factories: BTreeMap::new(),
        }
    }

    /// Host clock used to stamp transport events.
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn peripheral<T, F>(mut self, kind: PeripheralKind, factory: F) -> Self
    where
        T: Transport + 'static,
        F: FnOnce(TransportEventSender) -> T + 'static,
    {
        let factory: TransportFactory = Box::new(move |listener| Box::new(factory(listener)));
        self.factories.insert(kind, factory);
        self
    }

    /// Spawn one session worker per registered, enabled peripheral.
    ///
    /// Must be called inside a tokio runtime.
    #[instrument(name = "recorder_build", skip(self))]
    pub fn build(self) -> Result<Recorder> {
        let (signals_tx, signals_rx) = mpsc::unbounded_channel();
        let mut sessions = BTreeMap::new();

        for (kind, factory) in self.factories {
            if !self.blueprint.is_enabled(kind) {
                warn!(peripheral = %kind, "binding registered for a disabled peripheral, skipping");
                continue;
            }

            let (events_tx, events_rx) = async_channel::unbounded();
            let listener = TransportEventSender::new(kind, self.clock.clone(), events_tx);
            let transport = factory(listener);
            if transport.kind() != kind {
                return Err(ContractError::transport(
                    kind,
                    format!("binding drives {} instead", transport.kind()),
                )
                .into());
            }

            let controller = SessionController::new(&self.blueprint, transport, signals_tx.clone());
            let handle = SessionHandle::spawn(
                controller,
                events_rx,
                self.clock.clone(),
                self.blueprint.connect_timeout(kind),
            );
            sessions.insert(kind, handle);
        }

        info!(
            peripherals = ?sessions.keys().collect::<Vec<_>>(),
            "recorder ready"
        );
        Ok(Recorder {
            sessions,
            signals: Some(signals_rx),
        })
    }
}

/// Session control surface
pub struct Recorder {
    sessions: BTreeMap<PeripheralKind, SessionHandle>,
    signals: Option<mpsc::UnboundedReceiver<SignalEvent>>,
}

impl Recorder {
    pub fn builder(blueprint: RecorderBlueprint) -> RecorderBuilder {
        RecorderBuilder::new(blueprint)
    }

    /// Begin connecting. `Ok(false)` if that peripheral is already in a
    /// session.
    pub async fn start_session(&self, kind: PeripheralKind) -> Result<bool> {
        self.session(kind)?.start(StartMode::User).await
    }

    /// Like [`start_session`](Self::start_session), for automatic reconnects:
    /// a failed attempt does not raise `ConnectFailed`.
    pub async fn retry_session(&self, kind: PeripheralKind) -> Result<bool> {
        self.session(kind)?.start(StartMode::AutoRetry).await
    }

    /// Stop and wait until the session has reached `Idle` with its files
    /// closed.
    pub async fn stop_session(&self, kind: PeripheralKind) -> Result<()> {
        self.session(kind)?.stop().await
    }

    /// Apply a corrected participant id to every session, renaming any open
    /// files.
    ///
    /// A malformed id is rejected before any session is touched. Otherwise
    /// every session is attempted and the first failure is returned.
    pub async fn rename_participant(&self, participant_id: &str) -> Result<()> {
        ParticipantConfig::validate_id(participant_id).map_err(SessionError::InvalidParticipant)?;

        let mut first_error = None;
        for (kind, handle) in &self.sessions {
            if let Err(e) = handle.rename_participant(participant_id).await {
                warn!(peripheral = %kind, error = %e, "participant rename failed");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    pub fn state(&self, kind: PeripheralKind) -> Option<SessionState> {
        self.sessions.get(&kind).map(SessionHandle::state)
    }

    pub fn session(&self, kind: PeripheralKind) -> Result<&SessionHandle> {
        self.sessions
            .get(&kind)
            .ok_or(SessionError::NotConfigured(kind))
    }

    pub fn peripherals(&self) -> impl Iterator<Item = PeripheralKind> + '_ {
        self.sessions.keys().copied()
    }

    /// The signal stream. Can be taken once.
    pub fn take_signals(&mut self) -> Option<mpsc::UnboundedReceiver<SignalEvent>> {
        self.signals.take()
    }

    /// Finalize every session and stop the workers.
    #[instrument(name = "recorder_shutdown", skip(self))]
    pub async fn shutdown(self) {
        for (_, handle) in self.sessions {
            handle.shutdown().await;
        }
        info!("recorder shut down");
    }
}
