//! SessionController - per-peripheral recording state machine
//!
//! ```text
//! Idle --start--> Connecting --connected--> Recording --stop / link lost--> Disconnecting --> Idle
//!                    |                                                          ^
//!                    +--------------- timeout / connect failure ---------------+ (straight to Idle)
//! ```
//!
//! The controller is synchronous and single-owner. It never reads a clock:
//! every entry point is handed the host time at which the triggering event
//! happened. Deadlines are armed by the runtime that owns it.

use chrono::{DateTime, Local, TimeZone};
use contracts::{
    AxisEvent, DisconnectReason, ParticipantConfig, PeripheralKind, RecorderBlueprint,
    SensorRecord, SessionSignal, SessionState, SignalEvent, Transport, TransportEvent,
};
use storage::{SessionFiles, SessionFilesConfig, StorageError};
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::error::{Result, SessionError};
use crate::pipeline::RecordPipeline;

/// Who asked for a connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartMode {
    /// Operator-initiated; a failure is surfaced once
    User,
    /// Automatic reconnect; failures stay silent
    AutoRetry,
}

pub struct SessionController<T> {
    kind: PeripheralKind,
    transport: T,
    files_config: SessionFilesConfig,
    state: SessionState,
    recording_active: bool,
    notify_connect_failure: bool,
    attempt: u64,
    pipeline: RecordPipeline,
    files: Option<SessionFiles>,
    signals: mpsc::UnboundedSender<SignalEvent>,
}

impl<T: Transport> SessionController<T> {
    pub fn new(
        blueprint: &RecorderBlueprint,
        transport: T,
        signals: mpsc::UnboundedSender<SignalEvent>,
    ) -> Self {
        let kind = transport.kind();
        Self {
            kind,
            files_config: SessionFilesConfig {
                directory: blueprint.output.directory.clone(),
                participant_id: blueprint.participant.id.clone(),
                write_event_log: blueprint.output.write_event_log,
            },
            transport,
            state: SessionState::Idle,
            recording_active: false,
            notify_connect_failure: false,
            attempt: 0,
            pipeline: RecordPipeline::new(kind, blueprint),
            files: None,
            signals,
        }
    }

    /// Begin a connection attempt.
    ///
    /// Returns `Ok(false)` without touching anything if a session is already
    /// active. A binding that refuses to start returns the controller to
    /// `Idle` and propagates the error.
    #[instrument(name = "session_start", skip(self), fields(peripheral = %self.kind))]
    pub fn start(&mut self, mode: StartMode) -> Result<bool> {
        if self.recording_active || self.state != SessionState::Idle {
            debug!(state = %self.state, "start ignored, session already active");
            return Ok(false);
        }

        self.attempt += 1;
        self.notify_connect_failure = mode == StartMode::User;
        self.transition(SessionState::Connecting);

        if let Err(e) = self.transport.connect() {
            warn!(error = %e, "transport refused to connect");
            self.transition(SessionState::Idle);
            self.connect_failed();
            return Err(e.into());
        }
        info!(attempt = self.attempt, ?mode, "connecting");
        Ok(true)
    }

    /// Explicit stop. Recording sessions close their files immediately and
    /// wait in `Disconnecting` for the link to confirm; pending connection
    /// attempts are cancelled outright.
    #[instrument(name = "session_stop", skip(self), fields(peripheral = %self.kind))]
    pub fn stop(&mut self, now_ms: i64) {
        match self.state {
            SessionState::Recording => {
                self.transition(SessionState::Disconnecting);
                self.close_files(now_ms);
                self.transport.disconnect();
            }
            SessionState::Connecting => {
                self.transport.disconnect();
                self.transition(SessionState::Idle);
            }
            SessionState::Idle | SessionState::Disconnecting => {
                debug!(state = %self.state, "nothing to stop");
            }
        }
    }

    /// Dispatch one transport callback, stamped with its host receipt time.
    pub fn handle_event(&mut self, event: TransportEvent, host_ms: i64) {
        match event {
            TransportEvent::Connected => self.on_connected(host_ms),
            TransportEvent::Bytes(chunk) => self.on_bytes(&chunk, host_ms),
            TransportEvent::Axis(axis) => self.on_axis(&axis, host_ms),
            TransportEvent::Disconnected(reason) => self.on_disconnected(reason, host_ms),
        }
    }

    /// The connect deadline for `attempt` expired. Stale deadlines from an
    /// earlier attempt are ignored.
    pub fn on_connect_timeout(&mut self, attempt: u64) {
        if self.state != SessionState::Connecting || attempt != self.attempt {
            trace!(attempt, current = self.attempt, "stale connect deadline");
            return;
        }
        warn!(peripheral = %self.kind, attempt, "no connection within timeout");
        self.transport.disconnect();
        self.transition(SessionState::Idle);
        self.connect_failed();
    }

    /// The link never confirmed a disconnect; finish the session anyway.
    pub fn on_disconnect_timeout(&mut self, now_ms: i64) {
        if self.state != SessionState::Disconnecting {
            return;
        }
        warn!(peripheral = %self.kind, "disconnect not confirmed, forcing idle");
        self.finish_session(now_ms);
    }

    /// Switch to a corrected participant id. An open session's files are
    /// renamed in place; later sessions use the new id.
    ///
    /// The id is checked before anything is touched. If the rename fails the
    /// files keep their old names and the old id stays in effect.
    pub fn rename_participant(&mut self, participant_id: &str) -> Result<()> {
        ParticipantConfig::validate_id(participant_id).map_err(SessionError::InvalidParticipant)?;
        if let Some(files) = self.files.as_mut() {
            files.rename_participant(participant_id)?;
        }
        self.files_config.participant_id = participant_id.to_string();
        info!(peripheral = %self.kind, participant_id, "participant renamed");
        Ok(())
    }

    /// Tear everything down without waiting for the link.
    pub fn shutdown(&mut self, now_ms: i64) {
        match self.state {
            SessionState::Idle => {}
            SessionState::Connecting => self.stop(now_ms),
            SessionState::Recording | SessionState::Disconnecting => {
                self.transport.disconnect();
                if self.state == SessionState::Recording {
                    self.transition(SessionState::Disconnecting);
                }
                self.finish_session(now_ms);
            }
        }
    }

    pub fn kind(&self) -> PeripheralKind {
        self.kind
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    pub fn is_recording(&self) -> bool {
        self.recording_active
    }

    pub fn files(&self) -> Option<&SessionFiles> {
        self.files.as_ref()
    }

    pub fn pipeline(&self) -> &RecordPipeline {
        &self.pipeline
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn on_connected(&mut self, host_ms: i64) {
        if self.state != SessionState::Connecting {
            warn!(peripheral = %self.kind, state = %self.state, "unsolicited connection, dropping link");
            self.transport.disconnect();
            return;
        }

        match SessionFiles::create(&self.files_config, self.kind, local_time(host_ms)) {
            Ok(files) => {
                info!(peripheral = %self.kind, path = %files.data_path().display(), "recording");
                self.files = Some(files);
                self.pipeline.reset(host_ms);
                self.recording_active = true;
                self.transition(SessionState::Recording);
                self.emit(SessionSignal::Connected);
            }
            Err(e) => {
                self.transition(SessionState::Disconnecting);
                self.storage_failed(e);
            }
        }
    }

    fn on_bytes(&mut self, chunk: &[u8], host_ms: i64) {
        if self.state != SessionState::Recording {
            trace!(peripheral = %self.kind, len = chunk.len(), "bytes outside recording dropped");
            return;
        }
        let records = self.pipeline.push_bytes(chunk, host_ms);
        for record in records {
            if !self.persist(&record) {
                break;
            }
        }
    }

    fn on_axis(&mut self, event: &AxisEvent, host_ms: i64) {
        if self.state != SessionState::Recording {
            return;
        }
        if let Some(record) = self.pipeline.push_axis(event, host_ms) {
            self.persist(&record);
        }
    }

    fn on_disconnected(&mut self, reason: DisconnectReason, host_ms: i64) {
        match self.state {
            SessionState::Recording => {
                if reason.is_clean() {
                    info!(peripheral = %self.kind, "peripheral closed the link");
                } else {
                    error!(peripheral = %self.kind, %reason, "link lost while recording");
                    self.emit(SessionSignal::UnexpectedDisconnect { reason });
                }
                self.transition(SessionState::Disconnecting);
                self.finish_session(host_ms);
            }
            SessionState::Disconnecting => {
                debug!(peripheral = %self.kind, %reason, "disconnect confirmed");
                self.finish_session(host_ms);
            }
            SessionState::Connecting => {
                warn!(peripheral = %self.kind, %reason, "connection attempt failed");
                self.transition(SessionState::Idle);
                self.connect_failed();
            }
            SessionState::Idle => trace!(peripheral = %self.kind, "disconnect while idle"),
        }
    }

    /// Append one record. A storage failure ends the session.
    fn persist(&mut self, record: &SensorRecord) -> bool {
        let Some(files) = self.files.as_mut() else {
            return false;
        };
        match files.append(record) {
            Ok(()) => {
                observability::record_record_written(self.kind);
                true
            }
            Err(e) => {
                self.transition(SessionState::Disconnecting);
                self.close_files(record.host_timestamp_ms);
                self.storage_failed(e);
                false
            }
        }
    }

    fn storage_failed(&mut self, e: StorageError) {
        error!(peripheral = %self.kind, error = %e, "storage failed, ending session");
        observability::record_storage_failure(self.kind);
        self.emit(SessionSignal::StorageFailed {
            message: e.to_string(),
        });
        self.transport.disconnect();
    }

    fn close_files(&mut self, now_ms: i64) {
        if let Some(files) = self.files.as_mut() {
            if let Err(e) = files.finish(local_time(now_ms)) {
                error!(peripheral = %self.kind, error = %e, "failed to close data file");
            }
        }
    }

    /// Disconnecting -> Idle: close files if still open and report the stop.
    fn finish_session(&mut self, now_ms: i64) {
        self.close_files(now_ms);
        if let Some(files) = self.files.take() {
            info!(
                peripheral = %self.kind,
                records = files.records_written(),
                path = %files.data_path().display(),
                "recording stopped"
            );
        }
        if self.recording_active {
            self.recording_active = false;
            self.emit(SessionSignal::RecordingStopped);
        }
        self.transition(SessionState::Idle);
    }

    fn connect_failed(&mut self) {
        if self.notify_connect_failure {
            self.notify_connect_failure = false;
            self.emit(SessionSignal::ConnectFailed);
        } else {
            debug!(peripheral = %self.kind, "connect failure not surfaced");
        }
    }

    fn transition(&mut self, to: SessionState) {
        let from = self.state;
        if from == to {
            return;
        }
        debug!(peripheral = %self.kind, %from, %to, "session transition");
        observability::record_session_transition(self.kind, from, to);
        self.state = to;
    }

    fn emit(&self, signal: SessionSignal) {
        let event = SignalEvent {
            peripheral: self.kind,
            signal,
        };
        if self.signals.send(event).is_err() {
            trace!(peripheral = %self.kind, "no signal subscriber");
        }
    }
}

fn local_time(ms: i64) -> DateTime<Local> {
    Local
        .timestamp_millis_opt(ms)
        .single()
        .unwrap_or_else(Local::now)
}
