//! SessionHandle - one peripheral's session running on its own task
//!
//! The worker owns the [`SessionController`] and serializes three inputs onto
//! it: commands from the control surface, stamped transport events, and the
//! deadline that bounds `Connecting` and `Disconnecting`.

use std::sync::Arc;
use std::time::Duration;

use contracts::{Clock, PeripheralKind, SessionState, Transport};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use crate::controller::{SessionController, StartMode};
use crate::error::{Result, SessionError};
use crate::listener::StampedEvent;

const COMMAND_QUEUE_CAPACITY: usize = 16;

enum SessionCommand {
    Start {
        mode: StartMode,
        reply: oneshot::Sender<Result<bool>>,
    },
    Stop {
        done: oneshot::Sender<()>,
    },
    RenameParticipant {
        participant_id: String,
        reply: oneshot::Sender<Result<()>>,
    },
}

/// Handle to a running session worker
pub struct SessionHandle {
    kind: PeripheralKind,
    commands: mpsc::Sender<SessionCommand>,
    state: watch::Receiver<SessionState>,
    worker_handle: JoinHandle<()>,
}

impl SessionHandle {
    /// Spawn the worker. Must be called inside a tokio runtime.
    pub fn spawn<T: Transport + 'static>(
        controller: SessionController<T>,
        events: async_channel::Receiver<StampedEvent>,
        clock: Arc<dyn Clock>,
        transition_timeout: Duration,
    ) -> Self {
        let kind = controller.kind();
        let (commands, rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
        let (state_tx, state) = watch::channel(controller.state());

        let worker = SessionWorker {
            controller,
            commands: rx,
            events,
            clock,
            transition_timeout,
            state_tx,
            deadline: None,
            stop_waiters: Vec::new(),
        };
        let worker_handle = tokio::spawn(worker.run());

        Self {
            kind,
            commands,
            state,
            worker_handle,
        }
    }

    pub fn kind(&self) -> PeripheralKind {
        self.kind
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Watch state transitions as they happen.
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Request a connection attempt. `Ok(false)` if a session is already
    /// active.
    pub async fn start(&self, mode: StartMode) -> Result<bool> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Start { mode, reply }).await?;
        rx.await.map_err(|_| SessionError::RuntimeGone(self.kind))?
    }

    /// Stop and wait until the session is back in `Idle`.
    pub async fn stop(&self) -> Result<()> {
        let (done, rx) = oneshot::channel();
        self.send(SessionCommand::Stop { done }).await?;
        rx.await.map_err(|_| SessionError::RuntimeGone(self.kind))
    }

    pub async fn rename_participant(&self, participant_id: &str) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::RenameParticipant {
            participant_id: participant_id.to_string(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| SessionError::RuntimeGone(self.kind))?
    }

    /// Finalize any open session and wait for the worker to exit.
    #[instrument(name = "session_handle_shutdown", skip(self), fields(peripheral = %self.kind))]
    pub async fn shutdown(self) {
        drop(self.commands);
        if let Err(e) = self.worker_handle.await {
            error!(peripheral = %self.kind, error = ?e, "session worker panicked");
        }
        debug!(peripheral = %self.kind, "session handle shutdown complete");
    }

    async fn send(&self, command: SessionCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SessionError::RuntimeGone(self.kind))
    }
}

/// The transitional state a deadline was armed for.
#[derive(Debug, Clone, Copy)]
struct Deadline {
    at: Instant,
    state: SessionState,
    attempt: u64,
}

struct SessionWorker<T> {
    controller: SessionController<T>,
    commands: mpsc::Receiver<SessionCommand>,
    events: async_channel::Receiver<StampedEvent>,
    clock: Arc<dyn Clock>,
    transition_timeout: Duration,
    state_tx: watch::Sender<SessionState>,
    deadline: Option<Deadline>,
    stop_waiters: Vec<oneshot::Sender<()>>,
}

impl<T: Transport> SessionWorker<T> {
    #[instrument(name = "session_worker_loop", skip(self), fields(peripheral = %self.controller.kind()))]
    async fn run(mut self) {
        info!("session worker started");
        let mut events_open = true;

        loop {
            let deadline = self.deadline;
            let sleep = async move {
                match deadline {
                    Some(d) => tokio::time::sleep_until(d.at).await,
                    None => std::future::pending().await,
                }
            };

            // Events first: whatever the transport delivered before a stop
            // command is still persisted.
            tokio::select! {
                biased;
                event = self.events.recv(), if events_open => match event {
                    Ok(stamped) => self.controller.handle_event(stamped.event, stamped.host_ms),
                    Err(_) => {
                        warn!("transport event channel closed");
                        events_open = false;
                    }
                },
                command = self.commands.recv() => match command {
                    Some(command) => self.on_command(command),
                    None => break,
                },
                _ = sleep => self.on_deadline(),
            }

            self.after_step();
        }

        let now = self.clock.now_millis();
        self.controller.shutdown(now);
        self.after_step();
        info!("session worker stopped");
    }

    fn on_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Start { mode, reply } => {
                let _ = reply.send(self.controller.start(mode));
            }
            SessionCommand::Stop { done } => {
                self.controller.stop(self.clock.now_millis());
                self.stop_waiters.push(done);
            }
            SessionCommand::RenameParticipant {
                participant_id,
                reply,
            } => {
                let _ = reply.send(self.controller.rename_participant(&participant_id));
            }
        }
    }

    fn on_deadline(&mut self) {
        let Some(deadline) = self.deadline.take() else {
            return;
        };
        match deadline.state {
            SessionState::Connecting => self.controller.on_connect_timeout(deadline.attempt),
            SessionState::Disconnecting => self
                .controller
                .on_disconnect_timeout(self.clock.now_millis()),
            _ => {}
        }
    }

    /// Publish state, re-arm or clear the deadline, release stop waiters.
    fn after_step(&mut self) {
        let state = self.controller.state();
        self.state_tx.send_if_modified(|current| {
            let changed = *current != state;
            *current = state;
            changed
        });

        match state {
            SessionState::Connecting | SessionState::Disconnecting => {
                let attempt = self.controller.attempt();
                let stale = self
                    .deadline
                    .map_or(true, |d| d.state != state || d.attempt != attempt);
                if stale {
                    self.deadline = Some(Deadline {
                        at: Instant::now() + self.transition_timeout,
                        state,
                        attempt,
                    });
                }
            }
            SessionState::Idle | SessionState::Recording => self.deadline = None,
        }

        if state == SessionState::Idle {
            for done in self.stop_waiters.drain(..) {
                let _ = done.send(());
            }
        }
    }
}
