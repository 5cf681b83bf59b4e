//! The node's event loop.
//!
//! A single task owns the state machine and receives every input - network
//! receipts, timer fires, internal follow-ups, client submissions - through
//! one ordered queue, processing one event at a time. Network workers only
//! decode bytes and enqueue events; they never mutate consensus state.

use crate::state::NodeState;
use crate::timers::TimerManager;
use crate::transport::{Transport, TransportError};
use crate::wire;
use palisade_core::{Action, Event, StateMachine};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("event channel closed")]
    ChannelClosed,

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// External handle to a running node: event injection and shutdown.
pub struct RunnerHandle {
    event_tx: mpsc::Sender<Event>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl RunnerHandle {
    /// Inject an event into the node's queue (client submissions, admin).
    pub async fn submit(&self, event: Event) -> Result<(), RunnerError> {
        self.event_tx
            .send(event)
            .await
            .map_err(|_| RunnerError::ChannelClosed)
    }

    /// Signal the node to exit its loop.
    pub fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Owns the state machine and executes its actions.
pub struct Runner {
    state: NodeState,
    transport: Arc<dyn Transport>,
    timers: TimerManager,
    event_tx: mpsc::Sender<Event>,
    event_rx: mpsc::Receiver<Event>,
    shutdown_rx: oneshot::Receiver<()>,
    started: Instant,
}

impl Runner {
    /// Build a runner around a node state machine and its transport.
    pub fn new(
        state: NodeState,
        transport: Arc<dyn Transport>,
        channel_capacity: usize,
    ) -> (Self, RunnerHandle) {
        let (event_tx, event_rx) = mpsc::channel(channel_capacity);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let timers = TimerManager::new(event_tx.clone());

        let runner = Self {
            state,
            transport,
            timers,
            event_tx: event_tx.clone(),
            event_rx,
            shutdown_rx,
            started: Instant::now(),
        };
        let handle = RunnerHandle {
            event_tx,
            shutdown_tx: Some(shutdown_tx),
        };
        (runner, handle)
    }

    /// Spawn the worker that decodes inbound bytes into events.
    ///
    /// Decode failures drop the message with a log line; the sender gets no
    /// feedback (protocol violations are never fatal locally).
    pub fn spawn_inbound(
        mut inbound: mpsc::UnboundedReceiver<Vec<u8>>,
        event_tx: mpsc::Sender<Event>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(bytes) = inbound.recv().await {
                match wire::decode_message(&bytes) {
                    Ok((_, event)) => {
                        if event_tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Dropping undecodable message");
                    }
                }
            }
        })
    }

    /// A sender into the node's event queue (for the inbound worker).
    pub fn event_sender(&self) -> mpsc::Sender<Event> {
        self.event_tx.clone()
    }

    /// Run the event loop until shutdown.
    pub async fn run(mut self) -> Result<(), RunnerError> {
        info!(address = ?self.state.address(), "Node starting");

        self.state.set_time(self.started.elapsed());
        let actions = self.state.initialize();
        self.execute(actions);

        loop {
            tokio::select! {
                _ = &mut self.shutdown_rx => {
                    info!(address = ?self.state.address(), "Node shutting down");
                    self.timers.cancel_all();
                    return Ok(());
                }
                event = self.event_rx.recv() => {
                    let Some(event) = event else {
                        return Err(RunnerError::ChannelClosed);
                    };
                    debug!(event = event.type_name(), "Handling event");
                    self.state.set_time(self.started.elapsed());
                    let actions = self.state.handle(event);
                    self.execute(actions);
                }
            }
        }
    }

    /// Execute the actions one handler produced.
    ///
    /// Network failures are logged, never fatal: the protocol tolerates
    /// lost messages.
    fn execute(&mut self, actions: Vec<Action>) {
        let sender = self.state.address();
        for action in actions {
            match action {
                Action::Broadcast { message } => match wire::encode_message(&message, sender) {
                    Ok(bytes) => {
                        if let Err(e) = self.transport.broadcast(bytes) {
                            warn!(error = %e, kind = message.type_name(), "Broadcast failed");
                        }
                    }
                    Err(e) => warn!(error = %e, "Encode failed"),
                },
                Action::Send { to, message } => match wire::encode_message(&message, sender) {
                    Ok(bytes) => {
                        if let Err(e) = self.transport.send(&to, bytes) {
                            warn!(error = %e, to = ?to, kind = message.type_name(), "Send failed");
                        }
                    }
                    Err(e) => warn!(error = %e, "Encode failed"),
                },
                Action::SetTimer { id, duration } => self.timers.set_timer(id, duration),
                Action::CancelTimer { id } => self.timers.cancel_timer(id),
                Action::EnqueueInternal { event } => {
                    // try_send: the queue is the node's own follow-up work;
                    // a full queue here means the node is hopelessly behind.
                    if let Err(e) = self.event_tx.try_send(event) {
                        warn!(error = %e, "Internal event queue full, dropping");
                    }
                }
                Action::ReportMisbehavior {
                    offender,
                    view,
                    phase,
                    first,
                    second,
                } => {
                    // Evidence handling beyond operator visibility is out of
                    // scope; the offending message was already discarded.
                    warn!(
                        offender = ?offender,
                        view = %view,
                        phase = %phase,
                        first = ?first,
                        second = ?second,
                        "Equivocation evidence"
                    );
                }
            }
        }
    }
}
