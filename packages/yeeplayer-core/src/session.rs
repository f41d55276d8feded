//! Board session: the single loop that owns one client's board.
//!
//! The session multiplexes three inputs in one `select!`:
//!
//! 1. shutdown (cancellation token)
//! 2. the next entity expiry deadline
//! 3. the input queue
//!
//! The input queue carries local actions from [`SessionHandle`]s and
//! transport events delivered through [`BoardSession::event_sink`] alike, so
//! both are applied strictly in the order they reached this client.
//!
//! Because only this loop touches the [`CommandRouter`], the entity
//! collection and shared state need no locks. After every step a fresh
//! [`BoardSnapshot`] is published on a `watch` channel for renderers.
//!
//! Local actions take effect on the local board before and independently
//! of any network send; expiry keeps running while disconnected.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::config::BoardConfig;
use crate::entities::{EphemeralEntity, Viewport};
use crate::error::{BoardError, BoardResult};
use crate::events::{ConnectionEvent, EventEmitter};
use crate::router::{Command, CommandRouter};
use crate::runtime::TaskSpawner;
use crate::shared_state::SharedState;
use crate::transport::{ConnectOptions, EventSink, Transport, TransportEvent, WsTransport};
use crate::utils::now_millis;

/// What a renderer needs to draw the board.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSnapshot {
    pub entities: Vec<EphemeralEntity>,
    pub state: SharedState,
    pub connected: bool,
}

/// One entry of the session input queue.
pub(crate) enum SessionInput {
    Action(Command),
    Viewport(Viewport),
    Transport(TransportEvent),
}

/// Cloneable handle used by the UI to drive a running session.
///
/// When every handle is dropped the session stops.
#[derive(Clone)]
pub struct SessionHandle {
    inputs: mpsc::Sender<SessionInput>,
    snapshot: watch::Receiver<BoardSnapshot>,
    cancel: CancellationToken,
    _alive: Arc<DropGuard>,
}

impl SessionHandle {
    /// Queues a local action. Never blocks.
    ///
    /// Returns `false` if the session has stopped or its queue is full.
    pub fn dispatch(&self, command: Command) -> bool {
        self.submit(SessionInput::Action(command))
    }

    /// Updates the extent used for new spawn positions.
    pub fn set_viewport(&self, viewport: Viewport) -> bool {
        self.submit(SessionInput::Viewport(viewport))
    }

    /// Latest published board state.
    pub fn snapshot(&self) -> BoardSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Receiver notified after every session step.
    pub fn watch(&self) -> watch::Receiver<BoardSnapshot> {
        self.snapshot.clone()
    }

    /// Stops the session loop.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled() && !self.inputs.is_closed()
    }

    fn submit(&self, input: SessionInput) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        match self.inputs.try_send(input) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                log::warn!("[Session] Input queue full, dropping local action");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }
}

/// One client's board, driven by [`BoardSession::run`].
pub struct BoardSession {
    router: CommandRouter,
    emitter: Arc<dyn EventEmitter>,
    inputs_tx: mpsc::Sender<SessionInput>,
    inputs: mpsc::Receiver<SessionInput>,
    snapshot: watch::Sender<BoardSnapshot>,
    cancel: CancellationToken,
    connected: bool,
}

impl BoardSession {
    /// Creates a session and the first handle to it.
    ///
    /// Wire a transport to [`event_sink`](Self::event_sink), then start the
    /// loop with [`spawn`](Self::spawn) or [`run`](Self::run).
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Configuration`] if `config` fails validation.
    pub fn new(
        config: &BoardConfig,
        emitter: Arc<dyn EventEmitter>,
    ) -> BoardResult<(Self, SessionHandle)> {
        config.validate().map_err(BoardError::Configuration)?;

        let (inputs_tx, inputs_rx) = mpsc::channel(config.input_channel_capacity);
        let (snapshot_tx, snapshot_rx) = watch::channel(BoardSnapshot::default());
        let cancel = CancellationToken::new();

        let handle = SessionHandle {
            inputs: inputs_tx.clone(),
            snapshot: snapshot_rx,
            cancel: cancel.clone(),
            _alive: Arc::new(cancel.clone().drop_guard()),
        };
        let session = Self {
            router: CommandRouter::new(config, Arc::clone(&emitter)),
            emitter,
            inputs_tx,
            inputs: inputs_rx,
            snapshot: snapshot_tx,
            cancel,
            connected: false,
        };
        Ok((session, handle))
    }

    /// Creates a session, connects it to the relay at `url` and starts it.
    ///
    /// # Errors
    ///
    /// [`BoardError::Configuration`] for an invalid `config`,
    /// [`BoardError::Transport`] for an unusable `url`. An unreachable relay
    /// is not an error; the session starts disconnected.
    pub fn connect_relay<S: TaskSpawner>(
        config: &BoardConfig,
        emitter: Arc<dyn EventEmitter>,
        url: &str,
        options: ConnectOptions,
        spawner: &S,
    ) -> BoardResult<SessionHandle> {
        let (session, handle) = Self::new(config, emitter)?;
        let transport = WsTransport::connect(url, options, session.event_sink(), spawner)?;
        session.spawn(Arc::new(transport), spawner);
        Ok(handle)
    }

    /// Sink for the transport, feeding the same queue as local actions.
    pub fn event_sink(&self) -> EventSink {
        EventSink::session(self.inputs_tx.clone())
    }

    /// Runs the session on `spawner` in the background.
    pub fn spawn<S: TaskSpawner>(self, transport: Arc<dyn Transport>, spawner: &S) {
        spawner.spawn(self.run(transport));
    }

    /// Runs the session loop until shutdown or until every handle is gone.
    pub async fn run(mut self, transport: Arc<dyn Transport>) {
        log::info!("[Session] Started");
        self.connected = transport.is_connected();
        self.publish();

        loop {
            let deadline = self.router.next_deadline();

            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => break,

                _ = wait_for(deadline) => {
                    self.router.expire_due(Instant::now());
                }

                input = self.inputs.recv() => match input {
                    Some(SessionInput::Action(command)) => {
                        let envelope = self.router.dispatch_local(command);
                        transport.send(&envelope);
                    }
                    Some(SessionInput::Viewport(viewport)) => self.router.set_viewport(viewport),
                    Some(SessionInput::Transport(event)) => self.handle_transport(event),
                    None => break,
                },
            }

            self.publish();
        }

        log::info!("[Session] Stopped");
    }

    fn handle_transport(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connected => self.set_connected(true),
            TransportEvent::Disconnected => self.set_connected(false),
            TransportEvent::Message(raw) => {
                self.router.apply_raw(&raw);
            }
        }
    }

    fn set_connected(&mut self, connected: bool) {
        if self.connected == connected {
            return;
        }
        self.connected = connected;
        let timestamp = now_millis();
        if connected {
            log::info!("[Session] Relay reachable, remote effects enabled");
            self.emitter.emit_connection(ConnectionEvent::Connected { timestamp });
        } else {
            log::info!("[Session] Relay unreachable, continuing local-only");
            self.emitter.emit_connection(ConnectionEvent::Disconnected { timestamp });
        }
    }

    fn publish(&self) {
        self.snapshot.send_replace(BoardSnapshot {
            entities: self.router.entities().to_vec(),
            state: self.router.state().clone(),
            connected: self.connected,
        });
    }
}

/// Sleeps until `deadline`, or forever when there is none.
async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
