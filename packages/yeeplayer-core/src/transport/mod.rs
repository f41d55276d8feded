//! Transport adapters: how envelopes leave and reach this client.
//!
//! The board core only relies on the contract below, never on a concrete
//! socket:
//!
//! - best-effort fan-out to every other currently connected peer
//! - at most once per peer, no ordering across senders
//! - no delivery confirmation, no retry, no queueing while disconnected
//!
//! Inbound traffic and connectivity changes are pushed as [`TransportEvent`]s
//! into the [`EventSink`] the transport was created with. A board session
//! hands out a sink onto its own input queue, so remote frames and local
//! actions are applied in the order they reached the client.

mod memory;
mod ws;

pub use memory::{MemoryHub, MemoryTransport};
pub use ws::{ConnectOptions, WsTransport};

use thiserror::Error;
use tokio::sync::mpsc;

use crate::envelope::Envelope;
use crate::session::SessionInput;

/// Errors raised while setting up a transport.
///
/// Sending never fails; see [`Transport::send`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The relay URL could not be parsed.
    #[error("Invalid relay URL {0:?}")]
    InvalidUrl(String),

    /// The relay URL does not use `ws://` or `wss://`.
    #[error("Unsupported URL scheme {0:?} (expected ws or wss)")]
    UnsupportedScheme(String),
}

pub type TransportResult<T> = Result<T, TransportError>;

/// Something the transport observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The session reached the relay (initially or after a reconnect).
    Connected,
    /// The session lost the relay. Remote effects stop until reconnected.
    Disconnected,
    /// A raw text frame from another peer, not yet decoded.
    Message(String),
}

/// Outbound half of a transport session.
pub trait Transport: Send + Sync {
    /// Sends an envelope to every other connected peer.
    ///
    /// Never blocks and never fails: while disconnected, or when the outbound
    /// queue is full, the envelope is dropped.
    fn send(&self, envelope: &Envelope);

    /// Whether the session currently reaches the relay.
    fn is_connected(&self) -> bool;
}

/// Delivery end for [`TransportEvent`]s.
#[derive(Clone)]
pub struct EventSink {
    target: SinkTarget,
}

#[derive(Clone)]
enum SinkTarget {
    Channel(mpsc::Sender<TransportEvent>),
    Session(mpsc::Sender<SessionInput>),
}

impl EventSink {
    /// A sink backed by a plain event channel.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<TransportEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                target: SinkTarget::Channel(tx),
            },
            rx,
        )
    }

    /// A sink feeding a board session's input queue.
    pub(crate) fn session(inputs: mpsc::Sender<SessionInput>) -> Self {
        Self {
            target: SinkTarget::Session(inputs),
        }
    }

    /// Delivers without waiting. Returns `false` if the queue is full or closed.
    pub fn try_deliver(&self, event: TransportEvent) -> bool {
        match &self.target {
            SinkTarget::Channel(tx) => tx.try_send(event).is_ok(),
            SinkTarget::Session(tx) => tx.try_send(SessionInput::Transport(event)).is_ok(),
        }
    }

    /// Delivers, waiting for queue space. Returns `false` once the receiving
    /// side is gone.
    pub async fn deliver(&self, event: TransportEvent) -> bool {
        match &self.target {
            SinkTarget::Channel(tx) => tx.send(event).await.is_ok(),
            SinkTarget::Session(tx) => tx.send(SessionInput::Transport(event)).await.is_ok(),
        }
    }
}
