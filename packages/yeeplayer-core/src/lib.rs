//! YeePlayer Core - shared library for YeePlayer.
//!
//! YeePlayer lets a group of viewers on a shared board send lightweight
//! reactions (emoji bursts, music notes, chat lines) and drive a handful of
//! shared widgets (a tower-defense mini-game, background, animation, gif,
//! weather, whiteboard brush colour, settings). Every action is encoded as a
//! small envelope, applied locally at once and fanned out to every other
//! peer through a stateless relay.
//!
//! # Architecture
//!
//! - [`envelope`]: `{key, value, payload}` wire codec
//! - [`router`]: the single event-kind to effect mapping
//! - [`entities`]: short-lived visual entities with scheduled expiry
//! - [`shared_state`]: last-write-wins widget slots
//! - [`session`]: the per-client loop tying router, transport and timers together
//! - [`transport`]: relay client (WebSocket) and in-process hub
//! - [`api`]: the relay server
//! - [`events`]: domain events for renderers and audio
//! - [`error`]: centralized error types
//!
//! # Abstraction Traits
//!
//! - [`TaskSpawner`](runtime::TaskSpawner): Spawning background tasks
//! - [`EventEmitter`](events::EventEmitter): Emitting domain events
//! - [`Transport`](transport::Transport): Reaching other peers

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod config;
pub mod entities;
pub mod envelope;
pub mod error;
pub mod events;
pub mod protocol_constants;
pub mod router;
pub mod runtime;
pub mod session;
pub mod shared_state;
pub mod transport;
pub mod utils;

#[cfg(test)]
mod test_fixtures;

// Re-export commonly used types
pub use config::{BoardConfig, RelayConfig};
pub use entities::{EntityId, EntityKind, EphemeralEntity, Position, Viewport};
pub use envelope::{decode, decode_str, encode, DecodeError, Envelope, EventKind};
pub use error::{BoardError, BoardResult, ErrorCode};
pub use events::{
    BoardEvent, BroadcastEventBridge, EventEmitter, LoggingEventEmitter, NoopEventEmitter, Origin,
};
pub use router::{Command, CommandRouter, Effect, SettingsChange, TowerAction};
pub use runtime::{TaskSpawner, TokioSpawner};
pub use session::{BoardSession, BoardSnapshot, SessionHandle};
pub use shared_state::{SharedState, Slot, TowerDefenseState};
pub use transport::{
    ConnectOptions, EventSink, MemoryHub, MemoryTransport, Transport, TransportError,
    TransportEvent, WsTransport,
};
pub use utils::now_millis;

// Re-export relay server
pub use api::{start_server, RelayConnectionManager, RelayState, ServerError};
