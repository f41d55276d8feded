//! Bridge implementation that maps board events to a broadcast channel.
//!
//! The [`BroadcastEventBridge`] sits between the board core and any number
//! of UI subscribers (a renderer, a terminal printer, a test).

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;

use super::emitter::EventEmitter;
use super::{AudioEvent, BoardEvent, ChatEvent, ConnectionEvent, EntityEvent, StateEvent};

/// Bridges board events to a `tokio::sync::broadcast` channel.
///
/// An optional external emitter (e.g. one that plays audio cues) receives
/// every event first and can be set after construction.
///
/// # Thread Safety
///
/// The bridge is `Send + Sync` and can be shared across async tasks.
#[derive(Clone)]
pub struct BroadcastEventBridge {
    tx: broadcast::Sender<BoardEvent>,
    external_emitter: Arc<RwLock<Option<Arc<dyn EventEmitter>>>>,
}

impl BroadcastEventBridge {
    /// Creates a new bridge with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            external_emitter: Arc::new(RwLock::new(None)),
        }
    }

    /// Sets an external emitter that sees every event before subscribers do.
    pub fn set_external_emitter(&self, emitter: Arc<dyn EventEmitter>) {
        *self.external_emitter.write() = Some(emitter);
    }

    /// Returns a new receiver for the broadcast channel.
    pub fn subscribe(&self) -> broadcast::Receiver<BoardEvent> {
        self.tx.subscribe()
    }
}

/// Generates an [`EventEmitter`] method that forwards to the external emitter
/// (if set) and then sends to the broadcast channel.
macro_rules! impl_emit {
    ($method:ident, $event_ty:ty, $variant:ident) => {
        fn $method(&self, event: $event_ty) {
            if let Some(ref emitter) = *self.external_emitter.read() {
                emitter.$method(event.clone());
            }
            if let Err(e) = self.tx.send(BoardEvent::$variant(event)) {
                log::trace!("[EventBridge] No broadcast receivers: {}", e);
            }
        }
    };
}

impl EventEmitter for BroadcastEventBridge {
    impl_emit!(emit_entity, EntityEvent, Entity);
    impl_emit!(emit_chat, ChatEvent, Chat);
    impl_emit!(emit_audio, AudioEvent, Audio);
    impl_emit!(emit_state, StateEvent, State);
    impl_emit!(emit_connection, ConnectionEvent, Connection);
}
