//! Event emitter abstraction for decoupling board logic from the UI.
//!
//! The router and session depend on the [`EventEmitter`] trait rather than
//! concrete channels, so a UI, a logger or a test double can sit behind it.

use super::{AudioEvent, ChatEvent, ConnectionEvent, EntityEvent, StateEvent};

/// Trait for emitting board events without knowledge of the UI.
///
/// # Example
///
/// ```ignore
/// let router = CommandRouter::new(&config, Arc::new(LoggingEventEmitter));
/// router.dispatch_local(Command::Emoji { glyph: "😍".into() });
/// ```
pub trait EventEmitter: Send + Sync {
    /// Emits an entity spawn/expiry event.
    fn emit_entity(&self, event: EntityEvent);

    /// Emits a chat line.
    fn emit_chat(&self, event: ChatEvent);

    /// Emits an audio cue to be played locally.
    fn emit_audio(&self, event: AudioEvent);

    /// Emits a shared slot change.
    fn emit_state(&self, event: StateEvent);

    /// Emits a connectivity change.
    fn emit_connection(&self, event: ConnectionEvent);
}

/// No-op emitter for headless use or testing.
pub struct NoopEventEmitter;

impl EventEmitter for NoopEventEmitter {
    fn emit_entity(&self, _event: EntityEvent) {}
    fn emit_chat(&self, _event: ChatEvent) {}
    fn emit_audio(&self, _event: AudioEvent) {}
    fn emit_state(&self, _event: StateEvent) {}
    fn emit_connection(&self, _event: ConnectionEvent) {}
}

/// Logging emitter for debugging and development.
///
/// Logs all events at debug level.
pub struct LoggingEventEmitter;

impl EventEmitter for LoggingEventEmitter {
    fn emit_entity(&self, event: EntityEvent) {
        tracing::debug!(?event, "entity_event");
    }

    fn emit_chat(&self, event: ChatEvent) {
        tracing::debug!(?event, "chat_event");
    }

    fn emit_audio(&self, event: AudioEvent) {
        tracing::debug!(?event, "audio_event");
    }

    fn emit_state(&self, event: StateEvent) {
        tracing::debug!(?event, "state_event");
    }

    fn emit_connection(&self, event: ConnectionEvent) {
        tracing::debug!(?event, "connection_event");
    }
}
