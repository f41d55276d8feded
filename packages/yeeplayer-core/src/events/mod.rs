//! Board events delivered to the UI boundary.
//!
//! This module provides:
//! - [`EventEmitter`] trait the router and session notify through
//! - [`BroadcastEventBridge`] for fan-out to any number of UI subscribers
//! - Event types per category (entities, chat, audio, shared state, connection)

mod bridge;
mod emitter;

pub use bridge::BroadcastEventBridge;
pub use emitter::{EventEmitter, LoggingEventEmitter, NoopEventEmitter};

use serde::Serialize;

use crate::entities::{EntityId, EphemeralEntity};
use crate::shared_state::Slot;

/// Where an applied effect was triggered.
///
/// Only used for tagging; local and remote effects run the same code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Origin {
    /// Triggered by this client's user.
    Local,
    /// Delivered by the transport from another peer.
    Remote,
}

/// Events published to UI subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "category", rename_all = "camelCase")]
pub enum BoardEvent {
    /// Ephemeral entity lifecycle.
    Entity(EntityEvent),

    /// Chat lines.
    Chat(ChatEvent),

    /// Audio cues to play locally.
    Audio(AudioEvent),

    /// Shared slot overwrites.
    State(StateEvent),

    /// Transport connectivity changes.
    Connection(ConnectionEvent),
}

/// Entity spawn and expiry.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EntityEvent {
    /// An entity entered the live collection.
    Spawned {
        entity: EphemeralEntity,
        origin: Origin,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// An entity left the live collection (window ended or evicted).
    Expired {
        id: EntityId,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
}

/// Chat delivery.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ChatEvent {
    Message {
        text: String,
        origin: Origin,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
}

/// Audio playback requests. Audio itself is never replicated, only the cue.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AudioEvent {
    Cue {
        /// Named sound, or `None` for the default drum beat.
        #[serde(skip_serializing_if = "Option::is_none")]
        sound: Option<String>,
        origin: Origin,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
}

/// Shared slot changes.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StateEvent {
    Changed {
        slot: Slot,
        origin: Origin,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
}

/// Transport connectivity.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ConnectionEvent {
    Connected {
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    Disconnected {
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
}

impl From<EntityEvent> for BoardEvent {
    fn from(event: EntityEvent) -> Self {
        BoardEvent::Entity(event)
    }
}

impl From<ChatEvent> for BoardEvent {
    fn from(event: ChatEvent) -> Self {
        BoardEvent::Chat(event)
    }
}

impl From<AudioEvent> for BoardEvent {
    fn from(event: AudioEvent) -> Self {
        BoardEvent::Audio(event)
    }
}

impl From<StateEvent> for BoardEvent {
    fn from(event: StateEvent) -> Self {
        BoardEvent::State(event)
    }
}

impl From<ConnectionEvent> for BoardEvent {
    fn from(event: ConnectionEvent) -> Self {
        BoardEvent::Connection(event)
    }
}
