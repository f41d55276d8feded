//! Shared test doubles used by multiple test modules.

use parking_lot::Mutex;

use crate::entities::EntityKind;
use crate::events::{
    AudioEvent, BoardEvent, ChatEvent, ConnectionEvent, EntityEvent, EventEmitter, StateEvent,
};
use crate::shared_state::Slot;

/// Emitter that records every event for later assertions.
#[derive(Default)]
pub struct RecordingEventEmitter {
    events: Mutex<Vec<BoardEvent>>,
}

impl RecordingEventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<BoardEvent> {
        self.events.lock().clone()
    }

    pub fn spawned_kinds(&self) -> Vec<EntityKind> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                BoardEvent::Entity(EntityEvent::Spawned { entity, .. }) => Some(entity.kind),
                _ => None,
            })
            .collect()
    }

    pub fn expired_count(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| matches!(e, BoardEvent::Entity(EntityEvent::Expired { .. })))
            .count()
    }

    pub fn chat_lines(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                BoardEvent::Chat(ChatEvent::Message { text, .. }) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn audio_cues(&self) -> Vec<Option<String>> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                BoardEvent::Audio(AudioEvent::Cue { sound, .. }) => Some(sound.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn changed_slots(&self) -> Vec<Slot> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                BoardEvent::State(StateEvent::Changed { slot, .. }) => Some(*slot),
                _ => None,
            })
            .collect()
    }
}

impl EventEmitter for RecordingEventEmitter {
    fn emit_entity(&self, event: EntityEvent) {
        self.events.lock().push(event.into());
    }

    fn emit_chat(&self, event: ChatEvent) {
        self.events.lock().push(event.into());
    }

    fn emit_audio(&self, event: AudioEvent) {
        self.events.lock().push(event.into());
    }

    fn emit_state(&self, event: StateEvent) {
        self.events.lock().push(event.into());
    }

    fn emit_connection(&self, event: ConnectionEvent) {
        self.events.lock().push(event.into());
    }
}
