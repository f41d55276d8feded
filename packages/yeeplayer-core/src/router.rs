//! Command router: the single mapping from event kind to local effect.
//!
//! Every recognised envelope becomes a [`Command`], and every command is
//! applied through one exhaustive match. Local user actions and remote
//! deliveries take the same path, so a remote emoji and a local emoji
//! produce indistinguishable entities (same kind, fresh id, independently
//! drawn position).

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::time::Instant;

use crate::config::BoardConfig;
use crate::entities::{EntityId, EntityKind, EntityManager, EphemeralEntity, Viewport};
use crate::envelope::{decode_str, encode, Envelope, EventKind};
use crate::error::ErrorCode;
use crate::events::{AudioEvent, ChatEvent, EntityEvent, EventEmitter, Origin, StateEvent};
use crate::protocol_constants::{
    KEY_TOWER_DEFENSE_LEGACY, SETTINGS_FIELD_NAME, SETTINGS_FIELD_URL, TOWER_ACTION_SELECT,
    TOWER_ACTION_SELECT_ALIAS, TOWER_ACTION_START,
};
use crate::shared_state::{SharedState, Slot, SlotMutation};
use crate::utils::{non_blank, now_millis};

/// Tower-defense sub-actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TowerAction {
    Start,
    SelectTower(String),
}

/// Settings fields a peer may change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsChange {
    Url(String),
    Name(String),
}

/// Tagged form of every recognised event.
///
/// Adding an event kind means one variant here, one arm in
/// [`Command::to_envelope`], one in [`Command::from_envelope`] and one in
/// [`CommandRouter::apply`]; the compiler enforces the last three.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Sound { sound: Option<String> },
    Emoji { glyph: String },
    Chat { text: String },
    TowerDefense(TowerAction),
    Background { image: String },
    Animation { name: String },
    Settings(SettingsChange),
    Weather { location: String },
    Gif { id: String },
    Whiteboard { color: String },
}

impl Command {
    /// Kind tag of this command.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Sound { .. } => EventKind::Sound,
            Self::Emoji { .. } => EventKind::Emoji,
            Self::Chat { .. } => EventKind::Chat,
            Self::TowerDefense(_) => EventKind::TowerDefense,
            Self::Background { .. } => EventKind::Background,
            Self::Animation { .. } => EventKind::Animation,
            Self::Settings(_) => EventKind::Settings,
            Self::Weather { .. } => EventKind::Weather,
            Self::Gif { .. } => EventKind::Gif,
            Self::Whiteboard { .. } => EventKind::Whiteboard,
        }
    }

    /// Encodes the command. Pure: no effect is applied.
    pub fn to_envelope(&self) -> Envelope {
        let kind = self.kind();
        match self {
            Self::Sound { sound } => encode(kind, sound.clone(), None),
            Self::Emoji { glyph } => encode(kind, Some(glyph.clone()), None),
            Self::Chat { text } => encode(kind, Some(text.clone()), None),
            Self::TowerDefense(TowerAction::Start) => encode(
                kind,
                None,
                Some(json!({ "key": KEY_TOWER_DEFENSE_LEGACY, "value": TOWER_ACTION_START })),
            ),
            Self::TowerDefense(TowerAction::SelectTower(tower)) => encode(
                kind,
                None,
                Some(json!({
                    "key": KEY_TOWER_DEFENSE_LEGACY,
                    "value": TOWER_ACTION_SELECT,
                    "tower": tower,
                })),
            ),
            Self::Background { image } => encode(kind, Some(image.clone()), None),
            Self::Animation { name } => encode(kind, Some(name.clone()), None),
            Self::Settings(SettingsChange::Url(url)) => encode(
                kind,
                Some(SETTINGS_FIELD_URL.to_string()),
                Some(Value::String(url.clone())),
            ),
            Self::Settings(SettingsChange::Name(name)) => encode(
                kind,
                Some(SETTINGS_FIELD_NAME.to_string()),
                Some(Value::String(name.clone())),
            ),
            Self::Weather { location } => encode(kind, Some(location.clone()), None),
            Self::Gif { id } => encode(kind, Some(id.clone()), None),
            Self::Whiteboard { color } => encode(kind, Some(color.clone()), None),
        }
    }

    /// Parses an envelope into a command.
    ///
    /// Returns `None` for unknown keys and for known keys missing a required
    /// argument. Callers treat `None` as a no-op.
    pub fn from_envelope(envelope: &Envelope) -> Option<Self> {
        let value = envelope.value.as_deref();
        let command = match envelope.kind()? {
            EventKind::Sound => Self::Sound {
                sound: non_blank(value).map(str::to_string),
            },
            EventKind::Emoji => Self::Emoji {
                glyph: non_blank(value)?.to_string(),
            },
            EventKind::Chat => {
                non_blank(value)?;
                Self::Chat {
                    text: value?.to_string(),
                }
            }
            EventKind::TowerDefense => Self::TowerDefense(parse_tower_action(envelope)?),
            EventKind::Background => Self::Background {
                image: non_blank(value)?.to_string(),
            },
            EventKind::Animation => Self::Animation {
                name: non_blank(value)?.to_string(),
            },
            EventKind::Settings => Self::Settings(parse_settings(envelope)?),
            EventKind::Weather => Self::Weather {
                location: non_blank(value)?.to_string(),
            },
            EventKind::Gif => Self::Gif {
                id: non_blank(value)?.to_string(),
            },
            EventKind::Whiteboard => Self::Whiteboard {
                color: non_blank(value)?.to_string(),
            },
        };
        Some(command)
    }
}

/// Sub-action comes from `payload.value`, falling back to the envelope value.
fn parse_tower_action(envelope: &Envelope) -> Option<TowerAction> {
    let payload = envelope.payload.as_ref();
    let sub_action = payload
        .and_then(|p| p.get("value"))
        .and_then(Value::as_str)
        .or(envelope.value.as_deref())?;

    match sub_action {
        TOWER_ACTION_START => Some(TowerAction::Start),
        TOWER_ACTION_SELECT | TOWER_ACTION_SELECT_ALIAS => {
            let tower = payload
                .and_then(|p| p.get("tower"))
                .and_then(Value::as_str);
            non_blank(tower).map(|t| TowerAction::SelectTower(t.to_string()))
        }
        _ => None,
    }
}

fn parse_settings(envelope: &Envelope) -> Option<SettingsChange> {
    let field = envelope.value.as_deref()?;
    let new_value = non_blank(envelope.payload.as_ref().and_then(Value::as_str))?.to_string();
    match field {
        SETTINGS_FIELD_URL => Some(SettingsChange::Url(new_value)),
        SETTINGS_FIELD_NAME => Some(SettingsChange::Name(new_value)),
        _ => None,
    }
}

/// Observable outcome of applying one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// An ephemeral entity was spawned.
    Spawned { kind: EntityKind, id: EntityId },
    /// A chat line was delivered.
    Chat,
    /// A shared slot was overwritten.
    Mutated(Slot),
}

/// Owns the entity collection and shared state of one client and applies
/// commands to them.
pub struct CommandRouter {
    entities: EntityManager,
    state: SharedState,
    emitter: Arc<dyn EventEmitter>,
}

impl CommandRouter {
    /// Creates a router with an empty board and default shared state.
    pub fn new(config: &BoardConfig, emitter: Arc<dyn EventEmitter>) -> Self {
        Self {
            entities: EntityManager::new(config),
            state: SharedState::default(),
            emitter,
        }
    }

    /// Encodes a local action, applies its effect immediately and returns
    /// the envelope for the caller to send.
    pub fn dispatch_local(&mut self, command: Command) -> Envelope {
        let envelope = command.to_envelope();
        self.apply(command, Origin::Local);
        envelope
    }

    /// Applies an envelope delivered by the transport.
    ///
    /// Unknown keys and incomplete envelopes are ignored.
    pub fn apply_remote(&mut self, envelope: &Envelope) -> Option<Effect> {
        match Command::from_envelope(envelope) {
            Some(command) => Some(self.apply(command, Origin::Remote)),
            None => {
                log::debug!(
                    "[Router] Ignoring envelope with key {:?} (unknown or incomplete)",
                    envelope.key
                );
                None
            }
        }
    }

    /// Decodes a raw text frame and applies it. Malformed input is dropped.
    pub fn apply_raw(&mut self, raw: &str) -> Option<Effect> {
        match decode_str(raw) {
            Ok(envelope) => self.apply_remote(&envelope),
            Err(e) => {
                log::debug!("[Router] Dropping frame ({}): {}", e.code(), e);
                None
            }
        }
    }

    /// The routing table.
    fn apply(&mut self, command: Command, origin: Origin) -> Effect {
        match command {
            Command::Sound { sound } => self.play_sound(sound, origin),
            Command::Emoji { glyph } => self.spawn_entity(EntityKind::Emoji, Some(glyph), origin),
            Command::Chat { text } => self.deliver_chat(text, origin),
            Command::TowerDefense(TowerAction::Start) => {
                self.mutate(SlotMutation::StartGame, origin)
            }
            Command::TowerDefense(TowerAction::SelectTower(tower)) => {
                self.mutate(SlotMutation::SelectTower(tower), origin)
            }
            Command::Background { image } => self.mutate(SlotMutation::Background(image), origin),
            Command::Animation { name } => self.mutate(SlotMutation::Animation(name), origin),
            Command::Settings(SettingsChange::Url(url)) => {
                self.mutate(SlotMutation::VideoUrl(url), origin)
            }
            Command::Settings(SettingsChange::Name(name)) => {
                self.mutate(SlotMutation::DisplayName(name), origin)
            }
            Command::Weather { location } => self.mutate(SlotMutation::Weather(location), origin),
            Command::Gif { id } => self.mutate(SlotMutation::Gif(id), origin),
            Command::Whiteboard { color } => self.mutate(SlotMutation::BrushColor(color), origin),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Effects
    // ─────────────────────────────────────────────────────────────────────────

    fn play_sound(&mut self, sound: Option<String>, origin: Origin) -> Effect {
        let effect = self.spawn_entity(EntityKind::Note, sound.clone(), origin);
        self.emitter.emit_audio(AudioEvent::Cue {
            sound,
            origin,
            timestamp: now_millis(),
        });
        effect
    }

    fn spawn_entity(&mut self, kind: EntityKind, glyph: Option<String>, origin: Origin) -> Effect {
        let spawned = self.entities.spawn(kind, glyph);
        let timestamp = now_millis();

        for id in spawned.evicted {
            self.emitter.emit_entity(EntityEvent::Expired { id, timestamp });
        }
        if let Some(entity) = self.entities.get(spawned.id) {
            self.emitter.emit_entity(EntityEvent::Spawned {
                entity: entity.clone(),
                origin,
                timestamp,
            });
        }

        log::trace!("[Router] Spawned {:?} {} ({:?})", kind, spawned.id, origin);
        Effect::Spawned {
            kind,
            id: spawned.id,
        }
    }

    fn deliver_chat(&mut self, text: String, origin: Origin) -> Effect {
        self.emitter.emit_chat(ChatEvent::Message {
            text,
            origin,
            timestamp: now_millis(),
        });
        Effect::Chat
    }

    fn mutate(&mut self, mutation: SlotMutation, origin: Origin) -> Effect {
        let slot = self.state.apply(mutation);
        self.emitter.emit_state(StateEvent::Changed {
            slot,
            origin,
            timestamp: now_millis(),
        });
        Effect::Mutated(slot)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expiry and accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Removes entities whose window ended at `now`, emitting an expiry for each.
    pub fn expire_due(&mut self, now: Instant) -> Vec<EntityId> {
        let expired = self.entities.expire_due(now);
        if !expired.is_empty() {
            let timestamp = now_millis();
            for &id in &expired {
                self.emitter.emit_entity(EntityEvent::Expired { id, timestamp });
            }
        }
        expired
    }

    /// Removes one entity ahead of its deadline.
    pub fn expire(&mut self, id: EntityId) -> bool {
        let removed = self.entities.expire(id);
        if removed {
            self.emitter.emit_entity(EntityEvent::Expired {
                id,
                timestamp: now_millis(),
            });
        }
        removed
    }

    /// Earliest pending expiry.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entities.next_deadline()
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.entities.set_viewport(viewport);
    }

    /// Live entities in spawn order.
    pub fn entities(&self) -> &[EphemeralEntity] {
        self.entities.live()
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::decode;
    use crate::events::NoopEventEmitter;
    use crate::test_fixtures::RecordingEventEmitter;

    fn router() -> (CommandRouter, Arc<RecordingEventEmitter>) {
        let emitter = Arc::new(RecordingEventEmitter::new());
        (
            CommandRouter::new(&BoardConfig::default(), emitter.clone()),
            emitter,
        )
    }

    fn every_command() -> Vec<Command> {
        vec![
            Command::Sound { sound: None },
            Command::Sound {
                sound: Some("drumbeat".into()),
            },
            Command::Emoji { glyph: "😍".into() },
            Command::Chat {
                text: "hello board".into(),
            },
            Command::TowerDefense(TowerAction::Start),
            Command::TowerDefense(TowerAction::SelectTower("archer".into())),
            Command::Background {
                image: "beach.jpg".into(),
            },
            Command::Animation {
                name: "snow".into(),
            },
            Command::Settings(SettingsChange::Url("https://example.com/v".into())),
            Command::Settings(SettingsChange::Name("ana".into())),
            Command::Weather {
                location: "Lisbon".into(),
            },
            Command::Gif { id: "xT9Igf".into() },
            Command::Whiteboard {
                color: "#ff8800".into(),
            },
        ]
    }

    #[test]
    fn every_command_survives_the_wire() {
        for command in every_command() {
            let text = command.to_envelope().to_text().unwrap();
            let decoded = decode_str(&text).unwrap();
            assert_eq!(Command::from_envelope(&decoded), Some(command));
        }
    }

    #[test]
    fn local_and_remote_produce_same_effect_class() {
        for command in every_command() {
            let (mut local, local_events) = router();
            let (mut remote, remote_events) = router();

            let envelope = local.dispatch_local(command.clone());
            remote.apply_remote(&envelope).expect("recognised command");

            assert_eq!(local.state(), remote.state(), "{:?}", command);
            assert_eq!(local_events.spawned_kinds(), remote_events.spawned_kinds());
            assert_eq!(local_events.chat_lines(), remote_events.chat_lines());
            assert_eq!(local_events.audio_cues(), remote_events.audio_cues());

            let local_ids: Vec<_> = local.entities().iter().map(|e| e.id).collect();
            let remote_ids: Vec<_> = remote.entities().iter().map(|e| e.id).collect();
            assert_eq!(local_ids.len(), remote_ids.len());
            assert!(local_ids.iter().all(|id| !remote_ids.contains(id)));
        }
    }

    #[test]
    fn local_emoji_spawns_exactly_one_entity_without_network() {
        let (mut router, emitter) = router();
        let envelope = router.dispatch_local(Command::Emoji { glyph: "😍".into() });

        assert_eq!(envelope.key, "emoji");
        assert_eq!(envelope.value.as_deref(), Some("😍"));
        assert_eq!(router.entities().len(), 1);
        assert_eq!(router.entities()[0].kind, EntityKind::Emoji);
        assert_eq!(router.entities()[0].glyph.as_deref(), Some("😍"));
        assert_eq!(emitter.spawned_kinds(), vec![EntityKind::Emoji]);
    }

    #[test]
    fn remote_tower_defense_start_begins_game() {
        let (mut router, emitter) = router();
        let raw = serde_json::json!({
            "key": "tower-defense",
            "value": { "key": "tower defense", "value": "start" }
        });
        let envelope = decode(&raw).unwrap();

        assert!(!router.state().tower_defense.is_playing);
        assert_eq!(
            router.apply_remote(&envelope),
            Some(Effect::Mutated(Slot::TowerDefense))
        );
        assert!(router.state().tower_defense.is_playing);
        assert_eq!(emitter.changed_slots(), vec![Slot::TowerDefense]);
    }

    #[test]
    fn legacy_client_select_tower_shape_is_understood() {
        let (mut router, _) = router();
        router.apply_raw(
            r#"{"key":"tower defense","value":{"key":"tower defense","value":"select tower","tower":"cannon"}}"#,
        );
        assert_eq!(
            router.state().tower_defense.selected_tower.as_deref(),
            Some("cannon")
        );
        assert!(!router.state().tower_defense.is_playing);
    }

    #[test]
    fn local_and_remote_sound_spawn_distinct_notes() {
        let (mut router, emitter) = router();

        router.dispatch_local(Command::Sound { sound: None });
        router.apply_raw(r#"{"key":"sound"}"#);

        let notes = router.entities();
        assert_eq!(notes.len(), 2);
        assert!(notes.iter().all(|n| n.kind == EntityKind::Note));
        assert_ne!(notes[0].id, notes[1].id);
        assert_eq!(emitter.audio_cues(), vec![None, None]);
    }

    #[test]
    fn unknown_key_is_a_silent_noop() {
        let (mut router, emitter) = router();
        let before = router.state().clone();

        assert_eq!(router.apply_raw(r#"{"key":"confetti","value":"🎉"}"#), None);

        assert!(router.entities().is_empty());
        assert_eq!(router.state(), &before);
        assert!(emitter.events().is_empty());
    }

    #[test]
    fn malformed_input_is_dropped_without_mutation() {
        let (mut router, emitter) = router();

        for raw in [r#"{"value":"😍"}"#, "[]", "nope", r#"{"key":false}"#] {
            assert_eq!(router.apply_raw(raw), None);
        }

        assert!(router.entities().is_empty());
        assert_eq!(router.state(), &SharedState::default());
        assert!(emitter.events().is_empty());
    }

    #[test]
    fn known_key_missing_argument_is_ignored() {
        let (mut router, _) = router();

        assert_eq!(router.apply_raw(r#"{"key":"emoji"}"#), None);
        assert_eq!(router.apply_raw(r#"{"key":"background","value":"  "}"#), None);
        assert_eq!(
            router.apply_raw(r#"{"key":"tower-defense","payload":{"value":"retreat"}}"#),
            None
        );
        assert_eq!(
            router.apply_raw(r#"{"key":"settings","value":"theme","payload":"dark"}"#),
            None
        );
        assert!(router.entities().is_empty());
    }

    #[test]
    fn chat_does_not_touch_board() {
        let (mut router, emitter) = router();
        router.apply_raw(r#"{"key":"chat","value":"hi all"}"#);

        assert!(router.entities().is_empty());
        assert_eq!(router.state(), &SharedState::default());
        assert_eq!(emitter.chat_lines(), vec!["hi all".to_string()]);
    }

    #[test]
    fn display_slots_follow_last_received() {
        let (mut router, _) = router();
        router.apply_raw(r#"{"key":"background","value":"beach.jpg"}"#);
        router.dispatch_local(Command::Background {
            image: "space.jpg".into(),
        });
        router.apply_raw(r#"{"key":"settings","value":"url","payload":"https://v.example"}"#);
        router.apply_raw(r##"{"key":"brush","value":"#123456"}"##);

        let state = router.state();
        assert_eq!(state.background.as_deref(), Some("space.jpg"));
        assert_eq!(state.video_url.as_deref(), Some("https://v.example"));
        assert_eq!(state.brush_color, "#123456");
    }

    #[test]
    fn expiry_emits_events_and_empties_board() {
        let (mut router, emitter) = router();
        router.dispatch_local(Command::Emoji { glyph: "👏".into() });
        router.dispatch_local(Command::Sound { sound: None });

        let deadline = router.next_deadline().unwrap();
        let far = deadline + std::time::Duration::from_secs(10);
        assert_eq!(router.expire_due(far).len(), 2);
        assert!(router.entities().is_empty());
        assert_eq!(emitter.expired_count(), 2);
    }

    #[test]
    fn eviction_is_reported_as_expiry() {
        let config = BoardConfig {
            max_live_entities: Some(1),
            ..Default::default()
        };
        let emitter = Arc::new(RecordingEventEmitter::new());
        let mut router = CommandRouter::new(&config, emitter.clone());

        router.dispatch_local(Command::Emoji { glyph: "✨".into() });
        router.dispatch_local(Command::Emoji { glyph: "🎅".into() });

        assert_eq!(router.entities().len(), 1);
        assert_eq!(router.entities()[0].glyph.as_deref(), Some("🎅"));
        assert_eq!(emitter.expired_count(), 1);
    }

    #[test]
    fn unvalidated_config_still_spawns() {
        let config = BoardConfig {
            max_live_entities: Some(0),
            viewport: Viewport::new(0.0, 0.0),
            ..Default::default()
        };
        let emitter = Arc::new(RecordingEventEmitter::new());
        let mut router = CommandRouter::new(&config, emitter.clone());

        router.dispatch_local(Command::Sound { sound: None });
        router.apply_raw(r#"{"key":"emoji","value":"👀"}"#);

        assert_eq!(router.entities().len(), 1);
        assert_eq!(router.entities()[0].kind, EntityKind::Emoji);
        assert_eq!(emitter.expired_count(), 1);
    }

    #[test]
    fn explicit_expire_removes_entity() {
        let mut router = CommandRouter::new(&BoardConfig::default(), Arc::new(NoopEventEmitter));
        router.dispatch_local(Command::Emoji { glyph: "👀".into() });
        let id = router.entities()[0].id;

        assert!(router.expire(id));
        assert!(!router.expire(id));
    }
}
