//! Wire envelope shared by every peer.
//!
//! An envelope is `{ key, value?, payload? }`. The key selects an
//! [`EventKind`]; keys this build does not know still decode so that
//! newer peers never crash older ones.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::protocol_constants::{
    KEY_ANIMATION, KEY_BACKGROUND, KEY_BACKGROUND_IMAGE_ALIAS, KEY_CHAT, KEY_EMOJI, KEY_GIF,
    KEY_SETTINGS, KEY_SOUND, KEY_TOWER_DEFENSE, KEY_TOWER_DEFENSE_LEGACY, KEY_WEATHER,
    KEY_WHITEBOARD, KEY_WHITEBOARD_BRUSH_ALIAS,
};

/// Errors produced while decoding raw input into an [`Envelope`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Input is not an object with a string `key`.
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),
}

pub type DecodeResult<T> = Result<T, DecodeError>;

/// Closed set of event kinds understood by this build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Sound,
    Emoji,
    Chat,
    TowerDefense,
    Background,
    Animation,
    Settings,
    Weather,
    Gif,
    Whiteboard,
}

impl EventKind {
    /// Every kind, in wire-table order.
    pub const ALL: [EventKind; 10] = [
        EventKind::Sound,
        EventKind::Emoji,
        EventKind::Chat,
        EventKind::TowerDefense,
        EventKind::Background,
        EventKind::Animation,
        EventKind::Settings,
        EventKind::Weather,
        EventKind::Gif,
        EventKind::Whiteboard,
    ];

    /// Canonical wire key. Always used when encoding.
    pub fn as_key(&self) -> &'static str {
        match self {
            Self::Sound => KEY_SOUND,
            Self::Emoji => KEY_EMOJI,
            Self::Chat => KEY_CHAT,
            Self::TowerDefense => KEY_TOWER_DEFENSE,
            Self::Background => KEY_BACKGROUND,
            Self::Animation => KEY_ANIMATION,
            Self::Settings => KEY_SETTINGS,
            Self::Weather => KEY_WEATHER,
            Self::Gif => KEY_GIF,
            Self::Whiteboard => KEY_WHITEBOARD,
        }
    }

    /// Resolves a wire key, accepting the aliases older clients send.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            KEY_SOUND => Some(Self::Sound),
            KEY_EMOJI => Some(Self::Emoji),
            KEY_CHAT => Some(Self::Chat),
            KEY_TOWER_DEFENSE | KEY_TOWER_DEFENSE_LEGACY => Some(Self::TowerDefense),
            KEY_BACKGROUND | KEY_BACKGROUND_IMAGE_ALIAS => Some(Self::Background),
            KEY_ANIMATION => Some(Self::Animation),
            KEY_SETTINGS => Some(Self::Settings),
            KEY_WEATHER => Some(Self::Weather),
            KEY_GIF => Some(Self::Gif),
            KEY_WHITEBOARD | KEY_WHITEBOARD_BRUSH_ALIAS => Some(Self::Whiteboard),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_key())
    }
}

/// The message exchanged between peers.
///
/// Envelopes are stateless: built, sent, decoded and dropped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    /// Event kind tag. May be a key this build does not recognise.
    pub key: String,
    /// Optional scalar argument (glyph, text, image name, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Optional structured argument.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl Envelope {
    /// Returns the recognised kind, or `None` for keys from a newer protocol.
    pub fn kind(&self) -> Option<EventKind> {
        EventKind::from_key(&self.key)
    }

    /// Serializes the envelope to its JSON text frame.
    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serializes the envelope to a JSON value.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Builds an envelope for `kind`. A `null` payload is treated as absent.
pub fn encode(kind: EventKind, value: Option<String>, payload: Option<Value>) -> Envelope {
    Envelope {
        key: kind.as_key().to_string(),
        value,
        payload: payload.filter(|p| !p.is_null()),
    }
}

/// Decodes a raw JSON value into an envelope.
///
/// A structured (non-string) `value` is the shape older web clients used
/// for the mini-game; it is moved into `payload` when no payload is
/// present and discarded otherwise.
pub fn decode(raw: &Value) -> DecodeResult<Envelope> {
    let obj = raw
        .as_object()
        .ok_or_else(|| DecodeError::MalformedEnvelope("envelope is not an object".into()))?;

    let key = match obj.get("key") {
        Some(Value::String(key)) => key.clone(),
        Some(_) => {
            return Err(DecodeError::MalformedEnvelope(
                "key is not a string".into(),
            ))
        }
        None => return Err(DecodeError::MalformedEnvelope("missing key".into())),
    };

    let mut payload = match obj.get("payload") {
        None | Some(Value::Null) => None,
        Some(p) => Some(p.clone()),
    };

    let value = match obj.get("value") {
        None | Some(Value::Null) => None,
        Some(Value::String(v)) => Some(v.clone()),
        Some(structured) => {
            if payload.is_none() {
                payload = Some(structured.clone());
            } else {
                log::debug!("[Envelope] Dropping structured value on {:?}", key);
            }
            None
        }
    };

    Ok(Envelope {
        key,
        value,
        payload,
    })
}

/// Decodes a JSON text frame. Text that is not JSON is malformed.
pub fn decode_str(text: &str) -> DecodeResult<Envelope> {
    let raw: Value = serde_json::from_str(text)
        .map_err(|e| DecodeError::MalformedEnvelope(format!("invalid JSON: {}", e)))?;
    decode(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_recovers_encoded_fields_for_every_kind() {
        for kind in EventKind::ALL {
            let env = encode(
                kind,
                Some("v".to_string()),
                Some(json!({ "nested": [1, 2, 3] })),
            );
            let decoded = decode(&env.to_value().unwrap()).expect("encoded envelope should decode");

            assert_eq!(decoded.kind(), Some(kind));
            assert_eq!(decoded.value.as_deref(), Some("v"));
            assert_eq!(decoded.payload, Some(json!({ "nested": [1, 2, 3] })));
        }
    }

    #[test]
    fn text_frame_matches_value_form() {
        let env = encode(EventKind::Emoji, Some("😍".into()), None);
        let text = env.to_text().unwrap();
        assert_eq!(text, r#"{"key":"emoji","value":"😍"}"#);
        assert_eq!(decode_str(&text).unwrap(), env);

        let with_payload = encode(EventKind::TowerDefense, None, Some(json!({ "action": "start" })));
        let value = with_payload.to_value().unwrap();
        assert_eq!(value, json!({ "key": "tower-defense", "payload": { "action": "start" } }));
        assert_eq!(
            value,
            serde_json::from_str::<Value>(&with_payload.to_text().unwrap()).unwrap()
        );
    }

    #[test]
    fn missing_key_is_malformed() {
        let err = decode(&json!({ "value": "😍" })).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedEnvelope(_)));
    }

    #[test]
    fn non_string_key_is_malformed() {
        assert!(decode(&json!({ "key": 7 })).is_err());
        assert!(decode(&json!("sound")).is_err());
        assert!(decode(&json!(null)).is_err());
    }

    #[test]
    fn non_json_text_is_malformed() {
        assert!(matches!(
            decode_str("not json"),
            Err(DecodeError::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn unknown_key_decodes_without_kind() {
        let env = decode(&json!({ "key": "confetti", "value": "lots" })).unwrap();
        assert_eq!(env.key, "confetti");
        assert_eq!(env.kind(), None);
    }

    #[test]
    fn structured_value_moves_into_payload() {
        let raw = json!({
            "key": "tower-defense",
            "value": { "key": "tower defense", "value": "start" }
        });
        let env = decode(&raw).unwrap();
        assert_eq!(env.value, None);
        assert_eq!(
            env.payload,
            Some(json!({ "key": "tower defense", "value": "start" }))
        );
    }

    #[test]
    fn legacy_aliases_resolve_to_canonical_kinds() {
        assert_eq!(
            EventKind::from_key("tower defense"),
            Some(EventKind::TowerDefense)
        );
        assert_eq!(EventKind::from_key("image"), Some(EventKind::Background));
        assert_eq!(EventKind::from_key("brush"), Some(EventKind::Whiteboard));
        assert_eq!(EventKind::TowerDefense.as_key(), "tower-defense");
    }

    #[test]
    fn null_fields_are_absent() {
        let env = decode(&json!({ "key": "sound", "value": null, "payload": null })).unwrap();
        assert_eq!(env.value, None);
        assert_eq!(env.payload, None);
        assert_eq!(encode(EventKind::Sound, None, Some(Value::Null)).payload, None);
    }
}
