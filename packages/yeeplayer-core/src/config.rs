//! Configuration for board sessions and the relay.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::entities::{EntityKind, Viewport};
use crate::protocol_constants::{
    DEFAULT_EMOJI_LIFETIME_MS, DEFAULT_NOTE_LIFETIME_MS, EVENT_CHANNEL_CAPACITY,
    INPUT_CHANNEL_CAPACITY, RELAY_CHANNEL_CAPACITY, WS_HEARTBEAT_CHECK_INTERVAL_SECS,
    WS_HEARTBEAT_TIMEOUT_SECS,
};

/// Client-side board configuration.
///
/// All fields have sensible defaults.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct BoardConfig {
    /// Presentation window of a music note (milliseconds).
    pub note_lifetime_ms: u64,

    /// Presentation window of an emoji (milliseconds).
    pub emoji_lifetime_ms: u64,

    /// Initial viewport extent used for spawn positions.
    pub viewport: Viewport,

    /// Upper bound on live entities. `None` keeps every entity until it
    /// expires; `Some(n)` evicts the oldest entity when a spawn would exceed `n`.
    pub max_live_entities: Option<usize>,

    /// Capacity of the board event broadcast channel.
    pub event_channel_capacity: usize,

    /// Capacity of the session input queue shared by local actions and
    /// transport events.
    pub input_channel_capacity: usize,
}

impl BoardConfig {
    /// Lifetime of an entity of the given kind.
    pub fn lifetime(&self, kind: EntityKind) -> Duration {
        match kind {
            EntityKind::Note => Duration::from_millis(self.note_lifetime_ms),
            EntityKind::Emoji => Duration::from_millis(self.emoji_lifetime_ms),
        }
    }

    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.note_lifetime_ms == 0 || self.emoji_lifetime_ms == 0 {
            return Err("entity lifetimes must be >= 1ms".to_string());
        }
        if !self.viewport.is_valid() {
            return Err(format!(
                "viewport must have a positive finite extent, got {}x{}",
                self.viewport.width, self.viewport.height
            ));
        }
        if self.max_live_entities == Some(0) {
            return Err("max_live_entities must be >= 1 when set".to_string());
        }
        if self.event_channel_capacity == 0 {
            return Err(
                "event_channel_capacity must be >= 1 (broadcast::channel panics on 0)".to_string(),
            );
        }
        if self.input_channel_capacity == 0 {
            return Err("input_channel_capacity must be >= 1".to_string());
        }
        Ok(())
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            note_lifetime_ms: DEFAULT_NOTE_LIFETIME_MS,
            emoji_lifetime_ms: DEFAULT_EMOJI_LIFETIME_MS,
            viewport: Viewport::default(),
            max_live_entities: None,
            event_channel_capacity: EVENT_CHANNEL_CAPACITY,
            input_channel_capacity: INPUT_CHANNEL_CAPACITY,
        }
    }
}

/// Relay server configuration.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RelayConfig {
    /// Preferred port for the relay (0 = first free port in the default range).
    pub preferred_port: u16,

    /// Interval between pings sent to each connection (seconds).
    pub heartbeat_interval_secs: u64,

    /// Silence after which a connection is dropped (seconds).
    pub heartbeat_timeout_secs: u64,

    /// Capacity of the fan-out channel. Slow connections skip frames beyond it.
    pub channel_capacity: usize,
}

impl RelayConfig {
    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.heartbeat_interval_secs == 0 {
            return Err("heartbeat_interval_secs must be >= 1".to_string());
        }
        if self.heartbeat_timeout_secs <= self.heartbeat_interval_secs {
            return Err(format!(
                "heartbeat_timeout_secs ({}) must exceed heartbeat_interval_secs ({})",
                self.heartbeat_timeout_secs, self.heartbeat_interval_secs
            ));
        }
        if self.channel_capacity == 0 {
            return Err("channel_capacity must be >= 1".to_string());
        }
        Ok(())
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            preferred_port: 0,
            heartbeat_interval_secs: WS_HEARTBEAT_CHECK_INTERVAL_SECS,
            heartbeat_timeout_secs: WS_HEARTBEAT_TIMEOUT_SECS,
            channel_capacity: RELAY_CHANNEL_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(BoardConfig::default().validate().is_ok());
        assert!(RelayConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_lifetime() {
        let config = BoardConfig {
            emoji_lifetime_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_empty_viewport() {
        let config = BoardConfig {
            viewport: Viewport::new(0.0, 600.0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_entity_cap() {
        let config = BoardConfig {
            max_live_entities: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn relay_timeout_must_exceed_interval() {
        let config = RelayConfig {
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 30,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn lifetime_depends_on_kind() {
        let config = BoardConfig::default();
        assert_eq!(
            config.lifetime(EntityKind::Note),
            Duration::from_millis(DEFAULT_NOTE_LIFETIME_MS)
        );
        assert_eq!(
            config.lifetime(EntityKind::Emoji),
            Duration::from_millis(DEFAULT_EMOJI_LIFETIME_MS)
        );
    }
}
