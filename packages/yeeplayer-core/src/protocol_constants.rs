//! Fixed protocol constants shared by every peer and the relay.
//!
//! Wire keys must stay stable: peers running older builds route unknown
//! keys to a no-op, so keys may be added but never renamed.

// ─────────────────────────────────────────────────────────────────────────────
// Wire Keys
// ─────────────────────────────────────────────────────────────────────────────

/// Canonical wire key for sound cues.
pub const KEY_SOUND: &str = "sound";

/// Canonical wire key for emoji bursts.
pub const KEY_EMOJI: &str = "emoji";

/// Canonical wire key for chat lines.
pub const KEY_CHAT: &str = "chat";

/// Canonical wire key for the tower-defense mini-game.
pub const KEY_TOWER_DEFENSE: &str = "tower-defense";

/// Key older web clients used for the mini-game (also the payload's inner key).
pub const KEY_TOWER_DEFENSE_LEGACY: &str = "tower defense";

/// Canonical wire key for background images.
pub const KEY_BACKGROUND: &str = "background";

/// Alias emitted by the background panel for uploaded images.
pub const KEY_BACKGROUND_IMAGE_ALIAS: &str = "image";

/// Canonical wire key for board animations.
pub const KEY_ANIMATION: &str = "animation";

/// Canonical wire key for settings changes.
pub const KEY_SETTINGS: &str = "settings";

/// Canonical wire key for the weather widget.
pub const KEY_WEATHER: &str = "weather";

/// Canonical wire key for gifs.
pub const KEY_GIF: &str = "gif";

/// Canonical wire key for the whiteboard brush colour.
pub const KEY_WHITEBOARD: &str = "whiteboard";

/// Alias accepted for the whiteboard brush colour.
pub const KEY_WHITEBOARD_BRUSH_ALIAS: &str = "brush";

/// Tower-defense sub-action that starts the game.
pub const TOWER_ACTION_START: &str = "start";

/// Tower-defense sub-action that selects a tower, as web clients send it.
pub const TOWER_ACTION_SELECT: &str = "select tower";

/// Hyphenated spelling of the select sub-action, accepted on decode.
pub const TOWER_ACTION_SELECT_ALIAS: &str = "select-tower";

/// Settings field carrying the shared video URL.
pub const SETTINGS_FIELD_URL: &str = "url";

/// Settings field carrying the viewer display name.
pub const SETTINGS_FIELD_NAME: &str = "name";

// ─────────────────────────────────────────────────────────────────────────────
// Entity Lifetimes
// ─────────────────────────────────────────────────────────────────────────────

/// Presentation window of a music-note burst (milliseconds).
pub const DEFAULT_NOTE_LIFETIME_MS: u64 = 2000;

/// Presentation window of an emoji burst (milliseconds).
pub const DEFAULT_EMOJI_LIFETIME_MS: u64 = 3000;

/// Default viewport width used before the UI reports its size.
pub const DEFAULT_VIEWPORT_WIDTH: f32 = 1280.0;

/// Default viewport height used before the UI reports its size.
pub const DEFAULT_VIEWPORT_HEIGHT: f32 = 720.0;

// ─────────────────────────────────────────────────────────────────────────────
// Shared State Defaults
// ─────────────────────────────────────────────────────────────────────────────

/// Gold a fresh tower-defense game starts with.
pub const TOWER_DEFENSE_STARTING_GOLD: u32 = 100;

/// Brush colour before anyone picks one.
pub const DEFAULT_BRUSH_COLOR: &str = "#000000";

/// Emoji offered by the quick-reaction panel.
pub const QUICK_EMOJI: [&str; 6] = ["😍", "😎", "👏", "👀", "✨", "🎅"];

// ─────────────────────────────────────────────────────────────────────────────
// Channels
// ─────────────────────────────────────────────────────────────────────────────

/// Capacity of the board event broadcast channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Capacity of a board session's input queue (local actions and transport
/// events together).
pub const INPUT_CHANNEL_CAPACITY: usize = 256;

/// Capacity of the outbound transport queue. Sends beyond this are dropped.
pub const TRANSPORT_OUTBOUND_CAPACITY: usize = 64;

/// Capacity of the relay fan-out channel.
pub const RELAY_CHANNEL_CAPACITY: usize = 1024;

// ─────────────────────────────────────────────────────────────────────────────
// Relay
// ─────────────────────────────────────────────────────────────────────────────

/// First port tried when no port is configured.
pub const RELAY_PORT_RANGE_START: u16 = 8000;

/// Last port tried when no port is configured.
pub const RELAY_PORT_RANGE_END: u16 = 8010;

/// Interval between relay pings (seconds).
pub const WS_HEARTBEAT_CHECK_INTERVAL_SECS: u64 = 15;

/// Silence after which the relay drops a connection (seconds).
pub const WS_HEARTBEAT_TIMEOUT_SECS: u64 = 45;

/// Delay between client reconnect attempts (milliseconds).
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 1000;

/// Service identifier reported by the relay health endpoint.
pub const SERVICE_ID: &str = "yeeplayer-relay";
