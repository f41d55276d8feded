//! Ephemeral entity lifecycle: spawn, live window, self-expiry.
//!
//! Each client spawns its own independent entity for every logical event.
//! Positions are drawn locally and never sent over the wire, so the same
//! reaction lands somewhere different on every screen. Expiry depends only
//! on the clock, never on connectivity.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use uuid::Uuid;

use crate::config::BoardConfig;
use crate::protocol_constants::{DEFAULT_VIEWPORT_HEIGHT, DEFAULT_VIEWPORT_WIDTH};

/// Opaque, locally unique entity identifier.
pub type EntityId = Uuid;

/// What an entity renders as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    /// Floating emoji burst.
    Emoji,
    /// Music-note burst accompanying a sound cue.
    Note,
}

/// Viewport extent in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Returns `true` if both dimensions are finite and positive.
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    /// Draws a position uniformly over `[0, width) x [0, height)`.
    pub fn random_position<R: Rng + ?Sized>(&self, rng: &mut R) -> Position {
        Position {
            x: rng.gen_range(0.0..self.width),
            y: rng.gen_range(0.0..self.height),
        }
    }

    /// Returns `true` if `pos` lies inside the viewport.
    pub fn contains(&self, pos: Position) -> bool {
        (0.0..self.width).contains(&pos.x) && (0.0..self.height).contains(&pos.y)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(DEFAULT_VIEWPORT_WIDTH, DEFAULT_VIEWPORT_HEIGHT)
    }
}

/// Viewport-relative coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

/// A live, independently rendered visual effect.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EphemeralEntity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub position: Position,
    /// Emoji glyph, or the sound name for notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub glyph: Option<String>,
    #[serde(skip)]
    pub spawned_at: Instant,
    #[serde(skip)]
    pub expires_at: Instant,
}

/// Result of a spawn: the new id plus whatever was evicted to make room.
#[derive(Debug, Clone, PartialEq)]
pub struct Spawned {
    pub id: EntityId,
    pub evicted: Vec<EntityId>,
}

/// Owns the ordered collection of live entities.
pub struct EntityManager {
    live: Vec<EphemeralEntity>,
    viewport: Viewport,
    note_lifetime: Duration,
    emoji_lifetime: Duration,
    max_live: Option<usize>,
}

impl EntityManager {
    /// Creates an empty manager from the board configuration.
    ///
    /// Never fails: an invalid viewport falls back to the default extent and
    /// a cap of zero is treated as one.
    pub fn new(config: &BoardConfig) -> Self {
        let viewport = if config.viewport.is_valid() {
            config.viewport
        } else {
            log::warn!("[Entities] Invalid viewport {:?}, using default", config.viewport);
            Viewport::default()
        };
        Self {
            live: Vec::new(),
            viewport,
            note_lifetime: config.lifetime(EntityKind::Note),
            emoji_lifetime: config.lifetime(EntityKind::Emoji),
            max_live: config.max_live_entities.map(|max| max.max(1)),
        }
    }

    /// Current viewport used for new spawns.
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Replaces the viewport. Invalid extents are ignored.
    ///
    /// Live entities keep their positions; only later spawns use the new extent.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        if viewport.is_valid() {
            self.viewport = viewport;
        } else {
            log::warn!("[Entities] Ignoring invalid viewport {:?}", viewport);
        }
    }

    /// Lifetime of an entity of `kind`.
    pub fn lifetime(&self, kind: EntityKind) -> Duration {
        match kind {
            EntityKind::Note => self.note_lifetime,
            EntityKind::Emoji => self.emoji_lifetime,
        }
    }

    /// Spawns an entity now.
    pub fn spawn(&mut self, kind: EntityKind, glyph: Option<String>) -> Spawned {
        self.spawn_at(kind, glyph, Instant::now())
    }

    /// Spawns an entity as of `now` with a fresh id and a random position.
    pub fn spawn_at(&mut self, kind: EntityKind, glyph: Option<String>, now: Instant) -> Spawned {
        let mut evicted = Vec::new();
        if let Some(max) = self.max_live {
            while self.live.len() >= max && !self.live.is_empty() {
                let oldest = self.live.remove(0);
                log::debug!("[Entities] Evicting oldest entity {}", oldest.id);
                evicted.push(oldest.id);
            }
        }

        let id = Uuid::new_v4();
        let position = self.viewport.random_position(&mut rand::thread_rng());
        self.live.push(EphemeralEntity {
            id,
            kind,
            position,
            glyph,
            spawned_at: now,
            expires_at: now + self.lifetime(kind),
        });

        Spawned { id, evicted }
    }

    /// Removes an entity. Returns `false` if it was already gone.
    pub fn expire(&mut self, id: EntityId) -> bool {
        let before = self.live.len();
        self.live.retain(|e| e.id != id);
        self.live.len() != before
    }

    /// Removes every entity whose window has ended at `now`.
    pub fn expire_due(&mut self, now: Instant) -> Vec<EntityId> {
        let mut expired = Vec::new();
        self.live.retain(|e| {
            if e.expires_at <= now {
                expired.push(e.id);
                false
            } else {
                true
            }
        });
        expired
    }

    /// Earliest pending expiry, if any entity is live.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.live.iter().map(|e| e.expires_at).min()
    }

    /// Live entities in spawn order.
    pub fn live(&self) -> &[EphemeralEntity] {
        &self.live
    }

    pub fn get(&self, id: EntityId) -> Option<&EphemeralEntity> {
        self.live.iter().find(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}
