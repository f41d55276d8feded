//! Longer-lived shared slots with last-write-wins semantics.
//!
//! Every mutation overwrites its slot unconditionally. There is no version
//! or merge step: two clients may disagree while mutations race and agree
//! again once traffic quiesces.

use serde::Serialize;

use crate::protocol_constants::{DEFAULT_BRUSH_COLOR, TOWER_DEFENSE_STARTING_GOLD};

/// Tower-defense mini-game slot.
///
/// `idle --start--> playing`, `playing --select-tower--> playing`.
/// Nothing in the protocol returns the game to idle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TowerDefenseState {
    pub is_playing: bool,
    pub gold: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_tower: Option<String>,
}

impl Default for TowerDefenseState {
    fn default() -> Self {
        Self {
            is_playing: false,
            gold: TOWER_DEFENSE_STARTING_GOLD,
            selected_tower: None,
        }
    }
}

/// Names of the shared slots, reported back from [`SharedState::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Slot {
    TowerDefense,
    BrushColor,
    Background,
    Animation,
    Gif,
    Weather,
    VideoUrl,
    DisplayName,
}

/// A single slot overwrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotMutation {
    StartGame,
    SelectTower(String),
    BrushColor(String),
    Background(String),
    Animation(String),
    Gif(String),
    Weather(String),
    VideoUrl(String),
    DisplayName(String),
}

impl SlotMutation {
    /// Slot this mutation writes.
    pub fn slot(&self) -> Slot {
        match self {
            Self::StartGame | Self::SelectTower(_) => Slot::TowerDefense,
            Self::BrushColor(_) => Slot::BrushColor,
            Self::Background(_) => Slot::Background,
            Self::Animation(_) => Slot::Animation,
            Self::Gif(_) => Slot::Gif,
            Self::Weather(_) => Slot::Weather,
            Self::VideoUrl(_) => Slot::VideoUrl,
            Self::DisplayName(_) => Slot::DisplayName,
        }
    }
}

/// Shared board state, created with defaults at session start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedState {
    pub tower_defense: TowerDefenseState,
    pub brush_color: String,
    pub background: Option<String>,
    pub animation: Option<String>,
    pub gif: Option<String>,
    pub weather: Option<String>,
    pub video_url: Option<String>,
    pub display_name: Option<String>,
}

impl Default for SharedState {
    fn default() -> Self {
        Self {
            tower_defense: TowerDefenseState::default(),
            brush_color: DEFAULT_BRUSH_COLOR.to_string(),
            background: None,
            animation: None,
            gif: None,
            weather: None,
            video_url: None,
            display_name: None,
        }
    }
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a mutation. Always succeeds; returns the slot written.
    pub fn apply(&mut self, mutation: SlotMutation) -> Slot {
        let slot = mutation.slot();
        match mutation {
            SlotMutation::StartGame => {
                // A repeated start restarts the economy but never leaves `playing`.
                self.tower_defense.is_playing = true;
                self.tower_defense.gold = TOWER_DEFENSE_STARTING_GOLD;
            }
            SlotMutation::SelectTower(tower) => {
                self.tower_defense.selected_tower = Some(tower);
            }
            SlotMutation::BrushColor(color) => self.brush_color = color,
            SlotMutation::Background(image) => self.background = Some(image),
            SlotMutation::Animation(name) => self.animation = Some(name),
            SlotMutation::Gif(id) => self.gif = Some(id),
            SlotMutation::Weather(location) => self.weather = Some(location),
            SlotMutation::VideoUrl(url) => self.video_url = Some(url),
            SlotMutation::DisplayName(name) => self.display_name = Some(name),
        }
        slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_moves_game_from_idle_to_playing() {
        let mut state = SharedState::new();
        assert!(!state.tower_defense.is_playing);

        assert_eq!(state.apply(SlotMutation::StartGame), Slot::TowerDefense);
        assert!(state.tower_defense.is_playing);
        assert_eq!(state.tower_defense.gold, TOWER_DEFENSE_STARTING_GOLD);
    }

    #[test]
    fn select_tower_only_updates_selection() {
        let mut state = SharedState::new();
        state.apply(SlotMutation::StartGame);
        state.apply(SlotMutation::SelectTower("archer".into()));

        assert!(state.tower_defense.is_playing);
        assert_eq!(state.tower_defense.selected_tower.as_deref(), Some("archer"));
    }

    #[test]
    fn select_tower_while_idle_does_not_start() {
        let mut state = SharedState::new();
        state.apply(SlotMutation::SelectTower("cannon".into()));

        assert!(!state.tower_defense.is_playing);
        assert_eq!(state.tower_defense.selected_tower.as_deref(), Some("cannon"));
    }

    #[test]
    fn last_write_wins_per_slot() {
        let mut state = SharedState::new();
        state.apply(SlotMutation::Background("beach.jpg".into()));
        state.apply(SlotMutation::BrushColor("#ff0000".into()));
        state.apply(SlotMutation::Background("space.jpg".into()));

        assert_eq!(state.background.as_deref(), Some("space.jpg"));
        assert_eq!(state.brush_color, "#ff0000");
        assert_eq!(state.animation, None);
    }

    #[test]
    fn serializes_with_camel_case_slots() {
        let mut state = SharedState::new();
        state.apply(SlotMutation::VideoUrl("https://example.com/v".into()));
        let json = serde_json::to_value(&state).unwrap();

        assert_eq!(json["towerDefense"]["isPlaying"], false);
        assert_eq!(json["videoUrl"], "https://example.com/v");
        assert_eq!(json["brushColor"], DEFAULT_BRUSH_COLOR);
    }
}
