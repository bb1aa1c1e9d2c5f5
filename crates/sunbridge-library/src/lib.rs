//! Game library collaborator interface for Sunbridge
//!
//! The library itself (its persistence, its filter evaluation) lives outside
//! this workspace. This crate defines the model and the capability traits the
//! reconciliation engine consumes, plus an in-memory implementation for tests
//! and embedding.

mod memory;

pub use memory::MemoryLibrary;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Opaque stable identity of a library game.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(String);

impl GameId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a configured filter preset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PresetId(String);

impl PresetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PresetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A game as seen through the library collaborator. Read-only to Sunbridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,

    /// Display name, used verbatim as the config entry name.
    pub name: String,

    /// Installation directory, if the game is installed.
    pub install_dir: Option<PathBuf>,

    /// Cover image: a local filesystem path or a remote URL.
    pub cover_image: Option<String>,
}

impl Game {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: GameId::new(id),
            name: name.into(),
            install_dir: None,
            cover_image: None,
        }
    }

    pub fn with_cover(mut self, cover: impl Into<String>) -> Self {
        self.cover_image = Some(cover.into());
        self
    }
}

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("Unknown filter preset: {0}")]
    UnknownPreset(PresetId),

    #[error("Filter evaluation failed: {0}")]
    Evaluation(String),
}

/// Read access to the game library.
pub trait GameLibrary {
    /// Look up a single game by its stable identity.
    fn get(&self, id: &GameId) -> Option<Game>;
}

/// Filter-preset evaluation, supplied by the same collaborator as the
/// library itself.
pub trait FilterProvider {
    /// All games currently matching the given preset.
    fn matching_games(&self, preset: &PresetId) -> Result<Vec<Game>, FilterError>;

    /// Whether a single game matches the given preset.
    fn game_matches(&self, game: &Game, preset: &PresetId) -> Result<bool, FilterError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_id_display() {
        let id = GameId::new("game-42");
        assert_eq!(id.to_string(), "game-42");
        assert_eq!(id.as_str(), "game-42");
    }

    #[test]
    fn test_game_builder() {
        let game = Game::new("g1", "Test Game").with_cover("/covers/g1.jpg");
        assert_eq!(game.name, "Test Game");
        assert_eq!(game.cover_image.as_deref(), Some("/covers/g1.jpg"));
        assert!(game.install_dir.is_none());
    }

    #[test]
    fn test_filter_error_display() {
        let err = FilterError::UnknownPreset(PresetId::new("installed"));
        assert!(err.to_string().contains("installed"));
    }
}
