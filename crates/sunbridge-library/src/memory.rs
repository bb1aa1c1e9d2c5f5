//! In-memory library implementation

use crate::{FilterError, FilterProvider, Game, GameId, GameLibrary, PresetId};
use std::collections::{BTreeMap, HashMap};

type PresetFn = Box<dyn Fn(&Game) -> bool + Send + Sync>;

enum Preset {
    Predicate(PresetFn),
    /// Always fails evaluation. Used to exercise fault tolerance.
    Failing,
}

/// In-memory game library with closure-backed filter presets.
#[derive(Default)]
pub struct MemoryLibrary {
    games: BTreeMap<GameId, Game>,
    presets: HashMap<PresetId, Preset>,
}

impl MemoryLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a game.
    pub fn insert(&mut self, game: Game) {
        self.games.insert(game.id.clone(), game);
    }

    /// Remove a game, returning it if present.
    pub fn remove(&mut self, id: &GameId) -> Option<Game> {
        self.games.remove(id)
    }

    /// Register a filter preset backed by a predicate.
    pub fn add_preset(
        &mut self,
        id: impl Into<String>,
        predicate: impl Fn(&Game) -> bool + Send + Sync + 'static,
    ) -> PresetId {
        let id = PresetId::new(id);
        self.presets
            .insert(id.clone(), Preset::Predicate(Box::new(predicate)));
        id
    }

    /// Register a preset whose evaluation always fails.
    pub fn add_failing_preset(&mut self, id: impl Into<String>) -> PresetId {
        let id = PresetId::new(id);
        self.presets.insert(id.clone(), Preset::Failing);
        id
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}

impl GameLibrary for MemoryLibrary {
    fn get(&self, id: &GameId) -> Option<Game> {
        self.games.get(id).cloned()
    }
}

impl FilterProvider for MemoryLibrary {
    fn matching_games(&self, preset: &PresetId) -> Result<Vec<Game>, FilterError> {
        match self.presets.get(preset) {
            Some(Preset::Predicate(p)) => {
                Ok(self.games.values().filter(|g| p(g)).cloned().collect())
            }
            Some(Preset::Failing) => Err(FilterError::Evaluation(format!(
                "Preset {} evaluation failed",
                preset
            ))),
            None => Err(FilterError::UnknownPreset(preset.clone())),
        }
    }

    fn game_matches(&self, game: &Game, preset: &PresetId) -> Result<bool, FilterError> {
        match self.presets.get(preset) {
            Some(Preset::Predicate(p)) => Ok(p(game)),
            Some(Preset::Failing) => Err(FilterError::Evaluation(format!(
                "Preset {} evaluation failed",
                preset
            ))),
            None => Err(FilterError::UnknownPreset(preset.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library_with_two_games() -> MemoryLibrary {
        let mut lib = MemoryLibrary::new();
        lib.insert(Game::new("g1", "Alpha"));
        lib.insert(Game::new("g2", "Beta"));
        lib
    }

    #[test]
    fn test_insert_and_get() {
        let lib = library_with_two_games();
        assert_eq!(lib.len(), 2);
        let game = lib.get(&GameId::new("g1")).unwrap();
        assert_eq!(game.name, "Alpha");
        assert!(lib.get(&GameId::new("missing")).is_none());
    }

    #[test]
    fn test_preset_matching() {
        let mut lib = library_with_two_games();
        let preset = lib.add_preset("alpha-only", |g| g.name == "Alpha");

        let matched = lib.matching_games(&preset).unwrap();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].name, "Alpha");

        let beta = lib.get(&GameId::new("g2")).unwrap();
        assert!(!lib.game_matches(&beta, &preset).unwrap());
    }

    #[test]
    fn test_unknown_preset_errors() {
        let lib = library_with_two_games();
        let result = lib.matching_games(&PresetId::new("nope"));
        assert!(matches!(result, Err(FilterError::UnknownPreset(_))));
    }

    #[test]
    fn test_failing_preset_errors() {
        let mut lib = library_with_two_games();
        let preset = lib.add_failing_preset("broken");
        assert!(lib.matching_games(&preset).is_err());
        let game = lib.get(&GameId::new("g1")).unwrap();
        assert!(lib.game_matches(&game, &preset).is_err());
    }
}
