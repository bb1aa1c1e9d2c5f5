//! User settings persistence

use crate::StoreError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use sunbridge_library::{GameId, PresetId};

/// User-facing sync configuration, persisted as TOML alongside the mapping
/// store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Override for the host's apps.json location. Absent or blank means
    /// the default install location is resolved instead.
    #[serde(default)]
    pub apps_path: Option<PathBuf>,

    /// Filter presets whose union forms the inclusion set.
    #[serde(default)]
    pub included_presets: Vec<PresetId>,

    /// Games exempt from filter-driven removal.
    #[serde(default)]
    pub pinned: BTreeSet<GameId>,

    #[serde(default)]
    pub sync_on_startup: bool,

    #[serde(default = "default_true")]
    pub sync_on_library_update: bool,
}

fn default_true() -> bool {
    true
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            apps_path: None,
            included_presets: Vec::new(),
            pinned: BTreeSet::new(),
            sync_on_startup: false,
            sync_on_library_update: true,
        }
    }
}

impl SyncSettings {
    /// Load settings from a file.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let contents = std::fs::read_to_string(path)?;
        let settings: Self = toml::from_str(&contents)?;
        Ok(settings)
    }

    /// Load settings, falling back to defaults when the file is absent.
    pub fn load_or_default(path: &Path) -> Result<Self, StoreError> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::warn!(
                "No settings file at {}, using defaults",
                path.display()
            );
            Ok(Self::default())
        }
    }

    /// Save settings to a file.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, contents)?;
        tracing::debug!("Settings saved to {}", path.display());
        Ok(())
    }

    /// Pin a game. Returns whether the pin set changed.
    pub fn pin(&mut self, game: &GameId) -> bool {
        self.pinned.insert(game.clone())
    }

    /// Unpin a game. Returns whether the pin set changed.
    pub fn unpin(&mut self, game: &GameId) -> bool {
        self.pinned.remove(game)
    }

    pub fn is_pinned(&self, game: &GameId) -> bool {
        self.pinned.contains(game)
    }
}
