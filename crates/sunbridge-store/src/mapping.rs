//! Game-to-UUID identity mapping

use crate::StoreError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use sunbridge_library::GameId;
use uuid::Uuid;

/// Durable game-identity to external-UUID mapping.
///
/// Removal is only ever driven by a uuid being absent from the config
/// document ([`IdentityStore::reconcile_against`]) or by an explicit
/// `remove`; a game disappearing from the library alone never invalidates a
/// mapping while its config entry survives.
pub trait IdentityStore {
    fn get(&self, game: &GameId) -> Option<Uuid>;

    /// Return the existing UUID for a game, generating and recording a fresh
    /// random one only if absent. Idempotent.
    fn assign(&mut self, game: &GameId) -> Uuid;

    fn remove(&mut self, game: &GameId) -> Option<Uuid>;

    fn contains(&self, game: &GameId) -> bool {
        self.get(game).is_some()
    }

    /// Snapshot of all mappings. No ordering guarantee.
    fn entries(&self) -> Vec<(GameId, Uuid)>;

    /// Drop every mapping whose uuid is not in `present`, returning the
    /// affected game ids.
    fn reconcile_against(&mut self, present: &HashSet<Uuid>) -> Vec<GameId>;

    /// Persist the current state.
    fn flush(&mut self) -> Result<(), StoreError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct MappingFile {
    #[serde(default)]
    mappings: HashMap<GameId, Uuid>,
}

/// File-backed identity store. Loaded once at startup, mutated in memory,
/// flushed after each mutating operation or pass.
#[derive(Debug)]
pub struct MappingStore {
    path: Option<PathBuf>,
    mappings: HashMap<GameId, Uuid>,
}

impl MappingStore {
    /// Open a store backed by the given file, loading existing mappings if
    /// the file is present.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let mappings = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            let file: MappingFile =
                serde_json::from_str(&raw).map_err(|source| StoreError::Parse {
                    path: path.clone(),
                    source,
                })?;
            file.mappings
        } else {
            HashMap::new()
        };

        tracing::debug!(
            "Opened mapping store at {} with {} entries",
            path.display(),
            mappings.len()
        );

        Ok(Self {
            path: Some(path),
            mappings,
        })
    }

    /// Create a store with no file backing (for testing).
    pub fn in_memory() -> Self {
        Self {
            path: None,
            mappings: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

impl IdentityStore for MappingStore {
    fn get(&self, game: &GameId) -> Option<Uuid> {
        self.mappings.get(game).copied()
    }

    fn assign(&mut self, game: &GameId) -> Uuid {
        if let Some(existing) = self.mappings.get(game) {
            return *existing;
        }

        let uuid = Uuid::new_v4();
        tracing::debug!("Assigned new UUID {} to game {}", uuid, game);
        self.mappings.insert(game.clone(), uuid);
        uuid
    }

    fn remove(&mut self, game: &GameId) -> Option<Uuid> {
        self.mappings.remove(game)
    }

    fn entries(&self) -> Vec<(GameId, Uuid)> {
        self.mappings
            .iter()
            .map(|(g, u)| (g.clone(), *u))
            .collect()
    }

    fn reconcile_against(&mut self, present: &HashSet<Uuid>) -> Vec<GameId> {
        let orphaned: Vec<GameId> = self
            .mappings
            .iter()
            .filter(|(_, uuid)| !present.contains(uuid))
            .map(|(game, _)| game.clone())
            .collect();

        for game in &orphaned {
            if let Some(uuid) = self.mappings.remove(game) {
                tracing::debug!("Dropping orphaned mapping: game {} -> {}", game, uuid);
            }
        }

        if !orphaned.is_empty() {
            tracing::info!("Dropped {} orphaned mapping entries", orphaned.len());
        }

        orphaned
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = MappingFile {
            mappings: self.mappings.clone(),
        };
        let contents = serde_json::to_string_pretty(&file)?;
        std::fs::write(path, contents)?;

        tracing::debug!(
            "Flushed mapping store to {} with {} entries",
            path.display(),
            self.mappings.len()
        );
        Ok(())
    }
}
