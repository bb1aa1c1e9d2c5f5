//! Full-pass reconciliation orchestration

use crate::progress::{CancelToken, ProgressSink, SyncReport};
use crate::{EntryBuilder, SyncError, sync};
use std::collections::HashSet;
use std::path::PathBuf;
use sunbridge_config::{AppsDocument, AppsRepository, canonical_uuid};
use sunbridge_library::{FilterProvider, Game, GameId, GameLibrary};
use sunbridge_store::{IdentityStore, SyncSettings};

/// Reconciles the streaming host's config document against the library.
///
/// All collaborators are injected at construction; substituting in-memory
/// implementations of the repository and store changes nothing about the
/// pass logic. A pass is single-threaded and phases run strictly in order;
/// callers serialize pass invocations (see [`crate::SyncWorker`]).
pub struct SyncEngine<L, R, S> {
    library: L,
    repo: R,
    store: S,
    builder: EntryBuilder,
    settings: SyncSettings,
    settings_path: Option<PathBuf>,
}

impl<L, R, S> SyncEngine<L, R, S>
where
    L: GameLibrary + FilterProvider,
    R: AppsRepository,
    S: IdentityStore,
{
    pub fn new(library: L, repo: R, store: S, builder: EntryBuilder, settings: SyncSettings) -> Self {
        Self {
            library,
            repo,
            store,
            builder,
            settings,
            settings_path: None,
        }
    }

    /// Persist settings changes (pins) to this path.
    pub fn with_settings_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_path = Some(path.into());
        self
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn library_mut(&mut self) -> &mut L {
        &mut self.library
    }

    /// Drop identity mappings whose uuid is absent from the on-disk
    /// document. Runs standalone at process start and as the first phase of
    /// every pass, self-healing drift from external edits.
    pub fn sync_store(&mut self) -> Result<Vec<GameId>, SyncError> {
        let document = self.repo.load()?;
        self.reconcile_store(&document)
    }

    fn reconcile_store(&mut self, document: &AppsDocument) -> Result<Vec<GameId>, SyncError> {
        let dropped = self.store.reconcile_against(&document.uuid_set());
        if !dropped.is_empty() {
            self.store.flush()?;
        }
        Ok(dropped)
    }

    /// Run one full reconciliation pass.
    pub fn full_sync(&mut self, progress: &dyn ProgressSink, cancel: &CancelToken) -> SyncReport {
        tracing::info!("Starting full sync pass");
        let mut report = SyncReport::default();

        // Phase 1: load the document and self-heal the identity store.
        let mut document = match self.repo.load() {
            Ok(d) => d,
            Err(e) => {
                tracing::error!("Cannot sync this pass, load failed: {}", e);
                report.failed = self.inclusion_set().len();
                report.errors.push(format!("Failed to load apps config: {}", e));
                progress.completed(&report);
                return report;
            }
        };
        // Mappings whose entry was deleted externally. Captured before the
        // store reconcile below drops them, so this pass can refrain from
        // resurrecting the entries. The next pass starts from a clean store
        // and treats those games as brand new.
        let manually_removed = self.manually_removed(&document);
        if let Err(e) = self.reconcile_store(&document) {
            report.errors.push(format!("Failed to flush mapping store: {}", e));
        }

        // Phase 2: inclusion set, OR across all selected presets.
        if self.settings.included_presets.is_empty() {
            tracing::warn!("No filter presets selected, nothing will be synced");
            report.errors.push(SyncError::NoPresetsConfigured.to_string());
            progress.completed(&report);
            return report;
        }

        let included = self.inclusion_set();
        if included.is_empty() {
            // A preset evaluating to nothing must not cascade into clearing
            // the whole file.
            tracing::warn!("No games match the selected filter presets");
            report
                .errors
                .push("No games match the selected filter presets".to_string());
            progress.completed(&report);
            return report;
        }
        tracing::info!("{} games match the selected filter presets", included.len());

        // Phase 3: remove stale managed games, pins exempt.
        report.removed = self.remove_stale(&mut document);

        // Phases 4-5: add or update each candidate.
        let total = included.len();
        for (index, game) in included.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::info!(
                    "Sync cancelled, {} candidates left for the next pass",
                    total - index
                );
                break;
            }
            progress.progress(index, total, &game.name);

            if manually_removed.contains(&game.id) {
                tracing::info!(
                    "Skipping {}: entry was removed externally, not resurrecting it",
                    game.name
                );
                continue;
            }

            match sync::add_or_update(&mut document, &mut self.store, &self.builder, game) {
                Ok(()) => report.added_or_updated += 1,
                Err(e) => {
                    report.failed += 1;
                    report
                        .errors
                        .push(format!("Failed to process {}: {}", game.name, e));
                    tracing::error!("Failed to process {}: {}", game.name, e);
                }
            }
        }

        // Phase 6: one commit, then absorb the just-written state.
        if report.added_or_updated > 0 || report.removed > 0 {
            if let Err(e) = self.commit(&document) {
                tracing::error!("Failed to persist sync results: {}", e);
                report.failed += report.added_or_updated + report.removed;
                report.added_or_updated = 0;
                report.removed = 0;
                report.errors.push(format!("Failed to save changes: {}", e));
            }
        }

        tracing::info!(
            "Sync pass complete: {} added/updated, {} failed, {} removed",
            report.added_or_updated,
            report.failed,
            report.removed
        );
        progress.completed(&report);
        report
    }

    /// Batch export of explicitly chosen games. Pins them first so later
    /// filter changes cannot remove a manual export.
    pub fn export_games(&mut self, ids: &[GameId], progress: &dyn ProgressSink) -> SyncReport {
        let mut report = SyncReport::default();

        let mut pinned = 0;
        for id in ids {
            if self.settings.pin(id) {
                pinned += 1;
            }
        }
        if pinned > 0 {
            tracing::info!("Auto-pinned {} manually exported games", pinned);
            self.persist_settings();
        }

        let mut document = match self.repo.load() {
            Ok(d) => d,
            Err(e) => {
                report.failed = ids.len();
                report.errors.push(format!("Failed to load apps config: {}", e));
                progress.completed(&report);
                return report;
            }
        };

        let total = ids.len();
        for (index, id) in ids.iter().enumerate() {
            let Some(game) = self.library.get(id) else {
                report.failed += 1;
                report.errors.push(format!("Game not found in library: {}", id));
                continue;
            };
            progress.progress(index, total, &game.name);

            match sync::add_or_update(&mut document, &mut self.store, &self.builder, &game) {
                Ok(()) => report.added_or_updated += 1,
                Err(e) => {
                    report.failed += 1;
                    report
                        .errors
                        .push(format!("Failed to export {}: {}", game.name, e));
                }
            }
        }

        if report.added_or_updated > 0 {
            if let Err(e) = self.commit(&document) {
                report.failed += report.added_or_updated;
                report.added_or_updated = 0;
                report.errors.push(format!("Failed to save changes: {}", e));
            }
        }

        progress.completed(&report);
        report
    }

    /// Batch removal of explicitly chosen games.
    pub fn remove_games(&mut self, ids: &[GameId], progress: &dyn ProgressSink) -> SyncReport {
        let mut report = SyncReport::default();

        let mut document = match self.repo.load() {
            Ok(d) => d,
            Err(e) => {
                report.failed = ids.len();
                report.errors.push(format!("Failed to load apps config: {}", e));
                progress.completed(&report);
                return report;
            }
        };

        let total = ids.len();
        for (index, id) in ids.iter().enumerate() {
            progress.progress(index, total, id.as_str());
            if sync::remove(&mut document, &mut self.store, id) {
                report.removed += 1;
            } else {
                report.failed += 1;
                report.errors.push(format!("Not managed: {}", id));
            }
        }

        if report.removed > 0 {
            if let Err(e) = self.commit(&document) {
                report.failed += report.removed;
                report.removed = 0;
                report.errors.push(format!("Failed to save changes: {}", e));
            }
        }

        progress.completed(&report);
        report
    }

    /// Add or update one game with an immediate write.
    pub fn export_game_now(&mut self, id: &GameId) -> Result<(), SyncError> {
        let game = self
            .library
            .get(id)
            .ok_or_else(|| SyncError::GameNotFound(id.clone()))?;

        let mut document = self.repo.load()?;
        sync::add_or_update(&mut document, &mut self.store, &self.builder, &game)?;
        self.commit(&document)
    }

    /// Remove one game with an immediate write. Tolerates the game having
    /// already vanished from the library; an orphaned mapping is dropped
    /// either way. Returns false when the game was not managed.
    pub fn remove_game_now(&mut self, id: &GameId) -> Result<bool, SyncError> {
        if !self.store.contains(id) {
            return Ok(false);
        }

        let mut document = self.repo.load()?;
        sync::remove(&mut document, &mut self.store, id);
        self.commit(&document)?;
        Ok(true)
    }

    /// Pin games, persisting settings. Returns how many were newly pinned.
    pub fn pin_games(&mut self, ids: &[GameId]) -> usize {
        let mut changed = 0;
        for id in ids {
            if self.settings.pin(id) {
                changed += 1;
            }
        }
        if changed > 0 {
            tracing::info!("Pinned {} games", changed);
            self.persist_settings();
        }
        changed
    }

    /// Unpin games, persisting settings. Returns how many were unpinned.
    pub fn unpin_games(&mut self, ids: &[GameId]) -> usize {
        let mut changed = 0;
        for id in ids {
            if self.settings.unpin(id) {
                changed += 1;
            }
        }
        if changed > 0 {
            tracing::info!("Unpinned {} games", changed);
            self.persist_settings();
        }
        changed
    }

    fn commit(&mut self, document: &AppsDocument) -> Result<(), SyncError> {
        self.repo.save(document)?;
        self.store.flush()?;

        // Absorb the state just written, in case save-side dedup changed it.
        let saved = self.repo.load()?;
        self.reconcile_store(&saved)?;
        Ok(())
    }

    fn persist_settings(&self) {
        if let Some(path) = &self.settings_path {
            if let Err(e) = self.settings.save(path) {
                tracing::error!("Failed to save settings to {}: {}", path.display(), e);
            }
        }
    }

    /// Union of all selected presets' matches, first-seen order, duplicates
    /// collapsed. A failing preset is logged and skipped; the others still
    /// contribute.
    fn inclusion_set(&self) -> Vec<Game> {
        let mut seen: HashSet<GameId> = HashSet::new();
        let mut included = Vec::new();

        for preset in &self.settings.included_presets {
            match self.library.matching_games(preset) {
                Ok(games) => {
                    tracing::debug!("Preset {} matched {} games", preset, games.len());
                    for game in games {
                        if seen.insert(game.id.clone()) {
                            included.push(game);
                        }
                    }
                }
                Err(e) => {
                    tracing::error!("Failed to evaluate filter preset {}: {}", preset, e);
                }
            }
        }

        included
    }

    /// OR semantics over the selected presets for a single game.
    fn game_meets_filters(&self, game: &Game) -> bool {
        for preset in &self.settings.included_presets {
            match self.library.game_matches(game, preset) {
                Ok(true) => return true,
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(
                        "Failed to check {} against preset {}: {}",
                        game.name,
                        preset,
                        e
                    );
                }
            }
        }
        false
    }

    /// Phase 3: drop every managed game that is gone from the library, or
    /// that is unpinned and no longer matches any preset. Returns the number
    /// of entries removed from the document.
    fn remove_stale(&mut self, document: &mut AppsDocument) -> usize {
        let mut removed = 0;

        for (game_id, uuid) in self.store.entries() {
            let stale = match self.library.get(&game_id) {
                None => {
                    tracing::info!("Removing {}: no longer exists in library", game_id);
                    true
                }
                Some(game) => {
                    if self.settings.is_pinned(&game_id) {
                        tracing::debug!("Keeping {}: pinned", game.name);
                        false
                    } else if self.game_meets_filters(&game) {
                        false
                    } else {
                        tracing::info!(
                            "Removing {}: no longer matches filters and is not pinned",
                            game.name
                        );
                        true
                    }
                }
            };

            if stale {
                removed += document.remove_entries(&canonical_uuid(&uuid));
                self.store.remove(&game_id);
            }
        }

        removed
    }

    /// A mapping without a matching entry in the freshly loaded document
    /// means the entry was deleted externally.
    fn manually_removed(&self, document: &AppsDocument) -> HashSet<GameId> {
        self.store
            .entries()
            .into_iter()
            .filter(|(_, uuid)| !document.contains_uuid(&canonical_uuid(uuid)))
            .map(|(game, _)| game)
            .collect()
    }
}
