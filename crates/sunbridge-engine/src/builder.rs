//! Building config entries from library games

use std::path::{Path, PathBuf};
use sunbridge_config::{AppEntry, canonical_uuid};
use sunbridge_library::Game;
use uuid::Uuid;

/// Maps a library game plus its stable UUID to a streaming-host app entry.
///
/// Best effort by design: a missing launcher executable degrades to a URI
/// deep link and a missing or remote cover image is simply left out.
pub struct EntryBuilder {
    /// Library frontend executable used for the launch command.
    launcher: Option<PathBuf>,

    /// URI scheme for the deep-link fallback when no executable is known.
    uri_scheme: String,
}

impl EntryBuilder {
    pub fn new(launcher: Option<PathBuf>, uri_scheme: impl Into<String>) -> Self {
        let launcher = launcher.filter(|p| p.exists());
        Self {
            launcher,
            uri_scheme: uri_scheme.into(),
        }
    }

    /// Locate the frontend executable on PATH.
    pub fn detect(binary: &str, uri_scheme: &str) -> Self {
        let launcher = which::which(binary).ok();
        if let Some(path) = &launcher {
            tracing::debug!("Using frontend launcher at {}", path.display());
        } else {
            tracing::debug!(
                "Frontend launcher '{}' not found, falling back to {}:// deep links",
                binary,
                uri_scheme
            );
        }
        Self::new(launcher, uri_scheme)
    }

    /// Build the entry for a game. `uuid` and `id` handling is the caller's
    /// concern; the returned entry carries the canonical uuid text and no
    /// numeric id.
    pub fn build(&self, game: &Game, uuid: &Uuid) -> AppEntry {
        let command = match &self.launcher {
            Some(exe) => format!("\"{}\" --start {}", exe.display(), game.id),
            None => format!("{}://play/{}", self.uri_scheme, game.id),
        };

        let mut entry = AppEntry::new(game.name.clone(), canonical_uuid(uuid));
        entry.detached.push(command);
        entry.image_path = self.cover_image_path(game);
        entry
    }

    /// Resolve the cover image to a local path, if one exists. The host
    /// requires local files, so remote covers are skipped.
    fn cover_image_path(&self, game: &Game) -> Option<String> {
        let cover = game.cover_image.as_deref()?;

        if cover.get(..4).is_some_and(|p| p.eq_ignore_ascii_case("http")) {
            tracing::debug!("Skipping remote cover image for {}", game.name);
            return None;
        }

        if Path::new(cover).exists() {
            Some(cover.to_string())
        } else {
            tracing::debug!("Cover image for {} not found at {}", game.name, cover);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uuid() -> Uuid {
        Uuid::parse_str("aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee").unwrap()
    }

    #[test]
    fn test_build_uses_uri_fallback_without_launcher() {
        let builder = EntryBuilder::new(None, "frontend");
        let game = Game::new("g1", "Test Game");

        let entry = builder.build(&game, &uuid());
        assert_eq!(entry.name, "Test Game");
        assert_eq!(entry.uuid, "AAAAAAAA-BBBB-CCCC-DDDD-EEEEEEEEEEEE");
        assert_eq!(entry.detached, vec!["frontend://play/g1".to_string()]);
        assert!(entry.id.is_empty());
    }

    #[test]
    fn test_build_uses_launcher_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("frontend");
        std::fs::write(&exe, "#!/bin/sh").unwrap();

        let builder = EntryBuilder::new(Some(exe.clone()), "frontend");
        let entry = builder.build(&Game::new("g1", "Test Game"), &uuid());

        assert_eq!(entry.detached.len(), 1);
        assert!(entry.detached[0].contains("--start g1"));
        assert!(entry.detached[0].contains(&exe.display().to_string()));
    }

    #[test]
    fn test_missing_launcher_path_degrades_to_uri() {
        let builder = EntryBuilder::new(Some(PathBuf::from("/nonexistent/frontend")), "frontend");
        let entry = builder.build(&Game::new("g1", "Test Game"), &uuid());
        assert_eq!(entry.detached, vec!["frontend://play/g1".to_string()]);
    }

    #[test]
    fn test_local_cover_image_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("cover.jpg");
        std::fs::write(&image, "img").unwrap();

        let builder = EntryBuilder::new(None, "frontend");
        let game = Game::new("g1", "Test Game").with_cover(image.display().to_string());

        let entry = builder.build(&game, &uuid());
        assert_eq!(entry.image_path, Some(image.display().to_string()));
    }

    #[test]
    fn test_remote_cover_image_is_skipped() {
        let builder = EntryBuilder::new(None, "frontend");
        let game = Game::new("g1", "Test Game").with_cover("https://example.com/cover.jpg");

        let entry = builder.build(&game, &uuid());
        assert!(entry.image_path.is_none());
    }

    #[test]
    fn test_missing_cover_file_is_skipped() {
        let builder = EntryBuilder::new(None, "frontend");
        let game = Game::new("g1", "Test Game").with_cover("/nonexistent/cover.jpg");

        let entry = builder.build(&game, &uuid());
        assert!(entry.image_path.is_none());
    }
}
