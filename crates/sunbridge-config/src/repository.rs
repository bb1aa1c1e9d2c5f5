//! Loading and persisting the apps.json document

use crate::{AppsDocument, ConfigError};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Known streaming-host installation directories, in preference order.
const HOST_DIRS: [&str; 2] = ["Apollo", "Sunshine"];

const SAVE_ATTEMPTS: u32 = 3;
const SAVE_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Access to the host's apps.json document.
///
/// Implementations must re-read backing state on every `load` call; the file
/// is owned by the streaming host and may change between operations.
pub trait AppsRepository {
    fn load(&self) -> Result<AppsDocument, ConfigError>;
    fn save(&self, document: &AppsDocument) -> Result<(), ConfigError>;
}

/// Filesystem-backed repository.
pub struct FsAppsRepository {
    /// Configured path. `None` (or blank) falls back to the default host
    /// install location.
    path: Option<PathBuf>,
}

impl FsAppsRepository {
    pub fn new(path: Option<PathBuf>) -> Self {
        let path = path.filter(|p| !p.as_os_str().is_empty());
        Self { path }
    }

    /// Resolve the effective file path. When no path is configured, prefer
    /// whichever known host installation already has a config file; when
    /// neither exists (or when writing a fresh file), use the first.
    fn resolve(&self, prefer_existing: bool) -> PathBuf {
        if let Some(path) = &self.path {
            return path.clone();
        }

        let root = install_root();
        let candidates: Vec<PathBuf> = HOST_DIRS
            .iter()
            .map(|dir| root.join(dir).join("config").join("apps.json"))
            .collect();

        if prefer_existing {
            for candidate in &candidates {
                if candidate.exists() {
                    return candidate.clone();
                }
            }
        }

        candidates[0].clone()
    }
}

#[cfg(windows)]
fn install_root() -> PathBuf {
    std::env::var_os("ProgramW6432")
        .or_else(|| std::env::var_os("ProgramFiles"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(r"C:\Program Files"))
}

#[cfg(not(windows))]
fn install_root() -> PathBuf {
    PathBuf::from("/opt")
}

impl AppsRepository for FsAppsRepository {
    fn load(&self) -> Result<AppsDocument, ConfigError> {
        let path = self.resolve(true);
        tracing::debug!("Loading apps config from {}", path.display());

        if !path.exists() {
            tracing::debug!("Apps config does not exist, starting from default document");
            return Ok(AppsDocument::default());
        }

        let raw = std::fs::read_to_string(&path)?;
        let mut document: AppsDocument =
            serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?;

        document.dedup();
        tracing::info!(
            "Loaded apps config from {} with {} apps",
            path.display(),
            document.apps.len()
        );
        Ok(document)
    }

    fn save(&self, document: &AppsDocument) -> Result<(), ConfigError> {
        let path = self.resolve(false);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Dedup again in case a caller appended a duplicate uuid in memory.
        let mut document = document.clone();
        document.dedup();
        let contents = serde_json::to_string_pretty(&document)?;

        let mut last_error = None;
        for attempt in 1..=SAVE_ATTEMPTS {
            match std::fs::write(&path, &contents) {
                Ok(()) => {
                    tracing::info!(
                        "Saved apps config to {} with {} apps",
                        path.display(),
                        document.apps.len()
                    );
                    return Ok(());
                }
                Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                    // Not transient; the caller prompts for access instead.
                    return Err(ConfigError::PermissionDenied(path));
                }
                Err(e) => {
                    tracing::warn!(
                        "Write attempt {} of {} to {} failed: {}",
                        attempt,
                        SAVE_ATTEMPTS,
                        path.display(),
                        e
                    );
                    last_error = Some(e);
                    if attempt < SAVE_ATTEMPTS {
                        std::thread::sleep(SAVE_RETRY_DELAY * attempt);
                    }
                }
            }
        }

        Err(ConfigError::WriteRetriesExhausted {
            path,
            attempts: SAVE_ATTEMPTS,
            source: last_error.unwrap_or_else(|| std::io::Error::other("write failed")),
        })
    }
}

/// In-memory repository for tests and alternate embeddings.
#[derive(Default)]
pub struct MemoryRepository {
    document: Mutex<AppsDocument>,
    fail_next_save: AtomicBool,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(document: AppsDocument) -> Self {
        Self {
            document: Mutex::new(document),
            fail_next_save: AtomicBool::new(false),
        }
    }

    /// Make the next `save` call fail with an IO error.
    pub fn fail_next_save(&self) {
        self.fail_next_save.store(true, Ordering::SeqCst);
    }

    /// Replace the stored document directly, bypassing `save`. Used to
    /// simulate external edits between operations.
    pub fn set_document(&self, document: AppsDocument) {
        *self.document.lock().unwrap() = document;
    }

    pub fn document(&self) -> AppsDocument {
        self.document.lock().unwrap().clone()
    }
}

impl AppsRepository for MemoryRepository {
    fn load(&self) -> Result<AppsDocument, ConfigError> {
        let mut document = self.document.lock().unwrap().clone();
        document.dedup();
        Ok(document)
    }

    fn save(&self, document: &AppsDocument) -> Result<(), ConfigError> {
        if self.fail_next_save.swap(false, Ordering::SeqCst) {
            return Err(ConfigError::Io(std::io::Error::other(
                "injected save failure",
            )));
        }

        let mut deduped = document.clone();
        deduped.dedup();
        *self.document.lock().unwrap() = deduped;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AppEntry;

    fn temp_repo(dir: &tempfile::TempDir) -> FsAppsRepository {
        FsAppsRepository::new(Some(dir.path().join("config").join("apps.json")))
    }

    #[test]
    fn test_load_missing_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let repo = temp_repo(&dir);

        let doc = repo.load().unwrap();
        assert!(doc.apps.is_empty());
        assert_eq!(doc.version, 2);
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let repo = temp_repo(&dir);

        repo.save(&AppsDocument::default()).unwrap();
        assert!(dir.path().join("config").join("apps.json").exists());
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let repo = temp_repo(&dir);

        let mut doc = AppsDocument::default();
        let mut entry = AppEntry::new("Game One", "AAAAAAAA-BBBB-CCCC-DDDD-EEEEEEEEEEEE");
        entry.id = "123".to_string();
        entry.detached.push("launch --start g1".to_string());
        doc.apps.push(entry);

        repo.save(&doc).unwrap();
        let loaded = repo.load().unwrap();
        assert_eq!(loaded.apps.len(), 1);
        assert_eq!(loaded.apps[0].name, "Game One");
        assert_eq!(loaded.apps[0].id, "123");
    }

    #[test]
    fn test_save_is_byte_stable_for_deduplicated_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("apps.json");
        let repo = FsAppsRepository::new(Some(path.clone()));

        let mut doc = AppsDocument::default();
        let mut entry = AppEntry::new("Game", "AAAAAAAA-BBBB-CCCC-DDDD-EEEEEEEEEEEE");
        entry.id = "7".to_string();
        doc.apps.push(entry);
        repo.save(&doc).unwrap();

        let first = std::fs::read(&path).unwrap();
        let reloaded = repo.load().unwrap();
        repo.save(&reloaded).unwrap();
        let second = std::fs::read(&path).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_load_deduplicates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("apps.json");
        std::fs::write(
            &path,
            r#"{
                "apps": [
                    {"name": "Old", "uuid": "AAAAAAAA-BBBB-CCCC-DDDD-EEEEEEEEEEEE", "id": "1"},
                    {"name": "New", "uuid": "aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee", "id": "2"}
                ],
                "env": {},
                "version": 2
            }"#,
        )
        .unwrap();

        let repo = FsAppsRepository::new(Some(path));
        let doc = repo.load().unwrap();
        assert_eq!(doc.apps.len(), 1);
        assert_eq!(doc.apps[0].name, "New");
    }

    #[test]
    fn test_load_parse_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("apps.json");
        std::fs::write(&path, "{ not json").unwrap();

        let repo = FsAppsRepository::new(Some(path));
        let err = repo.load().unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.is_load_failure());
    }

    #[cfg(unix)]
    #[test]
    fn test_save_permission_denied_is_distinct() {
        use std::os::unix::fs::{MetadataExt, PermissionsExt};

        let dir = tempfile::tempdir().unwrap();

        // File modes do not stop root; nothing to assert in that case.
        let probe = dir.path().join("probe");
        std::fs::write(&probe, "x").unwrap();
        if std::fs::metadata(&probe).unwrap().uid() == 0 {
            return;
        }

        let locked = dir.path().join("locked");
        std::fs::create_dir(&locked).unwrap();
        let path = locked.join("apps.json");
        std::fs::write(&path, "{}").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o444)).unwrap();

        let repo = FsAppsRepository::new(Some(path));
        let err = repo.save(&AppsDocument::default()).unwrap_err();
        assert!(matches!(err, ConfigError::PermissionDenied(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_save_retries_then_gives_up_on_persistent_io_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory at the target path fails every write attempt without
        // being a permission problem.
        let path = dir.path().join("apps.json");
        std::fs::create_dir(&path).unwrap();

        let repo = FsAppsRepository::new(Some(path));
        let err = repo.save(&AppsDocument::default()).unwrap_err();
        match err {
            ConfigError::WriteRetriesExhausted { attempts, .. } => {
                assert_eq!(attempts, SAVE_ATTEMPTS)
            }
            other => panic!("expected retry exhaustion, got {}", other),
        }
    }

    #[test]
    fn test_blank_path_falls_back_to_default() {
        let repo = FsAppsRepository::new(Some(PathBuf::new()));
        let resolved = repo.resolve(false);
        assert!(resolved.ends_with(PathBuf::from(HOST_DIRS[0]).join("config/apps.json")));
    }

    #[test]
    fn test_memory_repository_injected_save_failure() {
        let repo = MemoryRepository::new();
        repo.fail_next_save();
        assert!(repo.save(&AppsDocument::default()).is_err());
        // Only the next save fails.
        assert!(repo.save(&AppsDocument::default()).is_ok());
    }

    #[test]
    fn test_memory_repository_load_is_fresh() {
        let repo = MemoryRepository::new();
        let mut doc = AppsDocument::default();
        doc.apps
            .push(AppEntry::new("X", "AAAAAAAA-BBBB-CCCC-DDDD-EEEEEEEEEEEE"));
        repo.set_document(doc);

        assert_eq!(repo.load().unwrap().apps.len(), 1);
        repo.set_document(AppsDocument::default());
        assert!(repo.load().unwrap().apps.is_empty());
    }
}
