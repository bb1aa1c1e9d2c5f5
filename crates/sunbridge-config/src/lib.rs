//! Streaming-host `apps.json` repository for Sunbridge
//!
//! Loads, deduplicates, and persists the launcher configuration document
//! owned by an Apollo/Sunshine-style streaming host. The file may be edited
//! by the host (or by hand) between operations, so it is always re-read from
//! disk at the start of an operation and never cached.

mod document;
mod repository;

pub use document::{AppEntry, AppsDocument, canonical_uuid, dedup_apps};
pub use repository::{AppsRepository, FsAppsRepository, MemoryRepository};

use std::path::PathBuf;
use thiserror::Error;

/// Document version written into newly created files.
pub const DEFAULT_VERSION: i64 = 2;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse {}: {}", path.display(), source)]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Permission denied writing {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("Failed to write {} after {} attempts: {}", path.display(), attempts, source)]
    WriteRetriesExhausted {
        path: PathBuf,
        attempts: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialize error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// Whether this error came out of the load path (unreadable or
    /// unparseable file). Callers treat these as "cannot sync this pass"
    /// rather than fatal.
    pub fn is_load_failure(&self) -> bool {
        matches!(self, ConfigError::Parse { .. } | ConfigError::Io(_))
    }
}
