//! Reconciliation engine for Sunbridge
//!
//! Decides, given a library snapshot and the streaming host's current
//! apps.json, which entries to add, update, or remove, and persists the
//! result durably and idempotently. User customizations (pins, manual
//! removals in the host's own UI) always win over filter-driven changes.

mod builder;
mod engine;
mod progress;
mod sync;
mod worker;

pub use builder::EntryBuilder;
pub use engine::SyncEngine;
pub use progress::{CancelToken, NullProgress, ProgressSink, SyncReport};
pub use worker::{SyncCommand, SyncHandle, SyncWorker};

use sunbridge_config::ConfigError;
use sunbridge_library::GameId;
use sunbridge_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("No filter presets configured")]
    NoPresetsConfigured,

    #[error("Game not found in library: {0}")]
    GameNotFound(GameId),

    #[error("Could not find an unused numeric id after {0} attempts")]
    IdSpaceExhausted(u32),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SyncError::GameNotFound(GameId::new("g1"));
        assert!(err.to_string().contains("g1"));

        let err = SyncError::NoPresetsConfigured;
        assert!(err.to_string().contains("presets"));
    }
}
