//! Identity mapping and settings persistence for Sunbridge
//!
//! Owns the durable mapping from library game identity to the stable
//! external UUID used in the streaming host's config file, plus the user
//! settings (pins, selected filter presets, sync triggers).

mod mapping;
mod settings;

pub use mapping::{IdentityStore, MappingStore};
pub use settings::SyncSettings;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to parse {}: {}", path.display(), source)]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
