//! The `apps.json` document model

use crate::DEFAULT_VERSION;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// One launchable app as the streaming host sees it.
///
/// Only `name`, `detached`, and `image-path` are ever rewritten on update;
/// `uuid` and `id` are stable once assigned, and any keys this tool does not
/// know about are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppEntry {
    pub name: String,

    /// Canonical uppercase hyphenated UUID text. Unique (case-insensitively)
    /// within a deduplicated document.
    #[serde(default)]
    pub uuid: String,

    /// Externally visible numeric id, kept as decimal text. Stable once
    /// assigned; unique within the document.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    /// Detached launch commands. Sunbridge writes exactly one.
    #[serde(default)]
    pub detached: Vec<String>,

    #[serde(rename = "image-path", default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,

    /// Host-owned keys we do not interpret.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl AppEntry {
    pub fn new(name: impl Into<String>, uuid: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uuid: uuid.into(),
            id: String::new(),
            detached: Vec::new(),
            image_path: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Parse the numeric id, treating missing or unparseable text as absent.
    pub fn numeric_id(&self) -> Option<i64> {
        self.id.parse().ok()
    }
}

/// The whole configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppsDocument {
    #[serde(default)]
    pub apps: Vec<AppEntry>,

    /// Host environment block, passed through untouched.
    #[serde(default)]
    pub env: serde_json::Map<String, serde_json::Value>,

    #[serde(default = "default_version")]
    pub version: i64,

    /// Unknown top-level keys, carried through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_version() -> i64 {
    DEFAULT_VERSION
}

impl Default for AppsDocument {
    fn default() -> Self {
        Self {
            apps: Vec::new(),
            env: serde_json::Map::new(),
            version: DEFAULT_VERSION,
            extra: serde_json::Map::new(),
        }
    }
}

impl AppsDocument {
    /// Find the entry with the given uuid text, case-insensitively.
    pub fn find_entry(&self, uuid: &str) -> Option<&AppEntry> {
        self.apps.iter().find(|a| a.uuid.eq_ignore_ascii_case(uuid))
    }

    pub fn find_entry_mut(&mut self, uuid: &str) -> Option<&mut AppEntry> {
        self.apps
            .iter_mut()
            .find(|a| a.uuid.eq_ignore_ascii_case(uuid))
    }

    pub fn contains_uuid(&self, uuid: &str) -> bool {
        self.find_entry(uuid).is_some()
    }

    /// Remove every entry carrying the given uuid text (case-insensitive).
    /// Returns how many entries were removed.
    pub fn remove_entries(&mut self, uuid: &str) -> usize {
        let before = self.apps.len();
        self.apps.retain(|a| !a.uuid.eq_ignore_ascii_case(uuid));
        before - self.apps.len()
    }

    /// Every entry uuid that parses as a UUID.
    pub fn uuid_set(&self) -> HashSet<Uuid> {
        self.apps
            .iter()
            .filter_map(|a| Uuid::parse_str(&a.uuid).ok())
            .collect()
    }

    /// Deduplicate `apps` in place. See [`dedup_apps`].
    pub fn dedup(&mut self) {
        let apps = std::mem::take(&mut self.apps);
        self.apps = dedup_apps(apps);
    }
}

/// Canonical external text form of a UUID: uppercase, hyphenated.
pub fn canonical_uuid(uuid: &Uuid) -> String {
    uuid.to_string().to_uppercase()
}

/// Collapse duplicate entries sharing a uuid (case-insensitive).
///
/// For each duplicate group the entry whose numeric id parses to the largest
/// integer wins; entries with a missing or unparseable id rank lowest, and
/// the earliest entry wins ties. Entries without any uuid are dropped
/// outright. First-seen order of distinct uuids is preserved. Duplicates
/// appear when two host instances both append before a sync, or when an
/// interrupted pass of this tool raced its own earlier write.
pub fn dedup_apps(apps: Vec<AppEntry>) -> Vec<AppEntry> {
    let total = apps.len();
    let mut order: Vec<String> = Vec::new();
    let mut kept: HashMap<String, AppEntry> = HashMap::new();

    for entry in apps {
        if entry.uuid.is_empty() {
            tracing::warn!("Dropping app entry without uuid: {}", entry.name);
            continue;
        }

        let key = entry.uuid.to_lowercase();
        match kept.entry(key) {
            Entry::Vacant(slot) => {
                order.push(slot.key().clone());
                slot.insert(entry);
            }
            Entry::Occupied(mut slot) => {
                if entry.numeric_id() > slot.get().numeric_id() {
                    slot.insert(entry);
                }
            }
        }
    }

    let result: Vec<AppEntry> = order.into_iter().filter_map(|k| kept.remove(&k)).collect();

    if result.len() < total {
        tracing::warn!(
            "Deduplicated apps list: {} entries in, {} kept",
            total,
            result.len()
        );
    }

    result
}
