//! Low-level add/update/remove primitives

use crate::{EntryBuilder, SyncError};
use rand::RngCore;
use std::collections::HashSet;
use sunbridge_config::{AppsDocument, canonical_uuid};
use sunbridge_library::{Game, GameId};
use sunbridge_store::IdentityStore;

/// Bound on the generate-and-check numeric id loop. Collisions are
/// vanishingly rare in practice; the bound exists so a pathological
/// document cannot spin forever.
const ID_ATTEMPTS: u32 = 64;

/// Add the game to the document, or refresh its existing entry.
///
/// Updates touch only `name`, `detached`, and `image-path` (the latter only
/// when a new image resolved); `id`, `uuid`, and host-owned extra keys are
/// preserved. A fresh entry gets a random numeric id unused in the document.
pub(crate) fn add_or_update<S: IdentityStore>(
    document: &mut AppsDocument,
    store: &mut S,
    builder: &EntryBuilder,
    game: &Game,
) -> Result<(), SyncError> {
    let uuid = store.assign(&game.id);
    let mut entry = builder.build(game, &uuid);

    if let Some(existing) = document.find_entry_mut(&entry.uuid) {
        tracing::debug!("Updating existing entry for {}", game.name);
        existing.name = std::mem::take(&mut entry.name);
        existing.detached = std::mem::take(&mut entry.detached);
        if entry.image_path.is_some() {
            existing.image_path = entry.image_path.take();
        }
    } else {
        tracing::debug!("Adding new entry for {}", game.name);
        entry.id = generate_numeric_id(document)?;
        document.apps.push(entry);
    }

    Ok(())
}

/// Remove the game's entry (if any) and its identity mapping. Returns false
/// when the game is not managed at all.
pub(crate) fn remove<S: IdentityStore>(
    document: &mut AppsDocument,
    store: &mut S,
    game: &GameId,
) -> bool {
    let Some(uuid) = store.get(game) else {
        return false;
    };

    document.remove_entries(&canonical_uuid(&uuid));
    store.remove(game);
    true
}

fn generate_numeric_id(document: &AppsDocument) -> Result<String, SyncError> {
    let used: HashSet<&str> = document
        .apps
        .iter()
        .map(|a| a.id.as_str())
        .filter(|s| !s.is_empty())
        .collect();

    let mut rng = rand::thread_rng();
    for _ in 0..ID_ATTEMPTS {
        let candidate = rng.next_u32().to_string();
        if !used.contains(candidate.as_str()) {
            return Ok(candidate);
        }
    }

    Err(SyncError::IdSpaceExhausted(ID_ATTEMPTS))
}
