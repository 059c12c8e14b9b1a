//! Snapshot I/O between the live workspace and a stored profile.
//!
//! `save` copies live -> store and `install` copies store -> live. Both are
//! directional whole-file overwrites: inventory, credentials, and every
//! discovered component's `defaults/` directory. Neither takes the store
//! lock; callers hold it.

use anyhow::Result;
use std::path::Path;

use crate::error::StoreError;
use crate::fs_utils::{copy_dir_recursive, copy_file, remove_file_if_exists, subdir_names};
use crate::paths::DEFAULTS_DIR;
use crate::store::{ProfileLookup, StoreHandle};

/// What a `save` actually did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// No pointer file exists, nothing was copied
    SkippedNoPointer,
    Saved(Transfer),
}

/// Files moved by one snapshot operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transfer {
    pub components: Vec<String>,
    pub inventory: bool,
    pub credentials: bool,
}

/// Components under `root`: every subdirectory that owns a `defaults/` dir
pub fn discover_components(root: &Path) -> Result<Vec<String>> {
    Ok(subdir_names(root)?
        .into_iter()
        .filter(|name| root.join(name).join(DEFAULTS_DIR).is_dir())
        .collect())
}

/// Capture the live workspace into `profile`'s snapshot
pub fn save(store: &StoreHandle, profile: &str) -> Result<SaveOutcome> {
    let paths = &store.paths;
    if !paths.pointer_file.exists() {
        tracing::warn!(context = profile, "no current context pointer, skipping save");
        return Ok(SaveOutcome::SkippedNoPointer);
    }

    let mut transfer = Transfer::default();
    let live_root = paths.live_components();
    let stored_root = paths.profile_components(profile);

    for component in discover_components(&live_root)? {
        copy_dir_recursive(
            &live_root.join(&component).join(DEFAULTS_DIR),
            &stored_root.join(&component).join(DEFAULTS_DIR),
            store.prune_stale,
        )?;
        transfer.components.push(component);
    }

    if paths.inventory.is_file() {
        copy_file(&paths.inventory, &paths.profile_inventory(profile))?;
        transfer.inventory = true;
    }

    if paths.credentials.is_file() {
        copy_file(&paths.credentials, &paths.profile_credentials(profile))?;
        transfer.credentials = true;
    }

    tracing::debug!(context = profile, ?transfer, "saved live workspace");
    Ok(SaveOutcome::Saved(transfer))
}

/// Project `profile`'s snapshot onto the live workspace
pub fn install(store: &StoreHandle, profile: &str) -> Result<Transfer> {
    if let ProfileLookup::NotFound = store.resolve_profile(profile) {
        return Err(StoreError::ProfileNotFound(profile.to_string()).into());
    }

    let paths = &store.paths;
    let mut transfer = Transfer::default();
    let live_root = paths.live_components();
    let stored_root = paths.profile_components(profile);

    for component in discover_components(&stored_root)? {
        copy_dir_recursive(
            &stored_root.join(&component).join(DEFAULTS_DIR),
            &live_root.join(&component).join(DEFAULTS_DIR),
            store.prune_stale,
        )?;
        transfer.components.push(component);
    }

    let inventory = paths.profile_inventory(profile);
    if inventory.is_file() {
        copy_file(&inventory, &paths.inventory)?;
        transfer.inventory = true;
    }

    let credentials = paths.profile_credentials(profile);
    if credentials.is_file() {
        copy_file(&credentials, &paths.credentials)?;
        transfer.credentials = true;
    }

    tracing::debug!(context = profile, ?transfer, "installed snapshot");
    Ok(transfer)
}

/// Delete the live inventory and credentials files
///
/// Component defaults stay; the next install overwrites them.
pub fn clear_live(store: &StoreHandle) -> Result<()> {
    remove_file_if_exists(&store.paths.inventory)?;
    remove_file_if_exists(&store.paths.credentials)?;
    Ok(())
}
