//! Context switching logic.
//!
//! This module implements the core mechanism of `clusterctx`: `checkout`.
//! It handles:
//! - Persisting the outgoing context's live state into the store.
//! - Creating the incoming context from `default` on first use.
//! - Clearing and re-projecting the live workspace.
//! - Restoring the outgoing context if the projection fails.
//! - Swapping the pointer last, atomically.

use anyhow::{Context, Result};

use crate::snapshot::{self, SaveOutcome};
use crate::store::{ProfileLookup, StoreHandle, validate_profile_name};

/// What a checkout did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    AlreadyCurrent,
    Switched {
        from: String,
        to: String,
        /// The target was created from `default` by this checkout
        created: bool,
        /// Saving the outgoing context failed; its snapshot may be stale
        save_warning: Option<String>,
    },
}

/// Switch the live workspace to `target`
pub fn checkout(store: &StoreHandle, target: &str) -> Result<CheckoutOutcome> {
    validate_profile_name(target)?;
    store.ensure_initialized()?;

    if store.current()?.as_deref() == Some(target) {
        return Ok(CheckoutOutcome::AlreadyCurrent);
    }

    let _lock = store.lock()?;
    // Re-read under the lock: another invocation may have switched meanwhile
    let from = store.require_current()?;
    if from == target {
        return Ok(CheckoutOutcome::AlreadyCurrent);
    }

    // 1. Persist the outgoing context
    let save_warning = match snapshot::save(store, &from) {
        Ok(SaveOutcome::Saved(_)) => None,
        Ok(SaveOutcome::SkippedNoPointer) => Some("no pointer file, nothing saved".to_string()),
        Err(e) => {
            tracing::warn!(context = %from, error = %format!("{e:#}"), "failed to save outgoing context");
            Some(format!("{e:#}"))
        }
    };

    // 2. Make sure the target exists before the live workspace is touched
    let created = match store.resolve_profile(target) {
        ProfileLookup::Existing(_) => false,
        ProfileLookup::NotFound => {
            store.create_from_default(target)?;
            true
        }
    };

    // 3. Replace the live workspace
    snapshot::clear_live(store)?;
    if let Err(e) = snapshot::install(store, target) {
        restore(store, &from, target, created);
        return Err(e).with_context(|| {
            format!("Failed to install context '{}', restored '{}'", target, from)
        });
    }

    // 4. Swap the pointer
    store.set_current(target)?;
    tracing::info!(from = %from, to = target, created, "switched context");

    Ok(CheckoutOutcome::Switched {
        from,
        to: target.to_string(),
        created,
        save_warning,
    })
}

/// Best-effort rollback after a failed install
fn restore(store: &StoreHandle, from: &str, target: &str, created: bool) {
    if let Err(e) = snapshot::clear_live(store).and_then(|_| snapshot::install(store, from)) {
        tracing::error!(context = from, error = %format!("{e:#}"), "failed to restore live workspace");
    }
    if created {
        if let Err(e) = store.remove_profile(target) {
            tracing::warn!(context = target, error = %format!("{e:#}"), "failed to remove half-created context");
        }
    }
}
