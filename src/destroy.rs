//! Tears down the current context's cluster and cleans up its bookkeeping.

use anyhow::Result;
use std::fs;
use std::time::Duration;

use crate::confirm::{Answer, Confirmer};
use crate::engine::{ClusterEngine, Playbook, Vars};
use crate::error::StoreError;
use crate::fs_utils::remove_file_if_exists;
use crate::snapshot;
use crate::store::{DEFAULT_PROFILE, StoreHandle};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestroyOutcome {
    pub context: String,
    /// `Err` carries the engine failure; bookkeeping ran regardless
    pub teardown: Result<(), String>,
    pub purged: bool,
}

/// Destroy the current context's cluster
///
/// Nothing happens unless the operator confirms within `timeout`. After a
/// confirmed teardown the stored credentials are dropped, since they point
/// at a cluster that no longer exists. With `purge` the whole context is
/// removed and the store falls back to `default`.
pub fn destroy(
    store: &StoreHandle,
    engine: &dyn ClusterEngine,
    confirmer: &dyn Confirmer,
    timeout: Duration,
    purge: bool,
) -> Result<DestroyOutcome> {
    let context = store.require_current()?;
    let paths = &store.paths;

    let prompt = if purge {
        format!("Destroy cluster '{}' and delete its stored context?", context)
    } else {
        format!("Destroy cluster '{}'?", context)
    };
    match confirmer.confirm(&prompt, timeout)? {
        Answer::Yes => {}
        answer => {
            tracing::info!(context = %context, ?answer, "destroy not confirmed");
            return Err(StoreError::Aborted("destroy").into());
        }
    }

    let teardown = match engine.run(Playbook::Clean, &paths.inventory, &Vars::new()) {
        Ok(true) => Ok(()),
        Ok(false) => Err(format!("{} reported failure", Playbook::Clean.file_name())),
        Err(e) => Err(format!("{e:#}")),
    };
    if let Err(e) = &teardown {
        tracing::warn!(context = %context, error = %e, "teardown failed, continuing with cleanup");
    }

    let _lock = store.lock()?;
    remove_file_if_exists(&paths.profile_credentials(&context))?;

    if purge {
        if context == DEFAULT_PROFILE {
            // The template itself is never deleted, only emptied of cluster state
            remove_file_if_exists(&paths.profile_inventory(DEFAULT_PROFILE))?;
        } else {
            store.remove_profile(&context)?;
        }
        fs::create_dir_all(paths.profile_dir(DEFAULT_PROFILE))?;

        snapshot::clear_live(store)?;
        store.set_current(DEFAULT_PROFILE)?;
        snapshot::install(store, DEFAULT_PROFILE)?;
        tracing::info!(context = %context, "purged context, now on default");
    }

    Ok(DestroyOutcome {
        context,
        teardown,
        purged: purge,
    })
}
