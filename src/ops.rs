//! In-cluster operations.
//!
//! Each operation drives the engine against the live inventory and, once
//! the cluster has changed, saves the live workspace back into the current
//! context so the store never lags behind the cluster.

use anyhow::{Context, Result, bail};
use std::fs;
use std::time::Duration;

use crate::confirm::Confirmer;
use crate::engine::{ClusterEngine, Playbook, Vars};
use crate::error::StoreError;
use crate::fs_utils::write_atomic;
use crate::inventory::{HostRole, Inventory, parse_host};
use crate::snapshot::{self, SaveOutcome};
use crate::store::StoreHandle;

/// Result of the automatic post-operation save
///
/// A failed save is reported, never fatal: the cluster change already
/// happened.
pub type PostSave = Result<SaveOutcome, String>;

/// Save the live workspace into the current context under the store lock
pub fn save_current(store: &StoreHandle) -> Result<SaveOutcome> {
    let Some(current) = store.current()? else {
        tracing::warn!("no current context, skipping save");
        return Ok(SaveOutcome::SkippedNoPointer);
    };
    let _lock = store.lock()?;
    snapshot::save(store, &current)
}

fn post_save(store: &StoreHandle) -> PostSave {
    save_current(store).map_err(|e| {
        tracing::warn!(error = %format!("{e:#}"), "post-operation save failed");
        format!("{e:#}")
    })
}

fn require_inventory(store: &StoreHandle) -> Result<()> {
    if !store.paths.inventory.is_file() {
        return Err(StoreError::MissingInventory(store.paths.inventory.display().to_string()).into());
    }
    Ok(())
}

fn run_confirmed(
    store: &StoreHandle,
    engine: &dyn ClusterEngine,
    confirmer: &dyn Confirmer,
    timeout: Duration,
    playbook: Playbook,
    action: &'static str,
) -> Result<PostSave> {
    require_inventory(store)?;

    let context = store.current()?.unwrap_or_else(|| "(none)".to_string());
    let prompt = format!("Run {} on context '{}'?", action, context);
    if !confirmer.confirm(&prompt, timeout)?.is_yes() {
        return Err(StoreError::Aborted(action).into());
    }

    if !engine.run(playbook, &store.paths.inventory, &Vars::new())? {
        bail!("{} failed ({})", action, playbook.file_name());
    }

    Ok(post_save(store))
}

/// Provision the cluster described by the live inventory
pub fn setup(
    store: &StoreHandle,
    engine: &dyn ClusterEngine,
    confirmer: &dyn Confirmer,
    timeout: Duration,
) -> Result<PostSave> {
    run_confirmed(store, engine, confirmer, timeout, Playbook::Setup, "setup")
}

/// Upgrade the live cluster in place
pub fn upgrade(
    store: &StoreHandle,
    engine: &dyn ClusterEngine,
    confirmer: &dyn Confirmer,
    timeout: Duration,
) -> Result<PostSave> {
    run_confirmed(store, engine, confirmer, timeout, Playbook::Upgrade, "upgrade")
}

/// Add a host to the cluster
///
/// The inventory line is inserted before the playbook runs and taken back
/// out if the run fails.
pub fn add_host(
    store: &StoreHandle,
    engine: &dyn ClusterEngine,
    role: HostRole,
    addr: &str,
) -> Result<PostSave> {
    let host = parse_host(addr)?;
    require_inventory(store)?;
    let path = &store.paths.inventory;

    let original = fs::read_to_string(path)
        .with_context(|| format!("Failed to read inventory: {:?}", path))?;
    let mut inventory = Inventory::parse(&original);
    let host_str = host.to_string();
    if inventory.contains_host(role.group(), &host_str) {
        bail!("{} is already in the [{}] group", host, role.group());
    }

    inventory.insert_host(role.group(), role.new_host_line(&host))?;
    write_atomic(path, &inventory.render())?;

    let mut vars = Vars::new();
    vars.insert(role.add_var().to_string(), host_str);
    let ran = engine.run(role.add_playbook(), path, &vars);

    if !matches!(ran, Ok(true)) {
        write_atomic(path, &original)?;
        tracing::info!(%host, role = %role, "rolled back inventory after failed add");
        return match ran {
            Err(e) => Err(e).with_context(|| format!("Failed to add {} {}", role, host)),
            _ => bail!("Failed to add {} {} ({})", role, host, role.add_playbook().file_name()),
        };
    }

    Ok(post_save(store))
}

/// Remove a host from the cluster, then from the inventory
pub fn del_host(
    store: &StoreHandle,
    engine: &dyn ClusterEngine,
    role: HostRole,
    addr: &str,
) -> Result<PostSave> {
    let host = parse_host(addr)?;
    require_inventory(store)?;
    let path = &store.paths.inventory;

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read inventory: {:?}", path))?;
    let mut inventory = Inventory::parse(&content);
    let host_str = host.to_string();
    if !inventory.contains_host(role.group(), &host_str) {
        bail!("{} is not in the [{}] group", host, role.group());
    }

    let mut vars = Vars::new();
    vars.insert(role.del_var().to_string(), host_str.clone());
    if !engine.run(role.del_playbook(), path, &vars)? {
        bail!("Failed to remove {} {} ({})", role, host, role.del_playbook().file_name());
    }

    inventory.remove_host(role.group(), &host_str);
    write_atomic(path, &inventory.render())?;

    Ok(post_save(store))
}
