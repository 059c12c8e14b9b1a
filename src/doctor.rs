//! Diagnostic tool for clusterctx.
//!
//! This module implements the `clusterctx doctor` command, which checks the
//! store and workspace for common issues:
//! - Existence of the base and store directories.
//! - A pointer that names an existing context.
//! - Stored contexts and what each snapshot holds.
//! - The live inventory, credentials and component defaults.
//! - Engine executables on `PATH`.
//!
//! It reports issues to the user with a pass/fail/warn status.

use anstyle::AnsiColor;
use std::env;
use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::lock::StoreLock;
use crate::snapshot::discover_components;
use crate::store::{DEFAULT_PROFILE, StoreHandle};
use crate::ui::Ui;

/// Run the doctor diagnostics, returning whether every check passed
pub fn run_doctor(store: &StoreHandle, settings: &Settings, ui: &Ui) -> bool {
    let paths = &store.paths;
    let mut healthy = true;

    ui.section("clusterctx Doctor");
    ui.newline();

    // 1. Check directories
    healthy &= check_step(ui, "Directories", || {
        if !paths.base_dir.is_dir() {
            ui.println(format!(
                "  {} Base directory missing: {}",
                ui.icon_err(),
                paths.base_dir.display()
            ));
            return false;
        }
        ui.println(format!(
            "  {} Base directory exists: {}",
            ui.icon_ok(),
            paths.base_dir.display()
        ));

        if paths.store_dir.is_dir() {
            ui.println(format!(
                "  {} Context store exists: {}",
                ui.icon_ok(),
                paths.store_dir.display()
            ));
            match StoreLock::try_acquire(&paths.lock_file) {
                Ok(Some(_)) => {}
                Ok(None) => ui.println(format!(
                    "  {} Store is locked by another clusterctx invocation",
                    ui.icon_warn()
                )),
                Err(e) => {
                    ui.println(format!("  {} Cannot open lock file: {:#}", ui.icon_err(), e));
                    return false;
                }
            }
        } else {
            // Created on the first checkout
            ui.println(format!(
                "  {} Context store not initialized yet: {}",
                ui.icon_warn(),
                paths.store_dir.display()
            ));
        }
        true
    });

    // 2. Check pointer
    healthy &= check_step(ui, "Current Context", || match store.current() {
        Ok(Some(name)) => {
            ui.println(format!("  {} Pointer names context: {}", ui.icon_ok(), name));
            if store.exists(&name) {
                ui.println(format!("  {} Context directory exists", ui.icon_ok()));
                true
            } else {
                ui.println(format!("  {} Context directory MISSING", ui.icon_err()));
                false
            }
        }
        Ok(None) => {
            if paths.store_dir.exists() {
                ui.println(format!("  {} Store exists but pointer is missing", ui.icon_err()));
                false
            } else {
                ui.println(format!("  {} No current context (fresh install?)", ui.icon_warn()));
                true
            }
        }
        Err(e) => {
            ui.println(format!("  {} Pointer unreadable: {:#}", ui.icon_err(), e));
            false
        }
    });

    // 3. Check stored contexts
    healthy &= check_step(ui, "Contexts", || {
        let names = match store.list_names() {
            Ok(names) => names,
            Err(e) => {
                ui.println(format!("  {} Failed to list contexts: {:#}", ui.icon_err(), e));
                return false;
            }
        };

        if !names.iter().any(|n| n == DEFAULT_PROFILE) && paths.store_dir.exists() {
            ui.println(format!("  {} Template context '{}' is missing", ui.icon_err(), DEFAULT_PROFILE));
            return false;
        }

        for name in names {
            let mut held = Vec::new();
            if paths.profile_inventory(&name).is_file() {
                held.push("inventory");
            }
            if paths.profile_credentials(&name).is_file() {
                held.push("credentials");
            }
            let components = discover_components(&paths.profile_components(&name))
                .map(|c| c.len())
                .unwrap_or(0);
            let summary = if held.is_empty() {
                format!("{} components", components)
            } else {
                format!("{}, {} components", held.join(", "), components)
            };
            ui.println(format!("    {} {} ({})", ui.icon_info(), name, summary));
        }
        true
    });

    // 4. Live workspace
    healthy &= check_step(ui, "Live Workspace", || {
        if paths.inventory.is_file() {
            ui.println(format!("  {} Inventory: {}", ui.icon_ok(), paths.inventory.display()));
        } else {
            ui.println(format!("  {} No inventory at {}", ui.icon_warn(), paths.inventory.display()));
        }
        if paths.credentials.is_file() {
            ui.println(format!("  {} Credentials: {}", ui.icon_ok(), paths.credentials.display()));
        } else {
            ui.println(format!(
                "  {} No credentials at {} (cluster not set up?)",
                ui.icon_warn(),
                paths.credentials.display()
            ));
        }
        match discover_components(&paths.live_components()) {
            Ok(components) => {
                ui.println(format!(
                    "  {} {} components with defaults",
                    ui.icon_info(),
                    components.len()
                ));
                true
            }
            Err(e) => {
                ui.println(format!("  {} Failed to read components: {:#}", ui.icon_err(), e));
                false
            }
        }
    });

    // 5. Environment
    healthy &= check_step(ui, "Environment", || {
        for bin in [&settings.playbook_bin, &settings.kubectl_bin] {
            match find_executable(bin) {
                Some(path) => ui.println(format!("  {} {} found: {}", ui.icon_ok(), bin, path.display())),
                None => ui.println(format!("  {} {} not found on PATH", ui.icon_warn(), bin)),
            }
        }
        true
    });

    healthy
}

fn check_step<F>(ui: &Ui, name: &str, check_fn: F) -> bool
where
    F: FnOnce() -> bool,
{
    ui.println(ui.bold(format!("Checking {}...", name)));
    let success = check_fn();
    if !success {
        ui.println(ui.colored("  Issues detected!", AnsiColor::Red));
    }
    ui.newline();
    success
}

/// Locate an executable by absolute path or through `PATH`
fn find_executable(bin: &str) -> Option<PathBuf> {
    let candidate = Path::new(bin);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }
    env::var_os("PATH").and_then(|path| {
        env::split_paths(&path)
            .map(|dir| dir.join(bin))
            .find(|p| p.is_file())
    })
}
