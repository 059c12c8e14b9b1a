//! High-level command orchestration for the CLI.
//!
//! Each handler here corresponds to a subcommand in `main.rs`: it calls the
//! library operation (`switch`, `snapshot`, `lister`, `destroy`, `ops`) and
//! renders the outcome through `crate::ui`.

use anstyle::AnsiColor;
use anyhow::{Context, Result, bail};
use inquire::Select;
use std::time::Duration;

use crate::confirm::Confirmer;
use crate::config::Settings;
use crate::destroy::destroy as destroy_context;
use crate::doctor::run_doctor;
use crate::engine::ClusterEngine;
use crate::fs_utils::modified_at;
use crate::inventory::HostRole;
use crate::lister;
use crate::ops::{self, PostSave};
use crate::snapshot::SaveOutcome;
use crate::store::StoreHandle;
use crate::switch::{CheckoutOutcome, checkout as checkout_context};
use crate::ui::Ui;

/// Everything a command needs besides the UI
pub struct Session<'a> {
    pub store: StoreHandle,
    pub settings: Settings,
    pub engine: &'a dyn ClusterEngine,
    pub confirmer: &'a dyn Confirmer,
}

impl Session<'_> {
    fn confirm_timeout(&self) -> Duration {
        self.settings.confirm_timeout()
    }
}

/// Switch to a context, prompting for one when no name is given
pub fn checkout(session: &Session, name: Option<String>, ui: &Ui) -> Result<()> {
    let store = &session.store;
    let target = match name {
        Some(name) => name,
        None => select_context(store)?,
    };

    let spinner = ui.spinner(format!("Switching to context '{}'...", target));
    match checkout_context(store, &target) {
        Ok(CheckoutOutcome::AlreadyCurrent) => {
            ui.spinner_finish_ok(&spinner, format!("Already on context '{}'", target));
        }
        Ok(CheckoutOutcome::Switched {
            from,
            to,
            created,
            save_warning,
        }) => {
            ui.spinner_finish_ok(&spinner, format!("Switched from '{}' to '{}'", from, to));
            if let Some(warning) = save_warning {
                ui.warn(format!(
                    "Could not save '{}' before switching, its stored snapshot may be stale: {}",
                    from, warning
                ));
            }
            if created {
                ui.info(format!("Created new context '{}' from default settings", to));
                ui.println(format!(
                    "  Write an inventory to {} before running {}",
                    store.paths.inventory.display(),
                    ui.bold("clusterctx setup")
                ));
            }
        }
        Err(e) => {
            ui.spinner_finish_err(&spinner, format!("Failed to switch to '{}'", target));
            return Err(e);
        }
    }

    Ok(())
}

fn select_context(store: &StoreHandle) -> Result<String> {
    let names = store.list_names()?;
    if names.is_empty() {
        bail!("No contexts found.\nHint: Use 'clusterctx checkout <name>' to create one.");
    }

    let current = store.current()?;
    let cursor = current
        .as_deref()
        .and_then(|c| names.iter().position(|n| n == c))
        .unwrap_or(0);

    Select::new("Switch to which context?", names)
        .with_starting_cursor(cursor)
        .prompt()
        .context("Context selection cancelled")
}

/// List stored contexts and the nodes of every reachable cluster
pub fn list(session: &Session, ui: &Ui) -> Result<()> {
    let report = lister::list(&session.store, session.engine)?;

    if report.contexts.is_empty() {
        ui.warn("No contexts found.");
        ui.println("Create one with:");
        ui.println(format!("  {} checkout <name>", ui.bold("clusterctx")));
        return Ok(());
    }

    let mut table = ui.table();
    table.set_header(vec![
        ui.header_cell(""),
        ui.header_cell("Context"),
        ui.header_cell("Inventory"),
        ui.header_cell("Credentials"),
        ui.header_cell("Last saved"),
    ]);

    for entry in &report.contexts {
        let icon = if entry.is_current { ui.icon_ok() } else { " " };
        let name_cell = if entry.is_current {
            ui.colored_cell(&entry.name, AnsiColor::Green)
        } else {
            ui.cell(&entry.name)
        };
        let saved = entry
            .saved_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());

        table.add_row(vec![
            ui.cell(icon),
            name_cell,
            ui.flag_cell(entry.has_inventory),
            ui.flag_cell(entry.has_credentials),
            ui.cell(saved),
        ]);
    }

    ui.section("Managed contexts");
    ui.println(table.to_string());

    for listing in &report.nodes {
        ui.newline();
        ui.section(format!("Nodes in '{}'", listing.context));
        match &listing.result {
            Ok(output) => ui.block(output),
            Err(e) => ui.println(format!(
                "  {} {}",
                ui.icon_err(),
                ui.colored(e, AnsiColor::Red)
            )),
        }
    }

    Ok(())
}

/// Show the current context and the state of the live workspace
pub fn current(session: &Session, ui: &Ui) -> Result<()> {
    let store = &session.store;
    let paths = &store.paths;

    ui.section("Current Context");
    ui.newline();

    let mut table = ui.simple_table();
    match store.current()? {
        Some(name) => {
            table.add_row(vec![ui.cell("Context:"), ui.header_cell(name)]);
            if let Some(switched) = modified_at(&paths.pointer_file) {
                table.add_row(vec![
                    ui.cell("Last switched:"),
                    ui.cell(switched.format("%Y-%m-%d %H:%M:%S").to_string()),
                ]);
            }
        }
        None => {
            table.add_row(vec![ui.cell("Context:"), ui.cell("(none)")]);
        }
    }

    let presence = |path: &std::path::Path| {
        if path.is_file() {
            ui.cell(path.display().to_string())
        } else {
            ui.colored_cell(format!("missing ({})", path.display()), AnsiColor::Yellow)
        }
    };
    table.add_row(vec![ui.cell("Inventory:"), presence(paths.inventory.as_path())]);
    table.add_row(vec![ui.cell("Credentials:"), presence(paths.credentials.as_path())]);

    ui.println(table.to_string());
    Ok(())
}

/// Save the live workspace into the current context
pub fn save(session: &Session, ui: &Ui) -> Result<()> {
    match ops::save_current(&session.store)? {
        SaveOutcome::SkippedNoPointer => {
            ui.warn("No current context, nothing saved.");
        }
        SaveOutcome::Saved(transfer) => {
            let context = session.store.require_current()?;
            ui.ok(format!(
                "Saved live workspace into '{}' ({} components{}{})",
                context,
                transfer.components.len(),
                if transfer.inventory { ", inventory" } else { "" },
                if transfer.credentials { ", credentials" } else { "" },
            ));
        }
    }
    Ok(())
}

/// Tear down the current cluster, optionally purging its context
pub fn destroy(session: &Session, purge: bool, ui: &Ui) -> Result<()> {
    let outcome = destroy_context(
        &session.store,
        session.engine,
        session.confirmer,
        session.confirm_timeout(),
        purge,
    )?;

    if outcome.purged {
        ui.ok(format!(
            "Removed context '{}', now on '{}'",
            outcome.context,
            crate::store::DEFAULT_PROFILE
        ));
    } else {
        ui.ok(format!("Dropped stored credentials of '{}'", outcome.context));
    }

    if let Err(e) = outcome.teardown {
        bail!("Teardown of '{}' failed: {}", outcome.context, e);
    }
    ui.ok(format!("Cluster '{}' destroyed", outcome.context));
    Ok(())
}

pub fn setup(session: &Session, ui: &Ui) -> Result<()> {
    let saved = ops::setup(
        &session.store,
        session.engine,
        session.confirmer,
        session.confirm_timeout(),
    )?;
    ui.ok("Cluster setup complete");
    report_post_save(&saved, ui);
    Ok(())
}

pub fn upgrade(session: &Session, ui: &Ui) -> Result<()> {
    let saved = ops::upgrade(
        &session.store,
        session.engine,
        session.confirmer,
        session.confirm_timeout(),
    )?;
    ui.ok("Cluster upgrade complete");
    report_post_save(&saved, ui);
    Ok(())
}

pub fn add_host(session: &Session, role: HostRole, addr: &str, ui: &Ui) -> Result<()> {
    let saved = ops::add_host(&session.store, session.engine, role, addr)?;
    ui.ok(format!("Added {} {}", role, addr));
    report_post_save(&saved, ui);
    Ok(())
}

pub fn del_host(session: &Session, role: HostRole, addr: &str, ui: &Ui) -> Result<()> {
    let saved = ops::del_host(&session.store, session.engine, role, addr)?;
    ui.ok(format!("Removed {} {}", role, addr));
    report_post_save(&saved, ui);
    Ok(())
}

pub fn doctor(session: &Session, ui: &Ui) -> Result<()> {
    if !run_doctor(&session.store, &session.settings, ui) {
        bail!("Doctor found issues");
    }
    Ok(())
}

fn report_post_save(saved: &PostSave, ui: &Ui) {
    match saved {
        Ok(SaveOutcome::Saved(_)) => {}
        Ok(SaveOutcome::SkippedNoPointer) => {
            ui.warn("No current context, live workspace was not saved");
        }
        Err(e) => ui.warn(format!(
            "Cluster changed but saving the context failed: {}\nHint: run 'clusterctx save' once fixed.",
            e
        )),
    }
}
