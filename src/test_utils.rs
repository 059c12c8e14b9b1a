//! Test utilities shared across test modules
//!
//! This module provides common helper functions for testing, avoiding duplication
//! across multiple test suites.

use anyhow::{Result, bail};
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

use crate::confirm::{Answer, Confirmer};
use crate::engine::{ClusterEngine, Playbook, Vars};
use crate::paths::{DEFAULTS_DIR, LOCK_FILE, POINTER_FILE, Paths};
use crate::store::StoreHandle;

/// Create a Paths struct for testing using a temporary directory
///
/// Mimics the real layout: the base directory at `<tmp>/ansible` and the
/// credentials file outside it at `<tmp>/kube/config`.
pub fn setup_test_paths(temp_dir: &TempDir) -> Paths {
    let base_dir = temp_dir.path().join("ansible");
    let store_dir = base_dir.join(".cluster");
    Paths {
        pointer_file: store_dir.join(POINTER_FILE),
        lock_file: store_dir.join(LOCK_FILE),
        inventory: base_dir.join("hosts"),
        component_root: PathBuf::from("roles"),
        credentials: temp_dir.path().join("kube/config"),
        store_dir,
        base_dir,
    }
}

pub fn setup_test_store(temp_dir: &TempDir) -> StoreHandle {
    StoreHandle::new(setup_test_paths(temp_dir))
}

/// Write a live `<component>/defaults/<file>`
pub fn live_component(store: &StoreHandle, component: &str, file: &str, content: &str) {
    write_defaults(&store.paths.live_components(), component, file, content);
}

/// Write a stored `<profile>/<component>/defaults/<file>`
pub fn stored_component(
    store: &StoreHandle,
    profile: &str,
    component: &str,
    file: &str,
    content: &str,
) {
    write_defaults(&store.paths.profile_components(profile), component, file, content);
}

fn write_defaults(root: &Path, component: &str, file: &str, content: &str) {
    let dir = root.join(component).join(DEFAULTS_DIR);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(file), content).unwrap();
}

/// Write the live credentials file
pub fn live_credentials(store: &StoreHandle, content: &str) {
    fs::create_dir_all(store.paths.credentials.parent().unwrap()).unwrap();
    fs::write(&store.paths.credentials, content).unwrap();
}

/// One recorded call to the fake engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Run {
        playbook: Playbook,
        inventory: PathBuf,
        vars: Vars,
    },
    ListNodes(PathBuf),
}

/// Engine double that records calls and returns scripted results
#[derive(Debug, Default)]
pub struct FakeEngine {
    pub calls: RefCell<Vec<EngineCall>>,
    /// Playbooks that should report failure
    pub failing: Vec<Playbook>,
    /// Credentials paths whose node listing should error
    pub unreachable: Vec<PathBuf>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(playbook: Playbook) -> Self {
        Self {
            failing: vec![playbook],
            ..Self::default()
        }
    }

    pub fn runs(&self) -> Vec<Playbook> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                EngineCall::Run { playbook, .. } => Some(*playbook),
                EngineCall::ListNodes(_) => None,
            })
            .collect()
    }
}

impl ClusterEngine for FakeEngine {
    fn run(&self, playbook: Playbook, inventory: &Path, vars: &Vars) -> Result<bool> {
        self.calls.borrow_mut().push(EngineCall::Run {
            playbook,
            inventory: inventory.to_path_buf(),
            vars: vars.clone(),
        });
        Ok(!self.failing.contains(&playbook))
    }

    fn list_nodes(&self, credentials: &Path) -> Result<String> {
        self.calls
            .borrow_mut()
            .push(EngineCall::ListNodes(credentials.to_path_buf()));
        if self.unreachable.iter().any(|p| p == credentials) {
            bail!("connection refused");
        }
        let content = fs::read_to_string(credentials)?;
        Ok(format!("NAME STATUS\n{} Ready", content.trim()))
    }
}

/// Confirmer that always gives the same answer
#[derive(Debug, Clone, Copy)]
pub struct ScriptedConfirmer(pub Answer);

impl Confirmer for ScriptedConfirmer {
    fn confirm(&self, _prompt: &str, _timeout: Duration) -> Result<Answer> {
        Ok(self.0)
    }
}
