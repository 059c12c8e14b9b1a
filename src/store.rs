//! The profile store.
//!
//! This module handles the "data model" of contexts:
//! - Bootstrapping the store root with a `default` profile
//! - Reading and swapping the current-context pointer
//! - Looking up, listing, creating and removing stored profiles
//! - Validating profile names
//!
//! It interacts directly with the filesystem under `<base>/.cluster/`.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use crate::error::StoreError;
use crate::fs_utils::{copy_dir_recursive, subdir_names, write_atomic};
use crate::lock::StoreLock;
use crate::paths::Paths;

/// Name of the built-in template profile
pub const DEFAULT_PROFILE: &str = "default";

/// Result of looking a profile up by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileLookup {
    Existing(PathBuf),
    NotFound,
}

/// Handle on a store rooted at a base directory
///
/// Every operation goes through this value rather than reading ambient
/// locations, so tests can point it at a temp directory.
#[derive(Debug, Clone)]
pub struct StoreHandle {
    pub paths: Paths,
    /// Prune stale component-defaults files on save/install
    pub prune_stale: bool,
}

impl StoreHandle {
    pub fn new(paths: Paths) -> Self {
        Self {
            paths,
            prune_stale: false,
        }
    }

    pub fn with_prune(mut self, prune_stale: bool) -> Self {
        self.prune_stale = prune_stale;
        self
    }

    /// Take the store's exclusive lock
    pub fn lock(&self) -> Result<StoreLock> {
        StoreLock::acquire(&self.paths.lock_file)
    }

    /// Bootstrap the store on first run
    ///
    /// Creates the store root, the `default` profile and a pointer to it.
    /// Safe to call on every invocation: anything already present is kept.
    pub fn ensure_initialized(&self) -> Result<()> {
        let default_dir = self.paths.profile_dir(DEFAULT_PROFILE);
        if !default_dir.exists() {
            fs::create_dir_all(&default_dir).with_context(|| {
                format!("Failed to create default profile: {}", default_dir.display())
            })?;
            tracing::info!(store = %self.paths.store_dir.display(), "initialized context store");
        }

        if self.current()?.is_none() {
            self.set_current(DEFAULT_PROFILE)?;
        }

        Ok(())
    }

    /// Name of the current profile, if the pointer file exists and is non-empty
    ///
    /// A pointer holding anything but a valid profile name is an error, so a
    /// hand-edited pointer can never lead outside the store.
    pub fn current(&self) -> Result<Option<String>> {
        let path = &self.paths.pointer_file;
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read pointer file: {:?}", path))?;
        let name = content.lines().next().unwrap_or("").trim();

        if name.is_empty() {
            return Ok(None);
        }
        validate_profile_name(name)
            .with_context(|| format!("Corrupt pointer file: {:?}", path))?;
        Ok(Some(name.to_string()))
    }

    /// Like [`current`](Self::current) but a missing pointer is an error
    pub fn require_current(&self) -> Result<String> {
        self.current()?
            .ok_or_else(|| StoreError::NoCurrentProfile.into())
    }

    /// Atomically point the store at `name`
    pub fn set_current(&self, name: &str) -> Result<()> {
        write_atomic(&self.paths.pointer_file, &format!("{}\n", name))?;
        tracing::debug!(context = name, "pointer updated");
        Ok(())
    }

    /// Check if a profile exists
    pub fn exists(&self, name: &str) -> bool {
        self.paths.profile_dir(name).is_dir()
    }

    pub fn resolve_profile(&self, name: &str) -> ProfileLookup {
        let dir = self.paths.profile_dir(name);
        if dir.is_dir() {
            ProfileLookup::Existing(dir)
        } else {
            ProfileLookup::NotFound
        }
    }

    /// List stored profile names (pointer and lock files excluded), sorted
    pub fn list_names(&self) -> Result<Vec<String>> {
        subdir_names(&self.paths.store_dir)
    }

    /// Create `name` by cloning only the `default` profile's component defaults
    ///
    /// Inventory and credentials are deliberately left out: a new context
    /// needs a fresh inventory before it can be set up.
    pub fn create_from_default(&self, name: &str) -> Result<PathBuf> {
        validate_profile_name(name)?;
        let profile_dir = self.paths.profile_dir(name);

        fs::create_dir_all(&profile_dir).with_context(|| {
            format!("Failed to create profile directory: {}", profile_dir.display())
        })?;

        let template = self.paths.profile_components(DEFAULT_PROFILE);
        if template.is_dir() {
            copy_dir_recursive(&template, &self.paths.profile_components(name), false)?;
        } else {
            tracing::warn!("default profile has no component defaults to clone");
        }

        tracing::info!(context = name, "created context from default");
        Ok(profile_dir)
    }

    /// Remove a profile's whole snapshot directory
    pub fn remove_profile(&self, name: &str) -> Result<()> {
        let profile_dir = self.paths.profile_dir(name);

        if !profile_dir.exists() {
            return Err(StoreError::ProfileNotFound(name.to_string()).into());
        }

        fs::remove_dir_all(&profile_dir).with_context(|| {
            format!("Failed to remove profile directory: {}", profile_dir.display())
        })?;

        Ok(())
    }
}

/// Validate profile name
///
/// Only allows alphanumeric characters, underscores, and hyphens.
pub fn validate_profile_name(name: &str) -> Result<()> {
    let invalid = |reason| StoreError::InvalidName {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("name cannot be empty").into());
    }

    if name.chars().count() > 64 {
        return Err(invalid("name cannot be longer than 64 characters").into());
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(invalid("only alphanumeric characters, '-' and '_' are allowed").into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::setup_test_store;
    use tempfile::TempDir;

    #[test]
    fn test_profile_name_validation() {
        assert!(validate_profile_name("prod").is_ok());
        assert!(validate_profile_name("my-cluster").is_ok());
        assert!(validate_profile_name("test_123").is_ok());

        assert!(validate_profile_name("").is_err());
        assert!(validate_profile_name("bad name").is_err());
        assert!(validate_profile_name("../etc").is_err());
        assert!(validate_profile_name(".cluster").is_err());
        assert!(validate_profile_name(&"x".repeat(65)).is_err());
    }

    #[test]
    fn test_ensure_initialized_bootstraps_default() {
        let temp_dir = TempDir::new().unwrap();
        let store = setup_test_store(&temp_dir);
        assert!(store.current().unwrap().is_none());

        store.ensure_initialized().unwrap();

        assert!(store.exists(DEFAULT_PROFILE));
        assert_eq!(store.current().unwrap().as_deref(), Some(DEFAULT_PROFILE));
        assert_eq!(store.list_names().unwrap(), vec![DEFAULT_PROFILE]);
    }

    #[test]
    fn test_ensure_initialized_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let store = setup_test_store(&temp_dir);
        store.ensure_initialized().unwrap();
        store.set_current("prod").unwrap();
        fs::create_dir_all(store.paths.profile_dir("prod")).unwrap();

        store.ensure_initialized().unwrap();

        assert_eq!(store.current().unwrap().as_deref(), Some("prod"));
    }

    #[test]
    fn test_pointer_round_trip_and_trim() {
        let temp_dir = TempDir::new().unwrap();
        let store = setup_test_store(&temp_dir);
        store.set_current("staging").unwrap();
        assert_eq!(store.current().unwrap().as_deref(), Some("staging"));

        fs::write(&store.paths.pointer_file, "  \n").unwrap();
        assert!(store.current().unwrap().is_none());
        let err = store.require_current().unwrap_err();
        assert_eq!(
            err.downcast_ref::<StoreError>(),
            Some(&StoreError::NoCurrentProfile)
        );
    }

    #[test]
    fn test_pointer_outside_store_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let store = setup_test_store(&temp_dir);
        store.ensure_initialized().unwrap();
        fs::write(&store.paths.pointer_file, "../../tmp\n").unwrap();

        let err = store.current().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::InvalidName { name, .. }) if name == "../../tmp"
        ));
        assert!(store.require_current().is_err());
        assert!(store.ensure_initialized().is_err());
    }

    #[test]
    fn test_resolve_profile() {
        let temp_dir = TempDir::new().unwrap();
        let store = setup_test_store(&temp_dir);
        store.ensure_initialized().unwrap();

        assert_eq!(
            store.resolve_profile(DEFAULT_PROFILE),
            ProfileLookup::Existing(store.paths.profile_dir(DEFAULT_PROFILE))
        );
        assert_eq!(store.resolve_profile("prod"), ProfileLookup::NotFound);
    }

    #[test]
    fn test_list_names_excludes_pointer_and_lock() {
        let temp_dir = TempDir::new().unwrap();
        let store = setup_test_store(&temp_dir);
        store.ensure_initialized().unwrap();
        let _lock = store.lock().unwrap();
        store.create_from_default("prod").unwrap();

        assert_eq!(store.list_names().unwrap(), vec!["default", "prod"]);
    }

    #[test]
    fn test_create_from_default_clones_components_only() {
        let temp_dir = TempDir::new().unwrap();
        let store = setup_test_store(&temp_dir);
        store.ensure_initialized().unwrap();

        let defaults = store.paths.profile_components(DEFAULT_PROFILE).join("kube-master/defaults");
        fs::create_dir_all(&defaults).unwrap();
        fs::write(defaults.join("main.yml"), "SERVICE_CIDR: 10.68.0.0/16").unwrap();
        fs::write(store.paths.profile_inventory(DEFAULT_PROFILE), "[kube-node]\n").unwrap();
        fs::write(store.paths.profile_credentials(DEFAULT_PROFILE), "creds").unwrap();

        store.create_from_default("prod").unwrap();

        let cloned = store.paths.profile_components("prod").join("kube-master/defaults/main.yml");
        assert_eq!(fs::read_to_string(cloned).unwrap(), "SERVICE_CIDR: 10.68.0.0/16");
        assert!(!store.paths.profile_inventory("prod").exists());
        assert!(!store.paths.profile_credentials("prod").exists());
    }

    #[test]
    fn test_create_rejects_invalid_name() {
        let temp_dir = TempDir::new().unwrap();
        let store = setup_test_store(&temp_dir);
        store.ensure_initialized().unwrap();
        assert!(store.create_from_default("a/b").is_err());
    }

    #[test]
    fn test_remove_profile() {
        let temp_dir = TempDir::new().unwrap();
        let store = setup_test_store(&temp_dir);
        store.ensure_initialized().unwrap();
        store.create_from_default("prod").unwrap();

        store.remove_profile("prod").unwrap();
        assert!(!store.exists("prod"));

        let err = store.remove_profile("prod").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::ProfileNotFound(_))
        ));
    }
}
