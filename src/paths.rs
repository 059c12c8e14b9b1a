use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::config::Settings;

/// Name of the per-profile inventory snapshot
pub const INVENTORY_FILE: &str = "hosts";
/// Name of the per-profile credentials snapshot
pub const CREDENTIALS_FILE: &str = "config";
/// Name of the pointer file inside the store root
pub const POINTER_FILE: &str = "current_cluster";
/// Name of the advisory lock file inside the store root
pub const LOCK_FILE: &str = ".lock";
/// Subdirectory of each component holding its default settings
pub const DEFAULTS_DIR: &str = "defaults";

/// All computed paths used by clusterctx
#[derive(Debug, Clone)]
pub struct Paths {
    /// /etc/ansible
    pub base_dir: PathBuf,
    /// /etc/ansible/.cluster
    pub store_dir: PathBuf,
    /// /etc/ansible/.cluster/current_cluster
    pub pointer_file: PathBuf,
    /// /etc/ansible/.cluster/.lock
    pub lock_file: PathBuf,
    /// /etc/ansible/hosts
    pub inventory: PathBuf,
    /// roles (relative), shared by the live workspace and every snapshot
    pub component_root: PathBuf,
    /// ~/.kube/config
    pub credentials: PathBuf,
}

impl Paths {
    pub fn new(base_dir: &Path, settings: &Settings) -> Result<Self> {
        settings.validate()?;
        let base_dir = base_dir.to_path_buf();
        let store_dir = base_dir.join(".cluster");

        Ok(Self {
            pointer_file: store_dir.join(POINTER_FILE),
            lock_file: store_dir.join(LOCK_FILE),
            inventory: base_dir.join(INVENTORY_FILE),
            component_root: settings.component_root.clone(),
            credentials: settings.credentials_path()?,
            store_dir,
            base_dir,
        })
    }

    /// Live `<base>/<component-root>`
    pub fn live_components(&self) -> PathBuf {
        self.base_dir.join(&self.component_root)
    }

    /// Get the path to a specific profile directory
    pub fn profile_dir(&self, name: &str) -> PathBuf {
        self.store_dir.join(name)
    }

    /// Get the path to a specific profile's inventory snapshot
    pub fn profile_inventory(&self, name: &str) -> PathBuf {
        self.profile_dir(name).join(INVENTORY_FILE)
    }

    /// Get the path to a specific profile's credentials snapshot
    pub fn profile_credentials(&self, name: &str) -> PathBuf {
        self.profile_dir(name).join(CREDENTIALS_FILE)
    }

    /// Get the path to a specific profile's component snapshot root
    pub fn profile_components(&self, name: &str) -> PathBuf {
        self.profile_dir(name).join(&self.component_root)
    }
}
