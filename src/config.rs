//! Runtime configuration.
//!
//! Settings come from an optional JSON file. Every key is optional; anything
//! missing falls back to the defaults below. The file is looked up in this
//! order:
//! 1. `--config` CLI flag
//! 2. `CLUSTERCTX_CONFIG` environment variable
//! 3. `<base>/clusterctx.json`

use anyhow::{Context, Result, bail};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// Default base directory holding the live inventory and playbooks
pub const DEFAULT_BASE_DIR: &str = "/etc/ansible";

/// Environment variable overriding the settings file location
pub const CONFIG_ENV: &str = "CLUSTERCTX_CONFIG";

/// Name of the settings file looked up inside the base directory
pub const CONFIG_FILE_NAME: &str = "clusterctx.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Directory (relative to the base) holding `<component>/defaults/*`
    pub component_root: PathBuf,

    /// Live credentials file read by the cluster client
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials_path: Option<PathBuf>,

    /// Playbook runner executable
    pub playbook_bin: String,

    /// Cluster client executable used for node listings
    pub kubectl_bin: String,

    /// Bounded wait for destructive confirmations
    pub confirm_timeout_secs: u64,

    /// Kill engine runs after this many seconds (unset = wait for completion)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine_timeout_secs: Option<u64>,

    /// Delete component-defaults files that have no counterpart on the source side
    pub prune_stale: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            component_root: PathBuf::from("roles"),
            credentials_path: None,
            playbook_bin: "ansible-playbook".to_string(),
            kubectl_bin: "kubectl".to_string(),
            confirm_timeout_secs: 10,
            engine_timeout_secs: None,
            prune_stale: false,
        }
    }
}

impl Settings {
    /// Read settings from a file, returning defaults if the file doesn't exist
    pub fn read(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {:?}", path))?;

        let settings: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings file: {:?}", path))?;
        settings
            .validate()
            .with_context(|| format!("Invalid settings file: {:?}", path))?;
        Ok(settings)
    }

    /// Check values that the file format alone cannot rule out
    ///
    /// `component_root` is joined onto the base and onto every profile
    /// directory, so it must be a plain relative path. An absolute root or
    /// one climbing out with `..` resolves to the same directory for all of
    /// them.
    pub fn validate(&self) -> Result<()> {
        let root = &self.component_root;
        let plain = root
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        let named = root.components().any(|c| matches!(c, Component::Normal(_)));
        if !plain || !named {
            bail!(
                "component_root must be a relative path below the base directory, got {:?}",
                root
            );
        }
        Ok(())
    }

    /// Resolve the settings file location and load it
    pub fn load(base_dir: &Path, explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match std::env::var_os(CONFIG_ENV) {
                Some(path) => PathBuf::from(path),
                None => base_dir.join(CONFIG_FILE_NAME),
            },
        };
        Self::read(&path)
    }

    /// Credentials path, falling back to `~/.kube/config`
    pub fn credentials_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.credentials_path {
            return Ok(path.clone());
        }
        let base_dirs = BaseDirs::new().context("Failed to determine home directory")?;
        Ok(base_dirs.home_dir().join(".kube").join("config"))
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_secs(self.confirm_timeout_secs)
    }

    pub fn engine_timeout(&self) -> Option<Duration> {
        self.engine_timeout_secs.map(Duration::from_secs)
    }
}
