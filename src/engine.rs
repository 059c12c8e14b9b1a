//! The external cluster automation engine.
//!
//! clusterctx never touches the live cluster itself. Provisioning, teardown
//! and node listings are delegated to a [`ClusterEngine`]; the default
//! [`AnsibleEngine`] shells out to `ansible-playbook` and `kubectl`.

use anyhow::{Context, Result, bail};
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use crate::config::Settings;

/// Extra `-e KEY=VALUE` variables passed to a playbook run
pub type Vars = BTreeMap<String, String>;

/// Playbooks the tool knows how to invoke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Playbook {
    Setup,
    Upgrade,
    AddEtcd,
    AddNode,
    AddMaster,
    DelEtcd,
    DelNode,
    DelMaster,
    Clean,
}

impl Playbook {
    /// File name of the playbook inside the base directory
    pub fn file_name(&self) -> &'static str {
        match self {
            Playbook::Setup => "90.setup.yml",
            Playbook::Upgrade => "22.upgrade.yml",
            Playbook::AddEtcd => "19.addetcd.yml",
            Playbook::AddNode => "20.addnode.yml",
            Playbook::AddMaster => "21.addmaster.yml",
            Playbook::DelEtcd => "31.deletcd.yml",
            Playbook::DelNode => "32.delnode.yml",
            Playbook::DelMaster => "33.delmaster.yml",
            Playbook::Clean => "99.clean.yml",
        }
    }
}

/// Interface to whatever actually mutates the cluster
pub trait ClusterEngine {
    /// Run a playbook against an inventory
    ///
    /// `Ok(false)` means the engine ran and reported failure; `Err` means it
    /// could not be run at all.
    fn run(&self, playbook: Playbook, inventory: &Path, vars: &Vars) -> Result<bool>;

    /// Node listing for the cluster reachable with `credentials`
    fn list_nodes(&self, credentials: &Path) -> Result<String>;
}

/// Engine backed by `ansible-playbook` and `kubectl` child processes
#[derive(Debug, Clone)]
pub struct AnsibleEngine {
    pub playbook_bin: String,
    pub kubectl_bin: String,
    /// Directory holding the playbook files
    pub playbook_dir: PathBuf,
    /// Kill a playbook run after this long (None = wait for completion)
    pub timeout: Option<Duration>,
}

impl AnsibleEngine {
    pub fn new(base_dir: &Path, settings: &Settings) -> Self {
        Self {
            playbook_bin: settings.playbook_bin.clone(),
            kubectl_bin: settings.kubectl_bin.clone(),
            playbook_dir: base_dir.to_path_buf(),
            timeout: settings.engine_timeout(),
        }
    }

    /// Arguments for one playbook invocation
    pub fn playbook_args(&self, playbook: Playbook, inventory: &Path, vars: &Vars) -> Vec<String> {
        let mut args = vec![
            "-i".to_string(),
            inventory.display().to_string(),
            self.playbook_dir.join(playbook.file_name()).display().to_string(),
        ];
        for (key, value) in vars {
            args.push("-e".to_string());
            args.push(format!("{key}={value}"));
        }
        args
    }
}

impl ClusterEngine for AnsibleEngine {
    fn run(&self, playbook: Playbook, inventory: &Path, vars: &Vars) -> Result<bool> {
        let args = self.playbook_args(playbook, inventory, vars);
        tracing::info!(playbook = playbook.file_name(), ?vars, "running playbook");

        let status = syscall_interactive(&self.playbook_bin, &args, self.timeout)?;
        tracing::debug!(playbook = playbook.file_name(), %status, "playbook finished");
        Ok(status.success())
    }

    fn list_nodes(&self, credentials: &Path) -> Result<String> {
        let output = Command::new(&self.kubectl_bin)
            .arg("--kubeconfig")
            .arg(credentials)
            .args(["get", "node"])
            .output()
            .with_context(|| format!("Failed to run {}", self.kubectl_bin))?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim_end().to_string();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("{} exited with {}: {}", self.kubectl_bin, output.status, stderr.trim_end());
        }

        Ok(stdout)
    }
}

/// Run a command with inherited stdio, optionally killing it at a deadline
fn syscall_interactive(
    cmd: impl AsRef<OsStr>,
    args: &[String],
    timeout: Option<Duration>,
) -> Result<ExitStatus> {
    let cmd = cmd.as_ref();
    let mut child = Command::new(cmd)
        .args(args)
        .stdin(Stdio::inherit())
        .spawn()
        .with_context(|| format!("Failed to run {:?}", cmd))?;

    let Some(timeout) = timeout else {
        return child
            .wait()
            .with_context(|| format!("Failed to wait for {:?}", cmd));
    };

    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            child.kill().ok();
            child.wait().ok();
            bail!("{:?} timed out after {}s", cmd, timeout.as_secs());
        }
        std::thread::sleep(Duration::from_millis(200));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> AnsibleEngine {
        AnsibleEngine {
            playbook_bin: "ansible-playbook".into(),
            kubectl_bin: "kubectl".into(),
            playbook_dir: PathBuf::from("/etc/ansible"),
            timeout: None,
        }
    }

    #[test]
    fn test_playbook_args() {
        let mut vars = Vars::new();
        vars.insert("NODE_TO_ADD".into(), "10.0.0.9".into());

        let args = engine().playbook_args(Playbook::AddNode, Path::new("/etc/ansible/hosts"), &vars);

        assert_eq!(
            args,
            vec![
                "-i",
                "/etc/ansible/hosts",
                "/etc/ansible/20.addnode.yml",
                "-e",
                "NODE_TO_ADD=10.0.0.9",
            ]
        );
    }

    #[test]
    fn test_new_from_settings() {
        let settings = Settings {
            engine_timeout_secs: Some(60),
            playbook_bin: "/usr/local/bin/ansible-playbook".into(),
            ..Settings::default()
        };
        let engine = AnsibleEngine::new(Path::new("/srv"), &settings);
        assert_eq!(engine.timeout, Some(Duration::from_secs(60)));
        assert_eq!(engine.playbook_bin, "/usr/local/bin/ansible-playbook");
        assert_eq!(engine.playbook_dir, PathBuf::from("/srv"));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_reports_exit_status() {
        let ok = AnsibleEngine {
            playbook_bin: "true".into(),
            ..engine()
        };
        assert!(ok.run(Playbook::Setup, Path::new("hosts"), &Vars::new()).unwrap());

        let failing = AnsibleEngine {
            playbook_bin: "false".into(),
            ..engine()
        };
        assert!(!failing.run(Playbook::Setup, Path::new("hosts"), &Vars::new()).unwrap());
    }

    #[test]
    fn test_missing_binary_is_error() {
        let missing = AnsibleEngine {
            playbook_bin: "clusterctx-no-such-binary".into(),
            kubectl_bin: "clusterctx-no-such-binary".into(),
            ..engine()
        };
        assert!(missing.run(Playbook::Clean, Path::new("hosts"), &Vars::new()).is_err());
        assert!(missing.list_nodes(Path::new("config")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_child() {
        let result = syscall_interactive(
            "sleep",
            &["5".to_string()],
            Some(Duration::from_millis(300)),
        );
        assert!(result.unwrap_err().to_string().contains("timed out"));
    }
}
