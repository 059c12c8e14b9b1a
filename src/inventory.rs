//! Line-level edits of the INI-style inventory file.

use anyhow::{Result, bail};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use crate::engine::Playbook;

/// Cluster roles a host can be added to or removed from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostRole {
    Etcd,
    Master,
    Node,
}

impl HostRole {
    /// Inventory group holding hosts of this role
    pub fn group(&self) -> &'static str {
        match self {
            HostRole::Etcd => "etcd",
            HostRole::Master => "kube-master",
            HostRole::Node => "kube-node",
        }
    }

    pub fn add_playbook(&self) -> Playbook {
        match self {
            HostRole::Etcd => Playbook::AddEtcd,
            HostRole::Master => Playbook::AddMaster,
            HostRole::Node => Playbook::AddNode,
        }
    }

    pub fn del_playbook(&self) -> Playbook {
        match self {
            HostRole::Etcd => Playbook::DelEtcd,
            HostRole::Master => Playbook::DelMaster,
            HostRole::Node => Playbook::DelNode,
        }
    }

    /// Variable naming the host for the add playbook
    pub fn add_var(&self) -> &'static str {
        match self {
            HostRole::Etcd => "ETCD_TO_ADD",
            HostRole::Master | HostRole::Node => "NODE_TO_ADD",
        }
    }

    /// Variable naming the host for the delete playbook
    pub fn del_var(&self) -> &'static str {
        match self {
            HostRole::Etcd => "ETCD_TO_DEL",
            HostRole::Master | HostRole::Node => "NODE_TO_DEL",
        }
    }

    /// Inventory line for a freshly added host
    pub fn new_host_line(&self, host: &IpAddr) -> String {
        let marker = match self {
            HostRole::Etcd => "NEW_ETCD",
            HostRole::Master => "NEW_MASTER",
            HostRole::Node => "NEW_NODE",
        };
        format!("{host} {marker}=yes")
    }
}

impl fmt::Display for HostRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HostRole::Etcd => "etcd",
            HostRole::Master => "master",
            HostRole::Node => "node",
        };
        f.write_str(name)
    }
}

/// Parse and validate a host address
pub fn parse_host(addr: &str) -> Result<IpAddr> {
    match IpAddr::from_str(addr.trim()) {
        Ok(ip) => Ok(ip),
        Err(_) => bail!("Invalid host address '{}'", addr),
    }
}

/// An inventory file kept as its original lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inventory {
    lines: Vec<String>,
    trailing_newline: bool,
}

impl Inventory {
    pub fn parse(text: &str) -> Self {
        Self {
            lines: text.lines().map(str::to_string).collect(),
            trailing_newline: text.ends_with('\n'),
        }
    }

    /// Index range of the body of `[group]`, excluding the header
    fn group_body(&self, group: &str) -> Option<(usize, usize)> {
        let header = format!("[{group}]");
        let start = self.lines.iter().position(|l| l.trim() == header)? + 1;
        let end = self.lines[start..]
            .iter()
            .position(|l| l.trim_start().starts_with('['))
            .map_or(self.lines.len(), |offset| start + offset);
        Some((start, end))
    }

    fn host_index(&self, group: &str, host: &str) -> Option<usize> {
        let (start, end) = self.group_body(group)?;
        (start..end).find(|&i| {
            let line = self.lines[i].trim();
            !line.starts_with('#') && line.split_whitespace().next() == Some(host)
        })
    }

    pub fn contains_host(&self, group: &str, host: &str) -> bool {
        self.host_index(group, host).is_some()
    }

    /// Insert `line` directly below the `[group]` header
    pub fn insert_host(&mut self, group: &str, line: String) -> Result<()> {
        let Some((start, _)) = self.group_body(group) else {
            bail!("Inventory has no [{}] group", group);
        };
        self.lines.insert(start, line);
        Ok(())
    }

    /// Remove `host` from `[group]`; returns whether a line was removed
    pub fn remove_host(&mut self, group: &str, host: &str) -> bool {
        match self.host_index(group, host) {
            Some(i) => {
                self.lines.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn render(&self) -> String {
        let mut out = self.lines.join("\n");
        if self.trailing_newline {
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOSTS: &str = "\
[etcd]
10.0.0.1 NODE_NAME=etcd1

[kube-master]
10.0.0.1

[kube-node]
10.0.0.2
# 10.0.0.9

[all:vars]
CLUSTER_NETWORK=calico
";

    #[test]
    fn test_parse_host() {
        assert!(parse_host("10.0.0.5").is_ok());
        assert!(parse_host("fd00::1").is_ok());
        assert!(parse_host("10.0.0.256").is_err());
        assert!(parse_host("node-1").is_err());
    }

    #[test]
    fn test_contains_host_is_group_scoped() {
        let inv = Inventory::parse(HOSTS);
        assert!(inv.contains_host("kube-node", "10.0.0.2"));
        assert!(!inv.contains_host("kube-master", "10.0.0.2"));
        assert!(inv.contains_host("etcd", "10.0.0.1"));
        // Commented lines don't count
        assert!(!inv.contains_host("kube-node", "10.0.0.9"));
        assert!(!inv.contains_host("missing", "10.0.0.2"));
    }

    #[test]
    fn test_insert_below_header() {
        let mut inv = Inventory::parse(HOSTS);
        let ip = parse_host("10.0.0.3").unwrap();
        inv.insert_host("kube-node", HostRole::Node.new_host_line(&ip)).unwrap();

        assert!(inv.render().contains("[kube-node]\n10.0.0.3 NEW_NODE=yes\n10.0.0.2\n"));
        assert!(inv.contains_host("kube-node", "10.0.0.3"));
    }

    #[test]
    fn test_insert_into_missing_group_fails() {
        let mut inv = Inventory::parse("[etcd]\n");
        assert!(inv.insert_host("kube-node", "10.0.0.3".into()).is_err());
    }

    #[test]
    fn test_remove_then_render_preserves_rest() {
        let mut inv = Inventory::parse(HOSTS);
        assert!(inv.remove_host("kube-node", "10.0.0.2"));
        assert!(!inv.remove_host("kube-node", "10.0.0.2"));

        let rendered = inv.render();
        assert!(!rendered.contains("10.0.0.2"));
        assert!(rendered.ends_with("CLUSTER_NETWORK=calico\n"));
        assert_eq!(rendered.lines().count(), HOSTS.lines().count() - 1);
    }

    #[test]
    fn test_role_wiring() {
        assert_eq!(HostRole::Master.group(), "kube-master");
        assert_eq!(HostRole::Etcd.add_playbook(), Playbook::AddEtcd);
        assert_eq!(HostRole::Node.del_var(), "NODE_TO_DEL");
        assert_eq!(HostRole::Etcd.to_string(), "etcd");
    }
}
