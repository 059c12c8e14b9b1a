//! Enumerates stored contexts and asks the engine for each cluster's nodes.

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::engine::ClusterEngine;
use crate::fs_utils::modified_at;
use crate::store::StoreHandle;

/// One stored context as shown by `list`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextEntry {
    pub name: String,
    pub is_current: bool,
    pub has_inventory: bool,
    pub has_credentials: bool,
    /// When the inventory snapshot was last written
    pub saved_at: Option<DateTime<Utc>>,
}

/// Node listing for one context with stored credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeListing {
    pub context: String,
    /// Engine output, or the error message if the query failed
    pub result: Result<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListReport {
    pub current: Option<String>,
    pub contexts: Vec<ContextEntry>,
    pub nodes: Vec<NodeListing>,
}

/// Build the listing report
///
/// A failing node query is recorded against its context and never stops
/// the remaining queries.
pub fn list(store: &StoreHandle, engine: &dyn ClusterEngine) -> Result<ListReport> {
    let current = store.current()?;
    let paths = &store.paths;

    let contexts: Vec<ContextEntry> = store
        .list_names()?
        .into_iter()
        .map(|name| {
            let inventory = paths.profile_inventory(&name);
            ContextEntry {
                is_current: current.as_deref() == Some(name.as_str()),
                has_inventory: inventory.is_file(),
                has_credentials: paths.profile_credentials(&name).is_file(),
                saved_at: modified_at(&inventory),
                name,
            }
        })
        .collect();

    let nodes = contexts
        .iter()
        .filter(|c| c.has_credentials)
        .map(|c| {
            let result = engine
                .list_nodes(&paths.profile_credentials(&c.name))
                .map_err(|e| {
                    tracing::warn!(context = %c.name, error = %format!("{e:#}"), "node listing failed");
                    format!("{e:#}")
                });
            NodeListing {
                context: c.name.clone(),
                result,
            }
        })
        .collect();

    Ok(ListReport {
        current,
        contexts,
        nodes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FakeEngine, setup_test_store};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_list_uninitialized_store_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = setup_test_store(&temp_dir);
        let report = list(&store, &FakeEngine::new()).unwrap();
        assert_eq!(report, ListReport::default());
    }

    #[test]
    fn test_list_marks_current_and_queries_credentialed_contexts() {
        let temp_dir = TempDir::new().unwrap();
        let store = setup_test_store(&temp_dir);
        store.ensure_initialized().unwrap();
        store.create_from_default("prod").unwrap();
        store.create_from_default("staging").unwrap();
        store.set_current("prod").unwrap();
        fs::write(store.paths.profile_inventory("prod"), "[kube-node]\n").unwrap();
        fs::write(store.paths.profile_credentials("prod"), "prod-node-1").unwrap();

        let engine = FakeEngine::new();
        let report = list(&store, &engine).unwrap();

        let names: Vec<_> = report.contexts.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["default", "prod", "staging"]);
        let prod = &report.contexts[1];
        assert!(prod.is_current && prod.has_inventory && prod.has_credentials);
        assert!(prod.saved_at.is_some());
        assert!(!report.contexts[2].is_current);

        assert_eq!(report.nodes.len(), 1);
        assert_eq!(report.nodes[0].context, "prod");
        assert!(report.nodes[0].result.as_ref().unwrap().contains("prod-node-1"));
    }

    #[test]
    fn test_one_unreachable_cluster_does_not_stop_listing() {
        let temp_dir = TempDir::new().unwrap();
        let store = setup_test_store(&temp_dir);
        store.ensure_initialized().unwrap();
        for name in ["a", "b"] {
            store.create_from_default(name).unwrap();
            fs::write(store.paths.profile_credentials(name), name).unwrap();
        }

        let engine = FakeEngine {
            unreachable: vec![store.paths.profile_credentials("a")],
            ..FakeEngine::default()
        };
        let report = list(&store, &engine).unwrap();

        assert_eq!(report.nodes.len(), 2);
        assert_eq!(report.nodes[0].result, Err("connection refused".to_string()));
        assert!(report.nodes[1].result.is_ok());
    }
}
