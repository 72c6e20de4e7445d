// Copyright (c) 2024-2025 kvgraph Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Store and graph configuration

use crate::graph::NODE_ID_KEY;
use crate::storage::persistent::{StorageDriverError, StorageType};
use crate::storage::types::{GraphError, GraphResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default tree (namespace) holding graph records
pub const DEFAULT_TREE_NAME: &str = "kvgraph";

/// Where and how graph records are stored
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// Backend driver
    pub storage_type: StorageType,

    /// Database directory; ignored by the memory backend
    pub path: PathBuf,

    /// Tree holding every record of this store
    pub tree_name: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_type: StorageType::Sled,
            path: PathBuf::from("./kvgraph-data"),
            tree_name: DEFAULT_TREE_NAME.to_string(),
        }
    }
}

impl StoreConfig {
    /// Sled database at `path`
    pub fn sled<P: AsRef<Path>>(path: P) -> Self {
        Self {
            storage_type: StorageType::Sled,
            path: path.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Process-local store; every open gets a fresh, empty map
    pub fn memory() -> Self {
        Self {
            storage_type: StorageType::Memory,
            path: PathBuf::new(),
            ..Self::default()
        }
    }

    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> GraphResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| GraphError::Storage(StorageDriverError::IoError(e)))?;
        serde_json::from_str(&text).map_err(|e| {
            GraphError::validation(format!(
                "Invalid store configuration in {:?}: {}",
                path.as_ref(),
                e
            ))
        })
    }
}

/// Defaults applied to a newly created graph
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct GraphConfig {
    /// Optimisation keys beyond `node_id`, in registration order
    pub optimisation_keys: Vec<String>,

    /// TTL given to vertices added without an explicit one
    pub default_node_ttl: Option<Duration>,
}

impl GraphConfig {
    /// Graph ordered by `keys` in addition to `node_id`
    pub fn with_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            optimisation_keys: keys.into_iter().map(Into::into).collect(),
            default_node_ttl: None,
        }
    }

    /// Same configuration with every new vertex expiring after `ttl`
    pub fn expiring_after(mut self, ttl: Duration) -> Self {
        self.default_node_ttl = Some(ttl);
        self
    }

    /// Full key list: `node_id` first, then the configured keys without
    /// duplicates.
    pub fn all_keys(&self) -> Vec<String> {
        let mut keys = vec![NODE_ID_KEY.to_string()];
        for key in &self.optimisation_keys {
            if !keys.contains(key) {
                keys.push(key.clone());
            }
        }
        keys
    }

    pub fn validate(&self) -> GraphResult<()> {
        if let Some(ttl) = self.default_node_ttl {
            if ttl.is_zero() {
                return Err(GraphError::validation("Default node TTL must be positive"));
            }
        }
        if self.optimisation_keys.iter().any(|k| k.is_empty()) {
            return Err(GraphError::validation("Optimisation keys must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_memory_preset() {
        let config = StoreConfig::memory();
        assert_eq!(config.storage_type, StorageType::Memory);
        assert_eq!(config.tree_name, DEFAULT_TREE_NAME);
    }

    #[test]
    fn test_from_json_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"storage_type": "memory", "tree_name": "social"}}"#).unwrap();

        let config = StoreConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.storage_type, StorageType::Memory);
        assert_eq!(config.tree_name, "social");
        assert_eq!(config.path, StoreConfig::default().path);
    }

    #[test]
    fn test_from_json_file_rejects_garbage() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = StoreConfig::from_json_file(file.path()).unwrap_err();
        assert!(matches!(err, GraphError::Validation(_)));
    }

    #[test]
    fn test_all_keys_puts_node_id_first() {
        let config = GraphConfig::with_keys(["score", "node_id", "score", "age"]);
        assert_eq!(config.all_keys(), vec!["node_id", "score", "age"]);
    }

    #[test]
    fn test_zero_default_ttl_is_invalid() {
        let config = GraphConfig::default().expiring_after(Duration::ZERO);
        assert!(config.validate().is_err());
        assert!(GraphConfig::with_keys(["score"]).validate().is_ok());
    }
}
