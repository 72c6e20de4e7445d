//! Isolated store fixture for kvgraph integration tests

#![allow(dead_code)]

use kvgraph::{open_store, GraphNode, Store, StoreConfig, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Store handle plus the directory backing it, if any
pub struct GraphFixture {
    store: Arc<dyn Store>,
    db_path: Option<PathBuf>,
    _temp_dir: Option<tempfile::TempDir>,
}

impl GraphFixture {
    /// Fixture over a fresh in-memory store
    pub fn memory() -> Result<Self, Box<dyn std::error::Error>> {
        let store = open_store(&StoreConfig::memory())?;
        Ok(Self {
            store,
            db_path: None,
            _temp_dir: None,
        })
    }

    /// Fixture over a sled database in a temporary directory
    pub fn sled() -> Result<Self, Box<dyn std::error::Error>> {
        let temp_dir = tempfile::tempdir()?;
        let db_path = temp_dir.path().join("kvgraph_test");
        let store = open_store(&StoreConfig::sled(&db_path))?;
        Ok(Self {
            store,
            db_path: Some(db_path),
            _temp_dir: Some(temp_dir),
        })
    }

    pub fn store(&self) -> Arc<dyn Store> {
        self.store.clone()
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Drop the current store handle and open the same database again.
    ///
    /// Every other handle to the old store must be dropped first.
    pub fn reopen(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let path = self
            .db_path
            .clone()
            .ok_or("only sled fixtures can be reopened")?;
        self.store.flush()?;
        self.store = open_store(&StoreConfig::memory())?;
        self.store = open_store(&StoreConfig::sled(path))?;
        Ok(())
    }
}

/// Node data from `(field, number)` pairs
pub fn data(pairs: &[(&str, f64)]) -> BTreeMap<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), Value::from(*v)))
        .collect()
}

/// Numeric `key` values of `nodes`, in order
pub fn values_of(nodes: &[GraphNode], key: &str) -> Vec<f64> {
    nodes
        .iter()
        .filter_map(|n| n.get(key).and_then(Value::as_number))
        .collect()
}
