// Copyright (c) 2024-2025 kvgraph Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! In-memory storage driver implementation

use super::traits::{StorageDriver, StorageTree, TreeIter};
use super::types::{StorageResult, StorageType};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

type TreeData = Arc<RwLock<HashMap<Vec<u8>, Vec<u8>>>>;

/// Process-local storage driver
///
/// Trees opened twice under the same name share their contents, so two
/// graphs built on the same driver see each other's records.
pub struct MemoryStorageDriver {
    trees: Arc<RwLock<HashMap<String, TreeData>>>,
}

/// In-memory tree implementation
pub struct MemoryTree {
    data: TreeData,
}

impl MemoryStorageDriver {
    /// Create a new memory storage driver
    pub fn new() -> Self {
        Self {
            trees: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for MemoryStorageDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageTree for MemoryTree {
    fn insert(&self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        self.data.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.data.read().get(key).cloned())
    }

    fn remove(&self, key: &[u8]) -> StorageResult<()> {
        self.data.write().remove(key);
        Ok(())
    }

    fn iter(&self) -> StorageResult<TreeIter<'_>> {
        // Snapshot so callers may mutate the tree while iterating
        let items: Vec<_> = self
            .data
            .read()
            .iter()
            .map(|(k, v)| Ok((k.clone(), v.clone())))
            .collect();
        Ok(Box::new(items.into_iter()))
    }

    fn flush(&self) -> StorageResult<()> {
        Ok(())
    }
}

impl StorageDriver for MemoryStorageDriver {
    type Tree = Box<dyn StorageTree>;

    fn open<P: AsRef<Path>>(_path: P) -> StorageResult<Self> {
        Ok(Self::new())
    }

    fn open_tree(&self, name: &str) -> StorageResult<Self::Tree> {
        let data = self
            .trees
            .write()
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(HashMap::new())))
            .clone();

        Ok(Box::new(MemoryTree { data }) as Box<dyn StorageTree>)
    }

    fn flush(&self) -> StorageResult<()> {
        Ok(())
    }

    fn storage_type(&self) -> StorageType {
        StorageType::Memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trees_with_same_name_share_data() {
        let driver = MemoryStorageDriver::new();
        let a = driver.open_tree("records").unwrap();
        let b = driver.open_tree("records").unwrap();
        let other = driver.open_tree("other").unwrap();

        a.insert(b"k", b"v").unwrap();
        assert_eq!(b.get(b"k").unwrap(), Some(b"v".to_vec()));
        assert_eq!(other.get(b"k").unwrap(), None);
    }

    #[test]
    fn test_iter_is_a_snapshot() {
        let driver = MemoryStorageDriver::new();
        let tree = driver.open_tree("records").unwrap();
        tree.insert(b"a", b"1").unwrap();
        tree.insert(b"b", b"2").unwrap();

        for item in tree.iter().unwrap() {
            let (key, _) = item.unwrap();
            tree.remove(&key).unwrap();
        }
        assert_eq!(tree.iter().unwrap().count(), 0);
    }

    #[test]
    fn test_separate_drivers_are_isolated() {
        let first = MemoryStorageDriver::new();
        let second = MemoryStorageDriver::new();
        first.open_tree("records").unwrap().insert(b"k", b"v").unwrap();

        assert_eq!(second.open_tree("records").unwrap().get(b"k").unwrap(), None);
    }
}
