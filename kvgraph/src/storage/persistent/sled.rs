// Copyright (c) 2024-2025 kvgraph Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Sled storage driver implementation

use super::traits::{StorageDriver, StorageTree, TreeIter};
use super::types::{StorageDriverError, StorageResult, StorageType};
use std::path::Path;

fn backend_err(e: sled::Error) -> StorageDriverError {
    StorageDriverError::BackendSpecific(e.to_string())
}

/// Sled driver implementation
pub struct SledDriver {
    db: sled::Db,
}

/// Sled tree wrapper that implements StorageTree trait
pub struct SledTree {
    tree: sled::Tree,
}

impl StorageTree for SledTree {
    fn insert(&self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        self.tree.insert(key, value).map_err(backend_err)?;
        Ok(())
    }

    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        self.tree
            .get(key)
            .map_err(backend_err)
            .map(|opt| opt.map(|v| v.to_vec()))
    }

    fn remove(&self, key: &[u8]) -> StorageResult<()> {
        self.tree.remove(key).map_err(backend_err)?;
        Ok(())
    }

    fn iter(&self) -> StorageResult<TreeIter<'_>> {
        let iter = self.tree.iter().map(|result| {
            result
                .map(|(k, v)| (k.to_vec(), v.to_vec()))
                .map_err(backend_err)
        });
        Ok(Box::new(iter))
    }

    fn flush(&self) -> StorageResult<()> {
        self.tree.flush().map_err(backend_err)?;
        Ok(())
    }
}

impl StorageDriver for SledDriver {
    type Tree = Box<dyn StorageTree>;

    fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let db = sled::open(path).map_err(backend_err)?;
        Ok(SledDriver { db })
    }

    fn open_tree(&self, name: &str) -> StorageResult<Self::Tree> {
        let tree = self.db.open_tree(name).map_err(backend_err)?;
        Ok(Box::new(SledTree { tree }) as Box<dyn StorageTree>)
    }

    fn flush(&self) -> StorageResult<()> {
        self.db.flush().map_err(backend_err)?;
        Ok(())
    }

    fn storage_type(&self) -> StorageType {
        StorageType::Sled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sled_tree_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        {
            let driver = SledDriver::open(temp_dir.path()).unwrap();
            let tree = driver.open_tree("records").unwrap();
            tree.insert(b"k", b"v").unwrap();
            driver.flush().unwrap();
        }

        let driver = SledDriver::open(temp_dir.path()).unwrap();
        let tree = driver.open_tree("records").unwrap();
        assert_eq!(tree.get(b"k").unwrap(), Some(b"v".to_vec()));
        assert_eq!(tree.iter().unwrap().count(), 1);
    }
}
