// Copyright (c) 2024-2025 kvgraph Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Storage driver traits
//!
//! A driver opens a database and hands out named trees; a tree is a flat
//! byte-keyed map. `KvStore` needs nothing more than point reads and writes,
//! a full scan for expiry sweeps and a flush.

use super::types::{StorageResult, StorageType};
use std::path::Path;

/// Iterator over raw key-value pairs of a tree
pub type TreeIter<'a> = Box<dyn Iterator<Item = StorageResult<(Vec<u8>, Vec<u8>)>> + 'a>;

/// Named key-value map inside a driver
pub trait StorageTree: Send + Sync {
    /// Insert or overwrite
    fn insert(&self, key: &[u8], value: &[u8]) -> StorageResult<()>;

    /// Get a value by key
    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>>;

    /// Remove a key; absence is not an error
    fn remove(&self, key: &[u8]) -> StorageResult<()>;

    /// Scan every pair. Order is backend-defined.
    fn iter(&self) -> StorageResult<TreeIter<'_>>;

    /// Flush any pending writes to disk
    fn flush(&self) -> StorageResult<()>;
}

/// Backend that opens databases and hands out named trees
pub trait StorageDriver: Send + Sync {
    type Tree: StorageTree;

    /// Open or create a storage driver at the given path
    fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self>
    where
        Self: Sized;

    /// Open or create a named tree
    fn open_tree(&self, name: &str) -> StorageResult<Self::Tree>;

    /// Flush all pending writes to disk
    fn flush(&self) -> StorageResult<()>;

    fn storage_type(&self) -> StorageType;
}

// Lets a boxed tree stand in wherever a concrete tree is expected
impl StorageTree for Box<dyn StorageTree> {
    fn insert(&self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        (**self).insert(key, value)
    }

    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn remove(&self, key: &[u8]) -> StorageResult<()> {
        (**self).remove(key)
    }

    fn iter(&self) -> StorageResult<TreeIter<'_>> {
        (**self).iter()
    }

    fn flush(&self) -> StorageResult<()> {
        (**self).flush()
    }
}
