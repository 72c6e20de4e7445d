// Copyright (c) 2024-2025 kvgraph Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Storage driver factory
//!
//! Creates a storage driver from a backend type and a path.

use super::traits::{StorageDriver, StorageTree};
use super::types::{StorageResult, StorageType};
use std::path::Path;

/// Boxed driver whose trees are boxed as well
pub type BoxedStorageDriver = Box<dyn StorageDriver<Tree = Box<dyn StorageTree>>>;

/// Factory function to create a storage driver based on configuration
///
/// # Arguments
/// * `storage_type` - The type of storage driver to create
/// * `path` - Where the database lives on disk (ignored by the memory driver)
///
/// # Examples
/// ```ignore
/// let driver = create_storage_driver(StorageType::Sled, "./data")?;
/// let tree = driver.open_tree("kvgraph")?;
/// ```
pub fn create_storage_driver<P: AsRef<Path>>(
    storage_type: StorageType,
    path: P,
) -> StorageResult<BoxedStorageDriver> {
    match storage_type {
        #[cfg(feature = "sled-backend")]
        StorageType::Sled => {
            use crate::storage::persistent::sled::SledDriver;
            let driver = SledDriver::open(path)?;
            Ok(Box::new(driver) as BoxedStorageDriver)
        }
        #[cfg(not(feature = "sled-backend"))]
        StorageType::Sled => {
            let _ = path;
            Err(super::types::StorageDriverError::Unsupported(StorageType::Sled))
        }
        StorageType::Memory => {
            use crate::storage::persistent::memory::MemoryStorageDriver;
            let driver = MemoryStorageDriver::open(path)?;
            Ok(Box::new(driver) as BoxedStorageDriver)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[cfg(feature = "sled-backend")]
    #[test]
    fn test_create_sled_driver() {
        let temp_dir = TempDir::new().unwrap();
        let driver = create_storage_driver(StorageType::Sled, temp_dir.path()).unwrap();
        assert_eq!(driver.storage_type(), StorageType::Sled);
    }

    #[test]
    fn test_create_memory_driver() {
        let temp_dir = TempDir::new().unwrap();
        let driver = create_storage_driver(StorageType::Memory, temp_dir.path()).unwrap();
        assert_eq!(driver.storage_type(), StorageType::Memory);
    }
}
