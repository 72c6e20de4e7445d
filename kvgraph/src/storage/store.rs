// Copyright (c) 2024-2025 kvgraph Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Store - the key-value contract consumed by the graph layer
//!
//! The graph never talks to a driver directly. It goes through [`Store`],
//! which adds two things on top of a raw tree: reference allocation and
//! per-key expiry.
//!
//! [`KvStore`] implements the contract over any [`StorageTree`]. Each value is
//! wrapped in a [`StoredEntry`] envelope carrying its expiry instant; reads
//! treat an expired envelope as absent and delete it on the spot, so expiry is
//! discovered lazily, never by a background timer.

use crate::config::StoreConfig;
use crate::storage::persistent::{create_storage_driver, BoxedStorageDriver, StorageTree};
use crate::storage::types::{GraphError, GraphResult, Reference};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Narrow key-value interface the graph layer is written against.
///
/// Implementations must be safe to share between graphs; no operation may
/// block indefinitely, and backend failures surface as
/// [`GraphError::Storage`].
pub trait Store: Send + Sync {
    /// Store `value` under `key`, replacing any previous value.
    ///
    /// `ttl` of `None` stores the value without expiry. A zero TTL is a
    /// validation error, not a silent no-op.
    fn put(&self, key: &Reference, value: &[u8], ttl: Option<Duration>) -> GraphResult<Reference>;

    /// Fetch the value under `key`; `None` if absent or expired.
    fn get(&self, key: &Reference) -> GraphResult<Option<Vec<u8>>>;

    /// Remove `key`. Absence is not an error.
    fn delete(&self, key: &Reference) -> GraphResult<()>;

    /// Allocate a key no other record uses
    fn allocate_reference(&self) -> Reference {
        Reference::generate()
    }

    /// Non-silent lookup: fails with [`GraphError::NotFound`] when absent
    fn get_required(&self, key: &Reference) -> GraphResult<Vec<u8>> {
        self.get(key)?.ok_or_else(|| GraphError::not_found(key))
    }

    /// Make previous writes durable
    fn flush(&self) -> GraphResult<()> {
        Ok(())
    }
}

/// Envelope written for every value
#[derive(Serialize, Deserialize, Debug)]
pub struct StoredEntry {
    pub expires_at: Option<DateTime<Utc>>,
    pub payload: Vec<u8>,
}

impl StoredEntry {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(false, |at| at <= now)
    }
}

/// Check a TTL and turn it into an absolute expiry instant
pub fn expiry_instant(ttl: Option<Duration>) -> GraphResult<Option<DateTime<Utc>>> {
    match ttl {
        None => Ok(None),
        Some(ttl) if ttl.is_zero() => Err(GraphError::validation("TTL must be positive")),
        Some(ttl) => {
            let delta = chrono::Duration::from_std(ttl)
                .map_err(|e| GraphError::validation(format!("TTL out of range: {}", e)))?;
            Utc::now()
                .checked_add_signed(delta)
                .map(Some)
                .ok_or_else(|| GraphError::validation(format!("TTL out of range: {:?}", ttl)))
        }
    }
}

/// [`Store`] implementation over a storage driver tree
pub struct KvStore {
    tree: Box<dyn StorageTree>,

    /// Driver that owns `tree`, when this store opened it
    driver: Option<Arc<BoxedStorageDriver>>,
}

impl KvStore {
    /// Wrap an already opened tree
    pub fn new(tree: Box<dyn StorageTree>) -> Self {
        Self { tree, driver: None }
    }

    /// Open the driver and tree described by `config`
    pub fn open(config: &StoreConfig) -> GraphResult<Self> {
        info!(
            "Opening {} store at {:?} (tree '{}')",
            config.storage_type, config.path, config.tree_name
        );
        let driver = create_storage_driver(config.storage_type, &config.path)?;
        let tree = driver.open_tree(&config.tree_name)?;

        Ok(Self {
            tree,
            driver: Some(Arc::new(driver)),
        })
    }

    /// Store backed by a fresh process-local tree
    pub fn in_memory() -> GraphResult<Self> {
        Self::open(&StoreConfig::memory())
    }

    /// Delete every expired entry and return how many were evicted
    pub fn purge_expired(&self) -> GraphResult<usize> {
        let now = Utc::now();
        let mut expired = Vec::new();

        for item in self.tree.iter()? {
            let (key, data) = item?;
            match bincode::deserialize::<StoredEntry>(&data) {
                Ok(entry) if entry.is_expired_at(now) => expired.push(key),
                Ok(_) => {}
                Err(e) => {
                    warn!(
                        "Skipping undecodable entry '{}': {}",
                        String::from_utf8_lossy(&key),
                        e
                    );
                }
            }
        }

        for key in &expired {
            self.tree.remove(key)?;
        }

        debug!("Purged {} expired entries", expired.len());
        Ok(expired.len())
    }
}

impl Store for KvStore {
    fn put(&self, key: &Reference, value: &[u8], ttl: Option<Duration>) -> GraphResult<Reference> {
        let entry = StoredEntry {
            expires_at: expiry_instant(ttl)?,
            payload: value.to_vec(),
        };
        let data = bincode::serialize(&entry)?;
        self.tree.insert(key.as_bytes(), &data)?;
        Ok(key.clone())
    }

    fn get(&self, key: &Reference) -> GraphResult<Option<Vec<u8>>> {
        let data = match self.tree.get(key.as_bytes())? {
            Some(data) => data,
            None => return Ok(None),
        };

        let entry: StoredEntry = bincode::deserialize(&data)?;
        if entry.is_expired_at(Utc::now()) {
            debug!("Entry '{}' has expired, evicting", key);
            self.tree.remove(key.as_bytes())?;
            return Ok(None);
        }

        Ok(Some(entry.payload))
    }

    fn delete(&self, key: &Reference) -> GraphResult<()> {
        self.tree.remove(key.as_bytes())?;
        Ok(())
    }

    fn flush(&self) -> GraphResult<()> {
        self.tree.flush()?;
        if let Some(driver) = &self.driver {
            driver.flush()?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for KvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvStore")
            .field(
                "storage_type",
                &self.driver.as_ref().map(|d| d.storage_type()),
            )
            .finish_non_exhaustive()
    }
}

/// Open the store described by `config` as a shareable handle
pub fn open_store(config: &StoreConfig) -> GraphResult<Arc<dyn Store>> {
    Ok(Arc::new(KvStore::open(config)?))
}
