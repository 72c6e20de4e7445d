// Copyright (c) 2024-2025 kvgraph Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Persistent storage backends
//!
//! Trait-based abstractions for raw key-value storage, so the graph layer can
//! run on Sled or on a process-local map interchangeably.
//!
//! # Architecture
//!
//! ```text
//! Graph / GraphNode (records, adjacency indexes)
//!     ↓
//! KvStore (references, expiry envelope)
//!     ↓
//! StorageDriver (key-value abstraction)
//!     ↓
//! Concrete Implementations (Sled, Memory)
//! ```

pub mod factory;
pub mod memory;
#[cfg(feature = "sled-backend")]
pub mod sled;
pub mod traits;
pub mod types;

pub use factory::{create_storage_driver, BoxedStorageDriver};
pub use traits::{StorageDriver, StorageTree};
pub use types::{StorageDriverError, StorageResult, StorageType};
