// Copyright (c) 2024-2025 kvgraph Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Storage layer for graph records
//!
//! This module provides:
//! - Value type system for node data
//! - Reference handles and the error taxonomy
//! - The `Store` contract and its key-value implementation with expiry
//! - Pluggable storage driver trait for different KV backends

pub mod persistent;
pub mod store;
pub mod types;
pub mod value;

pub use persistent::{StorageDriver, StorageTree, StorageType};
pub use store::{open_store, KvStore, Store};
pub use types::{GraphError, GraphResult, Reference};
pub use value::Value;
