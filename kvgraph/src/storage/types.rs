// Copyright (c) 2024-2025 kvgraph Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Record handles and error types
//!
//! Defines the opaque `Reference` handle used for every persisted record,
//! along with the error taxonomy of graph operations.

use crate::storage::persistent::StorageDriverError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Prefix of every reference allocated by this crate
pub const REFERENCE_PREFIX: &str = "kvgraph-";

/// Error types for graph operations
#[derive(Error, Debug)]
pub enum GraphError {
    /// Caller input was rejected: missing optimisation keys, a malformed
    /// filter operand, a non-positive TTL or a reserved field.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A non-silent lookup did not resolve
    #[error("Not found: {0}")]
    NotFound(String),

    /// Positional access past the end of a resolved working set
    #[error("Index error: {index} is out of bounds for {len} resolved nodes")]
    Index { index: usize, len: usize },

    /// The storage backend failed; nothing was retried
    #[error("Storage error: {0}")]
    Storage(#[from] StorageDriverError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}

impl GraphError {
    /// Create a validation error
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not-found error for a reference
    pub fn not_found(reference: &Reference) -> Self {
        Self::NotFound(format!("{} is not found", reference))
    }
}

/// Result type for graph operations
pub type GraphResult<T> = Result<T, GraphError>;

/// Opaque, stable handle of a persisted node or graph record.
///
/// Two references are equal iff they denote the same record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Reference(String);

impl Reference {
    /// Wrap an existing key
    pub fn new<S: Into<String>>(key: S) -> Self {
        Self(key.into())
    }

    /// Allocate a fresh, globally unique reference
    pub fn generate() -> Self {
        Self(format!(
            "{}{}",
            REFERENCE_PREFIX,
            uuid::Uuid::new_v4().simple()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Reference {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for Reference {
    fn from(key: String) -> Self {
        Self(key)
    }
}
