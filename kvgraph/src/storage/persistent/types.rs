// Copyright (c) 2024-2025 kvgraph Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Storage driver types and error handling
//!
//! Backend selection and the error type shared by every driver.

use serde::{Deserialize, Serialize};

/// Storage driver type configuration
///
/// Specifies which key-value backend holds graph records.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    /// Sled - Pure Rust embedded database
    /// Best for: graphs that must survive restarts or be shared between processes
    Sled,

    /// Memory - process-local storage
    /// Best for: unit testing, throwaway graphs
    Memory,
}

impl Default for StorageType {
    fn default() -> Self {
        StorageType::Sled
    }
}

impl std::str::FromStr for StorageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sled" => Ok(StorageType::Sled),
            "memory" => Ok(StorageType::Memory),
            _ => Err(format!(
                "Unknown storage type: {}. Valid options: sled, memory",
                s
            )),
        }
    }
}

impl std::fmt::Display for StorageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StorageType::Sled => "sled",
            StorageType::Memory => "memory",
        };
        write!(f, "{}", name)
    }
}

/// Error type for storage driver operations
///
/// Kept separate from graph errors so callers can tell a backend failure
/// (I/O, timeouts, corrupt files) apart from a validation or lookup failure.
#[derive(Debug)]
pub enum StorageDriverError {
    /// I/O related errors (file system, network, etc.)
    IoError(std::io::Error),

    /// Envelope serialization or deserialization failed
    SerializationError(String),

    /// The requested backend is not compiled into this build
    Unsupported(StorageType),

    /// Driver-specific error (Sled, etc.)
    BackendSpecific(String),
}

impl std::fmt::Display for StorageDriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageDriverError::IoError(e) => write!(f, "I/O error: {}", e),
            StorageDriverError::SerializationError(e) => write!(f, "Serialization error: {}", e),
            StorageDriverError::Unsupported(t) => {
                write!(f, "Storage backend '{}' is not available in this build", t)
            }
            StorageDriverError::BackendSpecific(e) => write!(f, "Storage driver error: {}", e),
        }
    }
}

impl std::error::Error for StorageDriverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageDriverError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageDriverError {
    fn from(e: std::io::Error) -> Self {
        StorageDriverError::IoError(e)
    }
}

impl From<bincode::Error> for StorageDriverError {
    fn from(e: bincode::Error) -> Self {
        StorageDriverError::SerializationError(e.to_string())
    }
}

/// Result type for storage driver operations
pub type StorageResult<T> = Result<T, StorageDriverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_type_from_str() {
        assert_eq!("sled".parse::<StorageType>().unwrap(), StorageType::Sled);
        assert_eq!("MEMORY".parse::<StorageType>().unwrap(), StorageType::Memory);
        assert!("rocksdb".parse::<StorageType>().is_err());
    }

    #[test]
    fn test_storage_type_display_round_trip() {
        for t in [StorageType::Sled, StorageType::Memory] {
            assert_eq!(t.to_string().parse::<StorageType>().unwrap(), t);
        }
    }
}
