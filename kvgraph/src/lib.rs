// Copyright (c) 2024-2025 kvgraph Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! kvgraph - A directed graph persisted in a key-value store
//!
//! Nodes and edges live in a key-value store rather than in process memory,
//! so a graph can be shared between processes, survive restarts and give
//! individual nodes a time to live.
//!
//! # Features
//!
//! - **Ordered adjacency**: incoming and outgoing neighbors of every node are
//!   kept sorted by one or more numeric optimisation keys
//! - **Query chaining**: sort and filter neighbor sets with a fluent builder
//! - **Expiry**: per-node TTL, expired neighbors are dropped lazily
//! - **Pluggable storage**: Sled on disk or an in-memory map
//!
//! # Usage
//!
//! ```ignore
//! use kvgraph::{open_store, Graph, StoreConfig, Value};
//! use std::collections::BTreeMap;
//!
//! let store = open_store(&StoreConfig::sled("./graphdb"))?;
//! let mut graph = Graph::with_optimisation_keys(store, ["score"])?;
//!
//! let mut a = graph.add_vertex(BTreeMap::from([("score".into(), Value::from(3))]))?;
//! let mut b = graph.add_vertex(BTreeMap::from([("score".into(), Value::from(8))]))?;
//! graph.add_edge(&mut a, &mut b)?;
//!
//! let best = a.outgoing().sort_by("score").get_all_nodes()?;
//! ```

pub mod config;
pub mod graph;
pub mod storage;

pub use config::{GraphConfig, StoreConfig};
pub use graph::{
    Expiry, Filter, Graph, GraphNode, OrderedRefIndex, RefQuery, ENTRY_NODE_TYPE, NODE_ID_KEY,
    NODE_TYPE_KEY,
};
pub use storage::{
    open_store, GraphError, GraphResult, KvStore, Reference, StorageType, Store, Value,
};

/// kvgraph version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// kvgraph crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
