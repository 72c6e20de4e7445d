// Copyright (c) 2024-2025 kvgraph Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Graph nodes
//!
//! A [`GraphNode`] is a snapshot of one persisted record: its data, both
//! adjacency indexes and optional expiry. Mutators change the snapshot and
//! write it through to the store unless the caller passes `sync = false`, in
//! which case [`GraphNode::sync`] writes the batched changes later.

use super::ref_index::{KeySequence, OrderedRefIndex};
use crate::storage::store::{expiry_instant, Store};
use crate::storage::types::{GraphError, GraphResult, Reference};
use crate::storage::value::Value;
use chrono::{DateTime, Utc};
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Reserved field holding the graph-assigned node id
pub const NODE_ID_KEY: &str = "node_id";

/// Reserved field tagging special nodes
pub const NODE_TYPE_KEY: &str = "node_type";

/// `node_type` of a graph's entry node
pub const ENTRY_NODE_TYPE: &str = "entry node";

/// TTL of a node and the instant it was last set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Expiry {
    pub ttl: Duration,
    pub set_at: DateTime<Utc>,
}

impl Expiry {
    pub fn starting_now(ttl: Duration) -> Self {
        Self {
            ttl,
            set_at: Utc::now(),
        }
    }

    /// `ttl - elapsed`, floored at zero
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Duration {
        let elapsed = (now - self.set_at).to_std().unwrap_or(Duration::ZERO);
        self.ttl.saturating_sub(elapsed)
    }
}

/// Persisted form of a node. The store handle is reattached on load.
#[derive(Debug, Serialize, Deserialize)]
struct NodeRecord {
    reference: Reference,
    data: BTreeMap<String, Value>,
    incoming: Vec<KeySequence>,
    outgoing: Vec<KeySequence>,
    expiry: Option<Expiry>,
}

/// Snapshot of a persisted graph node
#[derive(Clone)]
pub struct GraphNode {
    reference: Reference,
    data: BTreeMap<String, Value>,
    incoming: OrderedRefIndex,
    outgoing: OrderedRefIndex,
    expiry: Option<Expiry>,
    store: Arc<dyn Store>,
}

impl GraphNode {
    /// Create and persist a node with id `node_id`.
    ///
    /// Fails if `data` already carries `node_id`, if `ttl` is zero or if it
    /// reaches past the last representable instant.
    pub fn create(
        store: Arc<dyn Store>,
        node_id: u64,
        mut data: BTreeMap<String, Value>,
        optimisation_keys: &[String],
        ttl: Option<Duration>,
    ) -> GraphResult<Self> {
        if data.contains_key(NODE_ID_KEY) {
            return Err(GraphError::validation(format!(
                "'{}' is assigned by the graph and cannot be supplied",
                NODE_ID_KEY
            )));
        }
        expiry_instant(ttl)?;

        data.insert(NODE_ID_KEY.to_string(), Value::from(node_id));

        let node = Self {
            reference: store.allocate_reference(),
            data,
            incoming: OrderedRefIndex::new(store.clone(), optimisation_keys),
            outgoing: OrderedRefIndex::new(store.clone(), optimisation_keys),
            expiry: ttl.map(Expiry::starting_now),
            store,
        };
        node.sync()?;

        debug!("Created node {} (id {})", node.reference, node_id);
        Ok(node)
    }

    /// Load a node snapshot; `None` if absent or expired
    pub fn load(store: &Arc<dyn Store>, reference: &Reference) -> GraphResult<Option<Self>> {
        let bytes = match store.get(reference)? {
            Some(bytes) => bytes,
            None => return Ok(None),
        };
        let record: NodeRecord = bincode::deserialize(&bytes)?;

        Ok(Some(Self {
            reference: record.reference,
            data: record.data,
            incoming: OrderedRefIndex::from_sequences(store.clone(), record.incoming),
            outgoing: OrderedRefIndex::from_sequences(store.clone(), record.outgoing),
            expiry: record.expiry,
            store: store.clone(),
        }))
    }

    /// Load a node snapshot, failing with `NotFound` if it does not resolve
    pub fn load_required(store: &Arc<dyn Store>, reference: &Reference) -> GraphResult<Self> {
        Self::load(store, reference)?.ok_or_else(|| GraphError::not_found(reference))
    }

    /// Write this snapshot through to the store.
    ///
    /// The record is stored with the node's remaining TTL. A node whose TTL
    /// has run out is deleted instead.
    pub fn sync(&self) -> GraphResult<()> {
        let ttl = self.remaining_ttl();
        if ttl == Some(Duration::ZERO) {
            debug!("Node {} has expired, removing it", self.reference);
            return self.store.delete(&self.reference);
        }

        let record = NodeRecord {
            reference: self.reference.clone(),
            data: self.data.clone(),
            incoming: self.incoming.sequences().to_vec(),
            outgoing: self.outgoing.sequences().to_vec(),
            expiry: self.expiry,
        };
        let bytes = bincode::serialize(&record)?;
        self.store.put(&self.reference, &bytes, ttl)?;

        trace!("Synced node {}", self.reference);
        Ok(())
    }

    /// Replace both indexes with the ones currently stored for this node.
    ///
    /// Data and expiry of the snapshot are kept. Index changes that were
    /// never synced are dropped. Nothing changes if the record is gone.
    pub fn refresh_indexes(&mut self) -> GraphResult<()> {
        if let Some(stored) = Self::load(&self.store, &self.reference)? {
            self.incoming = stored.incoming;
            self.outgoing = stored.outgoing;
        }
        Ok(())
    }

    pub fn reference(&self) -> &Reference {
        &self.reference
    }

    pub fn data(&self) -> &BTreeMap<String, Value> {
        &self.data
    }

    pub(crate) fn into_data(self) -> BTreeMap<String, Value> {
        self.data
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Value of `key`, `Null` when absent
    pub fn value_of(&self, key: &str) -> Value {
        self.data.get(key).cloned().unwrap_or(Value::Null)
    }

    pub fn node_id(&self) -> Option<u64> {
        self.data
            .get(NODE_ID_KEY)
            .and_then(Value::as_integer)
            .map(|id| id as u64)
    }

    pub fn is_entry(&self) -> bool {
        self.data.get(NODE_TYPE_KEY).and_then(Value::as_string) == Some(ENTRY_NODE_TYPE)
    }

    pub fn incoming(&self) -> &OrderedRefIndex {
        &self.incoming
    }

    pub fn outgoing(&self) -> &OrderedRefIndex {
        &self.outgoing
    }

    /// Register `key` on both indexes of this node only
    pub fn add_optimisation_key(&mut self, key: &str, sync: bool) -> GraphResult<()> {
        let added_in = self.incoming.add_optimisation_key(key);
        let added_out = self.outgoing.add_optimisation_key(key);
        if sync && (added_in || added_out) {
            self.sync()?;
        }
        Ok(())
    }

    /// Set `data[key]` and move this node to its new position in the
    /// outgoing index of every incoming neighbor.
    ///
    /// Neighbors are written back regardless of `sync`; `sync` only governs
    /// this node's own record.
    pub fn update_data<V: Into<Value>>(&mut self, key: &str, value: V, sync: bool) -> GraphResult<()> {
        if key == NODE_ID_KEY {
            return Err(GraphError::validation(format!(
                "'{}' is assigned by the graph and cannot be changed",
                NODE_ID_KEY
            )));
        }
        self.data.insert(key.to_string(), value.into());

        let mut neighbors: Vec<Reference> = Vec::new();
        for reference in self.incoming.default_references() {
            if !neighbors.contains(reference) {
                neighbors.push(reference.clone());
            }
        }

        for neighbor_ref in &neighbors {
            if *neighbor_ref == self.reference {
                let moved = Self::reposition(&mut self.outgoing, &self.reference, &self.data)?;
                trace!("Repositioned self-loop of {} ({} entries)", self.reference, moved);
                continue;
            }

            let mut neighbor = match Self::load(&self.store, neighbor_ref)? {
                Some(neighbor) => neighbor,
                None => {
                    debug!("Skipping stale incoming neighbor {}", neighbor_ref);
                    continue;
                }
            };
            Self::reposition(&mut neighbor.outgoing, &self.reference, &self.data)?;
            neighbor.sync()?;
        }

        if sync {
            self.sync()?;
        }
        Ok(())
    }

    /// Remove every occurrence of `reference` from `index` and insert it back
    /// as many times at its current position.
    fn reposition(
        index: &mut OrderedRefIndex,
        reference: &Reference,
        data: &BTreeMap<String, Value>,
    ) -> GraphResult<usize> {
        let mut occurrences = 0;
        while index.remove_reference(reference) {
            occurrences += 1;
        }
        for _ in 0..occurrences {
            index.insert_sorted(reference, data)?;
        }
        Ok(occurrences)
    }

    pub fn add_incoming(&mut self, node: &GraphNode, sync: bool) -> GraphResult<()> {
        self.incoming.add_reference(node)?;
        self.sync_if(sync)
    }

    pub fn add_outgoing(&mut self, node: &GraphNode, sync: bool) -> GraphResult<()> {
        self.outgoing.add_reference(node)?;
        self.sync_if(sync)
    }

    pub fn remove_incoming(&mut self, reference: &Reference, sync: bool) -> GraphResult<()> {
        self.incoming.remove_reference(reference);
        self.sync_if(sync)
    }

    pub fn remove_outgoing(&mut self, reference: &Reference, sync: bool) -> GraphResult<()> {
        self.outgoing.remove_reference(reference);
        self.sync_if(sync)
    }

    /// `None` for an immortal node, otherwise the time left (never negative)
    pub fn remaining_ttl(&self) -> Option<Duration> {
        self.expiry.map(|e| e.remaining_at(Utc::now()))
    }

    pub fn expiry(&self) -> Option<Expiry> {
        self.expiry
    }

    pub fn is_expired(&self) -> bool {
        self.remaining_ttl() == Some(Duration::ZERO)
    }

    /// Restart the expiry clock with `ttl` and re-persist
    pub fn set_ttl(&mut self, ttl: Duration) -> GraphResult<()> {
        expiry_instant(Some(ttl))?;
        self.expiry = Some(Expiry::starting_now(ttl));
        self.sync()
    }

    /// Human-readable dump of the node, its neighbors and its data
    pub fn describe(&self) -> GraphResult<String> {
        let mut out = format!(
            "## {}\nOUTGOING (by {key}): {}\nINCOMING (by {key}): {}\n",
            self.reference,
            Self::join_refs(&self.outgoing.get_all_nodes()?),
            Self::join_refs(&self.incoming.get_all_nodes()?),
            key = NODE_ID_KEY,
        );
        if let Some(ttl) = self.remaining_ttl() {
            out.push_str(&format!("TTL: {:.3}s\n", ttl.as_secs_f64()));
        }
        out.push_str("DATA:\n");
        for (key, value) in &self.data {
            out.push_str(&format!("  {}: {}\n", key, value));
        }
        Ok(out)
    }

    fn join_refs(nodes: &[GraphNode]) -> String {
        let refs: Vec<&str> = nodes.iter().map(|n| n.reference.as_str()).collect();
        format!("[{}]", refs.join(", "))
    }

    fn sync_if(&self, sync: bool) -> GraphResult<()> {
        if sync {
            self.sync()
        } else {
            Ok(())
        }
    }
}

impl std::fmt::Debug for GraphNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphNode")
            .field("reference", &self.reference)
            .field("data", &self.data)
            .field("incoming", &self.incoming)
            .field("outgoing", &self.outgoing)
            .field("expiry", &self.expiry)
            .finish_non_exhaustive()
    }
}

impl PartialEq for GraphNode {
    fn eq(&self, other: &Self) -> bool {
        self.reference == other.reference
    }
}
