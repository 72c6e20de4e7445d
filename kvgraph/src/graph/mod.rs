// Copyright (c) 2024-2025 kvgraph Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Directed graph persisted in a key-value store
//!
//! A [`Graph`] owns the list of optimisation keys every vertex must supply,
//! an entry node, and the counter that hands out `node_id`s. Its record is
//! stored next to the node records so a graph can be reopened with
//! [`Graph::load`] from any process sharing the store.
//!
//! # Concurrency
//!
//! Nodes are snapshots. Each mutation is a read-modify-write of a whole record
//! with no version check, so concurrent writers to the same node race and the
//! last write wins. Keep a single writer per node.

pub mod filter;
pub mod node;
pub mod ref_index;

pub use filter::Filter;
pub use node::{Expiry, GraphNode, ENTRY_NODE_TYPE, NODE_ID_KEY, NODE_TYPE_KEY};
pub use ref_index::{KeySequence, OrderedRefIndex, RefQuery};

use crate::config::GraphConfig;
use crate::storage::store::Store;
use crate::storage::types::{GraphError, GraphResult, Reference};
use crate::storage::value::Value;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

/// Persisted form of a graph
#[derive(Debug, Serialize, Deserialize)]
struct GraphRecord {
    reference: Reference,
    optimisation_keys: Vec<String>,
    entry: Reference,
    next_id: u64,
    default_node_ttl: Option<Duration>,
}

/// Directed graph with ordered adjacency indexes
pub struct Graph {
    reference: Reference,
    optimisation_keys: Vec<String>,
    entry: GraphNode,
    next_id: u64,
    default_node_ttl: Option<Duration>,
    store: Arc<dyn Store>,
}

impl Graph {
    /// New graph ordered by `node_id` only
    pub fn new(store: Arc<dyn Store>) -> GraphResult<Self> {
        Self::with_config(store, &GraphConfig::default())
    }

    /// New graph ordered by `node_id` and then `keys`
    pub fn with_optimisation_keys<I, S>(store: Arc<dyn Store>, keys: I) -> GraphResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_config(store, &GraphConfig::with_keys(keys))
    }

    /// New graph from `config`: creates the entry node and persists both
    pub fn with_config(store: Arc<dyn Store>, config: &GraphConfig) -> GraphResult<Self> {
        config.validate()?;
        let optimisation_keys = config.all_keys();

        let mut entry_data = BTreeMap::new();
        entry_data.insert(NODE_TYPE_KEY.to_string(), Value::from(ENTRY_NODE_TYPE));
        for key in optimisation_keys.iter().skip(1) {
            entry_data.insert(key.clone(), Value::from(0));
        }
        let entry = GraphNode::create(store.clone(), 0, entry_data, &optimisation_keys, None)?;

        let graph = Self {
            reference: store.allocate_reference(),
            optimisation_keys,
            entry,
            next_id: 1,
            default_node_ttl: config.default_node_ttl,
            store,
        };
        graph.persist()?;

        info!(
            "Created graph {} with optimisation keys {:?}",
            graph.reference, graph.optimisation_keys
        );
        Ok(graph)
    }

    /// Reopen a persisted graph
    pub fn load(store: Arc<dyn Store>, reference: &Reference) -> GraphResult<Self> {
        let bytes = store.get_required(reference)?;
        let record: GraphRecord = bincode::deserialize(&bytes)?;
        let entry = GraphNode::load_required(&store, &record.entry)?;

        debug!("Loaded graph {} (next id {})", record.reference, record.next_id);
        Ok(Self {
            reference: record.reference,
            optimisation_keys: record.optimisation_keys,
            entry,
            next_id: record.next_id,
            default_node_ttl: record.default_node_ttl,
            store,
        })
    }

    fn persist(&self) -> GraphResult<()> {
        let record = GraphRecord {
            reference: self.reference.clone(),
            optimisation_keys: self.optimisation_keys.clone(),
            entry: self.entry.reference().clone(),
            next_id: self.next_id,
            default_node_ttl: self.default_node_ttl,
        };
        let bytes = bincode::serialize(&record)?;
        self.store.put(&self.reference, &bytes, None)?;
        Ok(())
    }

    pub fn reference(&self) -> &Reference {
        &self.reference
    }

    pub fn optimisation_keys(&self) -> &[String] {
        &self.optimisation_keys
    }

    pub fn entry(&self) -> &GraphNode {
        &self.entry
    }

    /// Re-read the entry node, picking up edges wired through other snapshots
    pub fn refresh_entry(&mut self) -> GraphResult<&GraphNode> {
        self.entry = GraphNode::load_required(&self.store, self.entry.reference())?;
        Ok(&self.entry)
    }

    /// Id the next vertex will receive
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Load any node of the store
    pub fn get_node(&self, reference: &Reference) -> GraphResult<GraphNode> {
        GraphNode::load_required(&self.store, reference)
    }

    /// Add a vertex with the graph's default TTL
    pub fn add_vertex(&mut self, data: BTreeMap<String, Value>) -> GraphResult<GraphNode> {
        self.add_vertex_with_ttl(data, self.default_node_ttl)
    }

    /// Add a vertex expiring after `ttl` (`None` for immortal).
    ///
    /// Every optimisation key except `node_id` must be present in `data`.
    pub fn add_vertex_with_ttl(
        &mut self,
        data: BTreeMap<String, Value>,
        ttl: Option<Duration>,
    ) -> GraphResult<GraphNode> {
        let missing: Vec<&str> = self
            .optimisation_keys
            .iter()
            .skip(1)
            .filter(|key| !data.contains_key(key.as_str()))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(GraphError::validation(format!(
                "Optimisation keys missing in data: {}",
                missing.join(", ")
            )));
        }

        let node = GraphNode::create(
            self.store.clone(),
            self.next_id,
            data,
            &self.optimisation_keys,
            ttl,
        )?;
        self.next_id += 1;
        self.persist()?;

        Ok(node)
    }

    /// Add the edge `from -> to`.
    ///
    /// Not idempotent: adding the same edge twice stores it twice. Both
    /// snapshots first take the stored indexes, so orderings written by
    /// other snapshots survive. When both are the same node, `to` is
    /// refreshed from `from`.
    pub fn add_edge(&self, from: &mut GraphNode, to: &mut GraphNode) -> GraphResult<()> {
        from.refresh_indexes()?;
        if from.reference() == to.reference() {
            let target = from.clone();
            from.add_outgoing(&target, false)?;
            let source = from.clone();
            from.add_incoming(&source, true)?;
            *to = from.clone();
        } else {
            to.refresh_indexes()?;
            from.add_outgoing(to, true)?;
            to.add_incoming(from, true)?;
        }

        debug!("Added edge {} -> {}", from.reference(), to.reference());
        Ok(())
    }

    /// Remove one `from -> to` edge, starting from the stored indexes
    pub fn remove_edge(&self, from: &mut GraphNode, to: &mut GraphNode) -> GraphResult<()> {
        from.refresh_indexes()?;
        if from.reference() == to.reference() {
            let reference = from.reference().clone();
            from.remove_outgoing(&reference, false)?;
            from.remove_incoming(&reference, true)?;
            *to = from.clone();
        } else {
            to.refresh_indexes()?;
            from.remove_outgoing(to.reference(), true)?;
            to.remove_incoming(from.reference(), true)?;
        }

        debug!("Removed edge {} -> {}", from.reference(), to.reference());
        Ok(())
    }

    /// Append `key` to the graph's optimisation keys.
    ///
    /// Only the entry node's indexes get the new sequence; other nodes keep
    /// their keys. The entry node gets a `0` value if it has none.
    pub fn optimise_for(&mut self, key: &str) -> GraphResult<()> {
        if key.is_empty() {
            return Err(GraphError::validation("Optimisation key must not be empty"));
        }
        if self.optimisation_keys.iter().any(|k| k == key) {
            debug!("Graph {} already optimised for '{}'", self.reference, key);
            return Ok(());
        }

        self.refresh_entry()?;
        self.optimisation_keys.push(key.to_string());
        self.entry.add_optimisation_key(key, false)?;
        if self.entry.get(key).is_none() {
            self.entry.update_data(key, 0, false)?;
        }
        self.entry.sync()?;
        self.persist()?;

        info!("Graph {} now optimised for '{}'", self.reference, key);
        Ok(())
    }

    /// Depth-first traversal from `start` (the stored entry node if `None`)
    pub fn traverse(&self, start: Option<&GraphNode>) -> GraphResult<Vec<GraphNode>> {
        let mut visited = Vec::new();
        self.traverse_with(start, |node| {
            visited.push(node.clone());
            Ok(())
        })?;
        Ok(visited)
    }

    /// Depth-first traversal calling `visit` once per reachable node.
    ///
    /// Uses an explicit stack: neighbors are pushed in default key order, so
    /// they are visited last-discovered first. Stale neighbors are skipped.
    pub fn traverse_with<F>(&self, start: Option<&GraphNode>, mut visit: F) -> GraphResult<usize>
    where
        F: FnMut(&GraphNode) -> GraphResult<()>,
    {
        let start = match start {
            Some(node) => node.clone(),
            None => GraphNode::load_required(&self.store, self.entry.reference())?,
        };
        let mut stack = vec![start];
        let mut reached: HashSet<Reference> = HashSet::new();

        while let Some(node) = stack.pop() {
            if !reached.insert(node.reference().clone()) {
                continue;
            }

            info!("Visiting node {} {:?}", node.reference(), node.data());
            visit(&node)?;

            stack.extend(node.outgoing().get_all_nodes()?);
        }

        Ok(reached.len())
    }
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("reference", &self.reference)
            .field("optimisation_keys", &self.optimisation_keys)
            .field("entry", self.entry.reference())
            .field("next_id", &self.next_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::store::KvStore;

    fn store() -> Arc<dyn Store> {
        Arc::new(KvStore::in_memory().unwrap())
    }

    fn data(pairs: &[(&str, i64)]) -> BTreeMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::from(*v)))
            .collect()
    }

    #[test]
    fn test_new_graph_has_entry_node() {
        let graph = Graph::with_optimisation_keys(store(), ["score"]).unwrap();
        assert_eq!(graph.optimisation_keys(), &["node_id", "score"]);
        assert!(graph.entry().is_entry());
        assert_eq!(graph.entry().node_id(), Some(0));
        assert_eq!(graph.entry().get("score"), Some(&Value::from(0)));
        assert_eq!(graph.next_id(), 1);
    }

    #[test]
    fn test_add_vertex_reports_missing_keys() {
        let mut graph = Graph::with_optimisation_keys(store(), ["score", "age"]).unwrap();
        let err = graph.add_vertex(data(&[("age", 3)])).unwrap_err();
        match err {
            GraphError::Validation(msg) => {
                assert!(msg.contains("score"));
                assert!(!msg.contains("age"));
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(graph.next_id(), 1);
    }

    #[test]
    fn test_ids_increase_per_graph() {
        let store = store();
        let mut first = Graph::new(store.clone()).unwrap();
        let mut second = Graph::new(store).unwrap();

        assert_eq!(first.add_vertex(BTreeMap::new()).unwrap().node_id(), Some(1));
        assert_eq!(first.add_vertex(BTreeMap::new()).unwrap().node_id(), Some(2));
        assert_eq!(second.add_vertex(BTreeMap::new()).unwrap().node_id(), Some(1));
    }

    #[test]
    fn test_add_and_remove_edge() {
        let mut graph = Graph::new(store()).unwrap();
        let mut a = graph.add_vertex(BTreeMap::new()).unwrap();
        let mut b = graph.add_vertex(BTreeMap::new()).unwrap();

        graph.add_edge(&mut a, &mut b).unwrap();
        graph.add_edge(&mut a, &mut b).unwrap();
        assert_eq!(graph.get_node(a.reference()).unwrap().outgoing().len(), 2);
        assert_eq!(graph.get_node(b.reference()).unwrap().incoming().len(), 2);

        graph.remove_edge(&mut a, &mut b).unwrap();
        assert_eq!(graph.get_node(a.reference()).unwrap().outgoing().len(), 1);
        assert_eq!(graph.get_node(b.reference()).unwrap().incoming().len(), 1);
    }

    #[test]
    fn test_add_edge_keeps_order_written_by_update_data() {
        let mut graph = Graph::with_optimisation_keys(store(), ["score"]).unwrap();
        let mut a = graph.add_vertex(data(&[("score", 0)])).unwrap();
        let mut b = graph.add_vertex(data(&[("score", 10)])).unwrap();
        let mut c = graph.add_vertex(data(&[("score", 4)])).unwrap();
        let mut d = graph.add_vertex(data(&[("score", 20)])).unwrap();
        graph.add_edge(&mut a, &mut b).unwrap();
        graph.add_edge(&mut a, &mut c).unwrap();

        b.update_data("score", 1, true).unwrap();
        graph.add_edge(&mut a, &mut d).unwrap();

        let expected = vec![
            b.reference().clone(),
            c.reference().clone(),
            d.reference().clone(),
        ];
        assert_eq!(a.outgoing().sort_by("score").into_references(), expected);
        let stored = graph.get_node(a.reference()).unwrap();
        assert_eq!(stored.outgoing().sort_by("score").into_references(), expected);
    }

    #[test]
    fn test_self_loop_edge() {
        let mut graph = Graph::new(store()).unwrap();
        let mut a = graph.add_vertex(BTreeMap::new()).unwrap();
        let mut same = graph.get_node(a.reference()).unwrap();

        graph.add_edge(&mut a, &mut same).unwrap();
        let stored = graph.get_node(a.reference()).unwrap();
        assert!(stored.outgoing().contains(a.reference()));
        assert!(stored.incoming().contains(a.reference()));
        assert!(same.outgoing().contains(a.reference()));
    }

    #[test]
    fn test_optimise_for_touches_entry_only() {
        let mut graph = Graph::new(store()).unwrap();
        let vertex = graph.add_vertex(BTreeMap::new()).unwrap();

        graph.optimise_for("rank").unwrap();
        graph.optimise_for("rank").unwrap();

        assert_eq!(graph.optimisation_keys(), &["node_id", "rank"]);
        let entry = graph.get_node(graph.entry().reference()).unwrap();
        assert!(entry.outgoing().has_key("rank"));
        assert_eq!(entry.get("rank"), Some(&Value::from(0)));

        let vertex = graph.get_node(vertex.reference()).unwrap();
        assert!(!vertex.outgoing().has_key("rank"));
    }

    #[test]
    fn test_traverse_visits_each_node_once() {
        let mut graph = Graph::new(store()).unwrap();
        let mut a = graph.add_vertex(BTreeMap::new()).unwrap();
        let mut b = graph.add_vertex(BTreeMap::new()).unwrap();
        let mut c = graph.add_vertex(BTreeMap::new()).unwrap();

        let mut entry = graph.entry().clone();
        graph.add_edge(&mut entry, &mut a).unwrap();
        graph.add_edge(&mut entry, &mut b).unwrap();
        graph.add_edge(&mut a, &mut c).unwrap();
        graph.add_edge(&mut b, &mut c).unwrap();
        graph.add_edge(&mut c, &mut a).unwrap();

        let entry = graph.get_node(entry.reference()).unwrap();
        let order: Vec<u64> = graph
            .traverse(Some(&entry))
            .unwrap()
            .iter()
            .filter_map(GraphNode::node_id)
            .collect();

        // LIFO: b (pushed last) is explored before a
        assert_eq!(order, vec![0, 2, 3, 1]);
    }
}
