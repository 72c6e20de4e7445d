// Copyright (c) 2024-2025 kvgraph Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Ordered adjacency index
//!
//! An [`OrderedRefIndex`] keeps one reference sequence per optimisation key,
//! each sorted ascending by the referenced node's value for that key. Only
//! references are stored; values are read back through the [`Store`] when an
//! insertion position is computed or a query is resolved.
//!
//! References whose node has expired stay in the sequences. They are skipped
//! while searching for an insertion point and dropped from query results, but
//! never removed eagerly.
//!
//! Queries go through [`RefQuery`], a single-use builder:
//!
//! ```ignore
//! let top = node
//!     .outgoing()
//!     .filter_by("score", &Filter::Range(1.0, 5.0))?
//!     .sort_by("age")
//!     .get_all_nodes()?;
//! ```

use super::filter::Filter;
use super::node::GraphNode;
use crate::storage::store::Store;
use crate::storage::types::{GraphError, GraphResult, Reference};
use crate::storage::value::Value;
use log::debug;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

/// References sorted by one optimisation key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeySequence {
    pub key: String,
    pub refs: Vec<Reference>,
}

impl KeySequence {
    fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            refs: Vec::new(),
        }
    }
}

/// Per-node adjacency index, one sorted sequence per optimisation key.
///
/// The first registered key is the default ordering used when a query does
/// not name one.
#[derive(Clone)]
pub struct OrderedRefIndex {
    sequences: Vec<KeySequence>,
    store: Arc<dyn Store>,
}

impl OrderedRefIndex {
    /// Empty index with a sequence for each key
    pub fn new(store: Arc<dyn Store>, keys: &[String]) -> Self {
        let mut index = Self {
            sequences: Vec::with_capacity(keys.len()),
            store,
        };
        for key in keys {
            index.add_optimisation_key(key);
        }
        index
    }

    /// Rebuild an index from persisted sequences
    pub(crate) fn from_sequences(store: Arc<dyn Store>, sequences: Vec<KeySequence>) -> Self {
        Self { sequences, store }
    }

    pub(crate) fn sequences(&self) -> &[KeySequence] {
        &self.sequences
    }

    /// Registered keys in registration order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.sequences.iter().map(|s| s.key.as_str())
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.sequences.iter().any(|s| s.key == key)
    }

    /// Register an empty sequence for `key`.
    ///
    /// References already in the index are not backfilled into it. Returns
    /// `false` if the key was already registered.
    pub fn add_optimisation_key(&mut self, key: &str) -> bool {
        if self.has_key(key) {
            return false;
        }
        self.sequences.push(KeySequence::new(key));
        true
    }

    /// Sequence for `key`, if registered
    pub fn references(&self, key: &str) -> Option<&[Reference]> {
        self.sequences
            .iter()
            .find(|s| s.key == key)
            .map(|s| s.refs.as_slice())
    }

    /// Sequence for the default key
    pub fn default_references(&self) -> &[Reference] {
        self.sequences
            .first()
            .map(|s| s.refs.as_slice())
            .unwrap_or(&[])
    }

    /// Number of stored references, stale ones included
    pub fn len(&self) -> usize {
        self.default_references().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, reference: &Reference) -> bool {
        self.default_references().contains(reference)
    }

    /// Insert `node` into every sequence at its sorted position
    pub fn add_reference(&mut self, node: &GraphNode) -> GraphResult<()> {
        self.insert_sorted(node.reference(), node.data())
    }

    /// Insert `reference`, whose data is `data`, into every sequence.
    ///
    /// The position is the first live entry whose current value is greater
    /// than the new one, so equal values keep arrival order. A missing value
    /// sorts as `Null`.
    ///
    /// Sequences are updated one key at a time. A storage error while
    /// resolving neighbors leaves the earlier sequences updated and the rest
    /// untouched, with no rollback.
    pub(crate) fn insert_sorted(
        &mut self,
        reference: &Reference,
        data: &BTreeMap<String, Value>,
    ) -> GraphResult<()> {
        let mut resolved: HashMap<Reference, Option<BTreeMap<String, Value>>> = HashMap::new();

        for seq in self.sequences.iter_mut() {
            let new_value = data.get(&seq.key).cloned().unwrap_or(Value::Null);

            // (position in sequence, current value) of every live neighbor
            let mut live = Vec::with_capacity(seq.refs.len());
            for (pos, neighbor) in seq.refs.iter().enumerate() {
                if !resolved.contains_key(neighbor) {
                    let loaded = GraphNode::load(&self.store, neighbor)?.map(GraphNode::into_data);
                    resolved.insert(neighbor.clone(), loaded);
                }
                if let Some(Some(neighbor_data)) = resolved.get(neighbor) {
                    let value = neighbor_data.get(&seq.key).cloned().unwrap_or(Value::Null);
                    live.push((pos, value));
                }
            }

            let after = live.partition_point(|(_, v)| v.sort_cmp(&new_value) != Ordering::Greater);
            let at = live.get(after).map_or(seq.refs.len(), |(pos, _)| *pos);
            seq.refs.insert(at, reference.clone());
        }

        Ok(())
    }

    /// Remove the first occurrence of `reference` from every sequence.
    ///
    /// Returns `false` if it was in none of them.
    pub fn remove_reference(&mut self, reference: &Reference) -> bool {
        let mut removed = false;
        for seq in self.sequences.iter_mut() {
            if let Some(pos) = seq.refs.iter().position(|r| r == reference) {
                seq.refs.remove(pos);
                removed = true;
            }
        }
        removed
    }

    /// Start a query over this index
    pub fn query(&self) -> RefQuery<'_> {
        RefQuery {
            index: self,
            working: None,
            resolved: HashMap::new(),
        }
    }

    /// Shorthand for `query().sort_by(key)`
    pub fn sort_by(&self, key: &str) -> RefQuery<'_> {
        self.query().sort_by(key)
    }

    /// Shorthand for `query().filter_by(key, filter)`
    pub fn filter_by(&self, key: &str, filter: &Filter) -> GraphResult<RefQuery<'_>> {
        self.query().filter_by(key, filter)
    }

    /// Live neighbors in default key order
    pub fn get_all_nodes(&self) -> GraphResult<Vec<GraphNode>> {
        self.query().get_all_nodes()
    }

    pub fn get_node_indexed_at(&self, index: usize) -> GraphResult<GraphNode> {
        self.query().get_node_indexed_at(index)
    }
}

impl std::fmt::Debug for OrderedRefIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderedRefIndex")
            .field("sequences", &self.sequences)
            .finish_non_exhaustive()
    }
}

/// Single-use query over an [`OrderedRefIndex`].
///
/// Holds the working set of references between chained calls. Terminal
/// operations consume the query.
pub struct RefQuery<'a> {
    index: &'a OrderedRefIndex,
    working: Option<Vec<Reference>>,
    resolved: HashMap<Reference, GraphNode>,
}

impl<'a> RefQuery<'a> {
    /// Order by `key`.
    ///
    /// The first call takes the key's whole sequence (empty for an unknown
    /// key); later calls keep only references already in the working set, in
    /// the key's order.
    pub fn sort_by(mut self, key: &str) -> Self {
        let sequence = self.index.references(key).unwrap_or(&[]);
        let next = match self.working.take() {
            None => sequence.to_vec(),
            Some(current) => {
                let keep: HashSet<&Reference> = current.iter().collect();
                sequence
                    .iter()
                    .filter(|r| keep.contains(r))
                    .cloned()
                    .collect()
            }
        };
        self.working = Some(next);
        self
    }

    /// Keep live nodes whose `key` value satisfies `filter`
    pub fn filter_by(mut self, key: &str, filter: &Filter) -> GraphResult<Self> {
        let refs = self.take_working();
        let nodes = self.resolve(refs)?;
        let matched: Vec<Reference> = nodes
            .iter()
            .filter(|node| filter.matches(node.get(key)))
            .map(|node| node.reference().clone())
            .collect();

        debug!(
            "Filter {} on '{}' kept {} of {} nodes",
            filter,
            key,
            matched.len(),
            nodes.len()
        );
        self.working = Some(matched);
        Ok(self)
    }

    /// Working set as unresolved references
    pub fn into_references(mut self) -> Vec<Reference> {
        self.take_working()
    }

    /// Resolve the working set, dropping references that no longer resolve
    pub fn get_all_nodes(mut self) -> GraphResult<Vec<GraphNode>> {
        let refs = self.take_working();
        self.resolve(refs)
    }

    /// The `index`-th resolved node of the working set
    pub fn get_node_indexed_at(self, index: usize) -> GraphResult<GraphNode> {
        let nodes = self.get_all_nodes()?;
        let len = nodes.len();
        nodes
            .into_iter()
            .nth(index)
            .ok_or(GraphError::Index { index, len })
    }

    fn take_working(&mut self) -> Vec<Reference> {
        match self.working.take() {
            Some(refs) => refs,
            None => self.index.default_references().to_vec(),
        }
    }

    fn resolve(&mut self, refs: Vec<Reference>) -> GraphResult<Vec<GraphNode>> {
        let mut nodes = Vec::with_capacity(refs.len());
        for reference in refs {
            if let Some(node) = self.resolved.get(&reference) {
                nodes.push(node.clone());
                continue;
            }
            match GraphNode::load(&self.index.store, &reference)? {
                Some(node) => {
                    self.resolved.insert(reference, node.clone());
                    nodes.push(node);
                }
                None => debug!("Skipping stale reference {}", reference),
            }
        }
        Ok(nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::store::KvStore;

    fn keys() -> Vec<String> {
        vec!["node_id".to_string(), "score".to_string()]
    }

    fn store() -> Arc<dyn Store> {
        Arc::new(KvStore::in_memory().unwrap())
    }

    fn node(store: &Arc<dyn Store>, id: u64, score: f64) -> GraphNode {
        let mut data = BTreeMap::new();
        data.insert("score".to_string(), Value::from(score));
        GraphNode::create(store.clone(), id, data, &keys(), None).unwrap()
    }

    fn scores(nodes: &[GraphNode]) -> Vec<f64> {
        nodes
            .iter()
            .map(|n| n.get("score").and_then(Value::as_number).unwrap())
            .collect()
    }

    #[test]
    fn test_each_key_gets_its_own_order() {
        let store = store();
        let mut index = OrderedRefIndex::new(store.clone(), &keys());
        let a = node(&store, 1, 30.0);
        let b = node(&store, 2, 10.0);
        let c = node(&store, 3, 20.0);
        for n in [&a, &b, &c] {
            index.add_reference(n).unwrap();
        }

        assert_eq!(
            index.references("node_id").unwrap(),
            &[a.reference().clone(), b.reference().clone(), c.reference().clone()]
        );
        assert_eq!(
            index.references("score").unwrap(),
            &[b.reference().clone(), c.reference().clone(), a.reference().clone()]
        );
    }

    #[test]
    fn test_equal_values_keep_arrival_order() {
        let store = store();
        let mut index = OrderedRefIndex::new(store.clone(), &keys());
        let first = node(&store, 1, 5.0);
        let low = node(&store, 2, 3.0);
        let second = node(&store, 3, 5.0);
        for n in [&first, &low, &second] {
            index.add_reference(n).unwrap();
        }

        assert_eq!(
            index.references("score").unwrap(),
            &[low.reference().clone(), first.reference().clone(), second.reference().clone()]
        );
    }

    #[test]
    fn test_stale_reference_is_skipped_and_kept() {
        let store = store();
        let mut index = OrderedRefIndex::new(store.clone(), &keys());
        let gone = node(&store, 1, 1.0);
        let kept = node(&store, 2, 2.0);
        index.add_reference(&gone).unwrap();
        index.add_reference(&kept).unwrap();
        store.delete(gone.reference()).unwrap();

        let late = node(&store, 3, 1.5);
        index.add_reference(&late).unwrap();

        assert_eq!(index.len(), 3);
        assert_eq!(scores(&index.sort_by("score").get_all_nodes().unwrap()), vec![1.5, 2.0]);
    }

    #[test]
    fn test_remove_takes_first_occurrence() {
        let store = store();
        let mut index = OrderedRefIndex::new(store.clone(), &keys());
        let a = node(&store, 1, 1.0);
        index.add_reference(&a).unwrap();
        index.add_reference(&a).unwrap();

        assert!(index.remove_reference(a.reference()));
        assert_eq!(index.len(), 1);
        assert!(index.remove_reference(a.reference()));
        assert!(!index.remove_reference(a.reference()));
        assert!(index.is_empty());
    }

    #[test]
    fn test_sort_by_unknown_key_is_empty() {
        let store = store();
        let mut index = OrderedRefIndex::new(store.clone(), &keys());
        index.add_reference(&node(&store, 1, 1.0)).unwrap();

        assert!(index.sort_by("age").get_all_nodes().unwrap().is_empty());
    }

    #[test]
    fn test_filter_then_sort_uses_sequence_order() {
        let store = store();
        let mut index = OrderedRefIndex::new(store.clone(), &keys());
        for (id, score) in [(1, 9.0), (2, 4.0), (3, 7.0), (4, 1.0)] {
            index.add_reference(&node(&store, id, score)).unwrap();
        }

        let nodes = index
            .filter_by("score", &Filter::Ge(4.0))
            .unwrap()
            .sort_by("score")
            .get_all_nodes()
            .unwrap();
        assert_eq!(scores(&nodes), vec![4.0, 7.0, 9.0]);

        // filter without a prior sort starts from the default key
        let nodes = index
            .filter_by("score", &Filter::Lt(8.0))
            .unwrap()
            .get_all_nodes()
            .unwrap();
        assert_eq!(scores(&nodes), vec![4.0, 7.0, 1.0]);
    }

    #[test]
    fn test_indexed_access_out_of_bounds() {
        let store = store();
        let mut index = OrderedRefIndex::new(store.clone(), &keys());
        index.add_reference(&node(&store, 1, 1.0)).unwrap();
        index.add_reference(&node(&store, 2, 2.0)).unwrap();

        let second = index.sort_by("score").get_node_indexed_at(1).unwrap();
        assert_eq!(second.node_id(), Some(2));

        match index.get_node_indexed_at(5) {
            Err(GraphError::Index { index, len }) => {
                assert_eq!(index, 5);
                assert_eq!(len, 2);
            }
            other => panic!("expected index error, got {:?}", other),
        }
    }

    #[test]
    fn test_new_key_is_not_backfilled() {
        let store = store();
        let mut index = OrderedRefIndex::new(store.clone(), &keys());
        index.add_reference(&node(&store, 1, 1.0)).unwrap();

        assert!(index.add_optimisation_key("age"));
        assert!(!index.add_optimisation_key("age"));
        assert_eq!(index.references("age").unwrap().len(), 0);
        assert_eq!(index.len(), 1);
    }
}
