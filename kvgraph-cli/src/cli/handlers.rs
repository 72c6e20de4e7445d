// Copyright (c) 2024-2025 kvgraph Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Command handlers
//!
//! Each handler opens the store, performs one graph operation and flushes
//! before returning.

use super::commands::{Direction, OutputFormat};
use super::output::NodeFormatter;
use colored::*;
use kvgraph::{
    open_store, Filter, Graph, GraphConfig, GraphNode, KvStore, Reference, Store, StoreConfig,
    Value,
};
use std::collections::BTreeMap;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

type CliResult = Result<(), Box<dyn Error>>;

fn open(config: &StoreConfig) -> Result<Arc<dyn Store>, Box<dyn Error>> {
    Ok(open_store(config)?)
}

/// Parse a JSON object into node data
pub fn parse_data(json: &str) -> Result<BTreeMap<String, Value>, Box<dyn Error>> {
    let parsed: serde_json::Value = serde_json::from_str(json)?;
    let object = parsed
        .as_object()
        .ok_or_else(|| format!("Node data must be a JSON object, got: {}", json))?;
    Ok(object
        .iter()
        .map(|(k, v)| (k.clone(), Value::from_json(v)))
        .collect())
}

/// Parse a JSON value; anything that is not JSON is taken as a plain string
pub fn parse_value(raw: &str) -> Value {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(json) => Value::from_json(&json),
        Err(_) => Value::String(raw.to_string()),
    }
}

/// Parse `key:op:operand`
pub fn parse_filter(raw: &str) -> Result<(String, Filter), Box<dyn Error>> {
    let mut parts = raw.splitn(3, ':');
    let (key, op, operand) = match (parts.next(), parts.next(), parts.next()) {
        (Some(key), Some(op), Some(operand)) if !key.is_empty() => (key, op, operand),
        _ => return Err(format!("Filter must look like key:op:operand, got '{}'", raw).into()),
    };
    let filter = Filter::parse(op, parse_value(operand))?;
    Ok((key.to_string(), filter))
}

fn ttl_from_secs(secs: Option<u64>) -> Option<Duration> {
    secs.map(Duration::from_secs)
}

pub fn handle_create(config: &StoreConfig, keys: Vec<String>, ttl_secs: Option<u64>) -> CliResult {
    let store = open(config)?;
    let mut graph_config = GraphConfig::with_keys(keys);
    graph_config.default_node_ttl = ttl_from_secs(ttl_secs);

    let graph = Graph::with_config(store.clone(), &graph_config)?;
    store.flush()?;

    println!("{} {}", "Created graph".bold().green(), graph.reference());
    println!("  entry node: {}", graph.entry().reference());
    println!("  optimisation keys: {}", graph.optimisation_keys().join(", "));
    Ok(())
}

pub fn handle_add_vertex(
    config: &StoreConfig,
    graph_ref: &str,
    data: &str,
    ttl_secs: Option<u64>,
) -> CliResult {
    let store = open(config)?;
    let mut graph = Graph::load(store.clone(), &Reference::from(graph_ref))?;
    let data = parse_data(data)?;

    let node = match ttl_from_secs(ttl_secs) {
        Some(ttl) => graph.add_vertex_with_ttl(data, Some(ttl))?,
        None => graph.add_vertex(data)?,
    };
    store.flush()?;

    println!(
        "{} {} (node_id {})",
        "Added vertex".bold().green(),
        node.reference(),
        node.node_id().unwrap_or_default()
    );
    Ok(())
}

pub fn handle_add_edge(config: &StoreConfig, graph_ref: &str, from: &str, to: &str) -> CliResult {
    let store = open(config)?;
    let graph = Graph::load(store.clone(), &Reference::from(graph_ref))?;
    let mut from = graph.get_node(&Reference::from(from))?;
    let mut to = graph.get_node(&Reference::from(to))?;

    graph.add_edge(&mut from, &mut to)?;
    store.flush()?;

    println!(
        "{} {} -> {}",
        "Added edge".bold().green(),
        from.reference(),
        to.reference()
    );
    Ok(())
}

pub fn handle_remove_edge(
    config: &StoreConfig,
    graph_ref: &str,
    from: &str,
    to: &str,
) -> CliResult {
    let store = open(config)?;
    let graph = Graph::load(store.clone(), &Reference::from(graph_ref))?;
    let mut from = graph.get_node(&Reference::from(from))?;
    let mut to = graph.get_node(&Reference::from(to))?;

    if !from.outgoing().contains(to.reference()) {
        println!(
            "{}",
            format!("No edge {} -> {}", from.reference(), to.reference()).yellow()
        );
        return Ok(());
    }

    graph.remove_edge(&mut from, &mut to)?;
    store.flush()?;

    println!(
        "{} {} -> {}",
        "Removed edge".bold().green(),
        from.reference(),
        to.reference()
    );
    Ok(())
}

pub fn handle_update(config: &StoreConfig, node_ref: &str, key: &str, value: &str) -> CliResult {
    let store = open(config)?;
    let mut node = GraphNode::load_required(&store, &Reference::from(node_ref))?;
    let value = parse_value(value);

    node.update_data(key, value.clone(), true)?;
    store.flush()?;

    println!(
        "{} {}.{} = {}",
        "Updated".bold().green(),
        node.reference(),
        key,
        value
    );
    Ok(())
}

pub fn handle_optimise_for(config: &StoreConfig, graph_ref: &str, key: &str) -> CliResult {
    let store = open(config)?;
    let mut graph = Graph::load(store.clone(), &Reference::from(graph_ref))?;

    graph.optimise_for(key)?;
    store.flush()?;

    println!(
        "{} {}",
        "Optimisation keys:".bold().green(),
        graph.optimisation_keys().join(", ")
    );
    println!(
        "{}",
        "Only the entry node's indexes track the new key; existing vertices keep theirs."
            .yellow()
    );
    Ok(())
}

pub fn handle_neighbors(
    config: &StoreConfig,
    node_ref: &str,
    direction: Direction,
    sort_by: Option<String>,
    filters: Vec<String>,
    format: OutputFormat,
) -> CliResult {
    let store = open(config)?;
    let node = GraphNode::load_required(&store, &Reference::from(node_ref))?;
    let index = match direction {
        Direction::Incoming => node.incoming(),
        Direction::Outgoing => node.outgoing(),
    };

    let mut query = index.query();
    if let Some(key) = &sort_by {
        query = query.sort_by(key);
    }
    for raw in &filters {
        let (key, filter) = parse_filter(raw)?;
        query = query.filter_by(&key, &filter)?;
    }
    let nodes = query.get_all_nodes()?;

    print!("{}", NodeFormatter::format(&nodes, format));
    Ok(())
}

pub fn handle_show(config: &StoreConfig, node_ref: &str) -> CliResult {
    let store = open(config)?;
    let node = GraphNode::load_required(&store, &Reference::from(node_ref))?;
    print!("{}", node.describe()?);
    Ok(())
}

pub fn handle_traverse(
    config: &StoreConfig,
    graph_ref: &str,
    from: Option<String>,
    format: OutputFormat,
) -> CliResult {
    let store = open(config)?;
    let graph = Graph::load(store, &Reference::from(graph_ref))?;
    let start = match from {
        Some(reference) => Some(graph.get_node(&Reference::from(reference))?),
        None => None,
    };

    let nodes = graph.traverse(start.as_ref())?;
    print!("{}", NodeFormatter::format(&nodes, format));
    Ok(())
}

pub fn handle_purge(config: &StoreConfig) -> CliResult {
    let store = KvStore::open(config)?;
    let purged = store.purge_expired()?;
    store.flush()?;

    println!("{} {} expired records", "Purged".bold().green(), purged);
    Ok(())
}
