// Copyright (c) 2024-2025 kvgraph Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Command-line arguments

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "kvgraph")]
#[command(version, about = "Directed graphs persisted in a key-value store", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database directory (sled)
    #[arg(short, long, global = true, default_value = "./kvgraph-data")]
    pub path: PathBuf,

    /// JSON store configuration; overrides --path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    pub log_level: Option<log::Level>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show version information
    Version,

    /// Create a graph and print its reference
    Create {
        /// Optimisation key besides node_id (repeatable)
        #[arg(short, long = "key")]
        keys: Vec<String>,

        /// Default TTL in seconds for vertices added to this graph
        #[arg(long)]
        ttl_secs: Option<u64>,
    },

    /// Add a vertex to a graph and print its reference
    AddVertex {
        /// Graph reference
        graph: String,

        /// Node data as a JSON object, e.g. '{"score": 3}'
        #[arg(short, long, default_value = "{}")]
        data: String,

        /// TTL in seconds; defaults to the graph's
        #[arg(long)]
        ttl_secs: Option<u64>,
    },

    /// Add the edge FROM -> TO
    AddEdge {
        /// Graph reference
        graph: String,
        from: String,
        to: String,
    },

    /// Remove one FROM -> TO edge
    RemoveEdge {
        /// Graph reference
        graph: String,
        from: String,
        to: String,
    },

    /// Set a field on a node and re-sort it among its neighbors
    Update {
        node: String,
        key: String,

        /// JSON value, e.g. 7 or '"label"'
        value: String,
    },

    /// Register an additional optimisation key on a graph
    OptimiseFor {
        /// Graph reference
        graph: String,
        key: String,
    },

    /// List a node's neighbors
    Neighbors {
        node: String,

        #[arg(long, value_enum, default_value_t = Direction::Outgoing)]
        direction: Direction,

        /// Order by this optimisation key
        #[arg(short, long)]
        sort_by: Option<String>,

        /// Filter as key:op:operand, operand in JSON (repeatable)
        /// e.g. score:range:[1,5] or tag:eq:["a","b"]
        #[arg(short, long = "filter")]
        filters: Vec<String>,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Print a node with its neighbors and data
    Show { node: String },

    /// Depth-first traversal of a graph
    Traverse {
        /// Graph reference
        graph: String,

        /// Start node; defaults to the graph's entry node
        #[arg(long)]
        from: Option<String>,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Delete every expired record from the store
    Purge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Direction {
    Incoming,
    Outgoing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}
