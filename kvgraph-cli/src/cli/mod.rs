// Copyright (c) 2024-2025 kvgraph Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CLI module for kvgraph
//!
//! Creates graphs, wires vertices and edges, and inspects neighbor lists of
//! graphs stored in a sled directory.

pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{Cli, Commands};
pub use handlers::{
    handle_add_edge, handle_add_vertex, handle_create, handle_neighbors, handle_optimise_for,
    handle_purge, handle_remove_edge, handle_show, handle_traverse, handle_update,
};
