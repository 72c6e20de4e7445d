// Copyright (c) 2024-2025 kvgraph Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! kvgraph CLI entry point

use clap::Parser;
use colored::Colorize;
use kvgraph::StoreConfig;

mod cli;
use cli::{Cli, Commands};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        log::LevelFilter::Debug
    } else if let Some(level) = cli.log_level {
        level.to_level_filter()
    } else {
        // RUST_LOG can still raise it
        log::LevelFilter::Warn
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    let store_config = match &cli.config {
        Some(path) => StoreConfig::from_json_file(path)?,
        None => StoreConfig::sled(&cli.path),
    };

    match cli.command {
        Commands::Version => {
            println!("{} {}", "kvgraph".bold().green(), kvgraph::VERSION);
            println!("Directed graphs persisted in a key-value store");
            Ok(())
        }

        Commands::Create { keys, ttl_secs } => cli::handle_create(&store_config, keys, ttl_secs),

        Commands::AddVertex {
            graph,
            data,
            ttl_secs,
        } => cli::handle_add_vertex(&store_config, &graph, &data, ttl_secs),

        Commands::AddEdge { graph, from, to } => {
            cli::handle_add_edge(&store_config, &graph, &from, &to)
        }

        Commands::RemoveEdge { graph, from, to } => {
            cli::handle_remove_edge(&store_config, &graph, &from, &to)
        }

        Commands::Update { node, key, value } => {
            cli::handle_update(&store_config, &node, &key, &value)
        }

        Commands::OptimiseFor { graph, key } => {
            cli::handle_optimise_for(&store_config, &graph, &key)
        }

        Commands::Neighbors {
            node,
            direction,
            sort_by,
            filters,
            format,
        } => cli::handle_neighbors(&store_config, &node, direction, sort_by, filters, format),

        Commands::Show { node } => cli::handle_show(&store_config, &node),

        Commands::Traverse { graph, from, format } => {
            cli::handle_traverse(&store_config, &graph, from, format)
        }

        Commands::Purge => cli::handle_purge(&store_config),
    }
}
