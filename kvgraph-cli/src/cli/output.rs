// Copyright (c) 2024-2025 kvgraph Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Node list formatting for CLI output

use super::commands::OutputFormat;
use colored::*;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use kvgraph::{GraphNode, Value, NODE_ID_KEY};

pub struct NodeFormatter;

impl NodeFormatter {
    pub fn format(nodes: &[GraphNode], format: OutputFormat) -> String {
        match format {
            OutputFormat::Table => Self::format_table(nodes),
            OutputFormat::Json => Self::format_json(nodes),
        }
    }

    /// `node_id` first, then every other field seen, in name order
    fn columns(nodes: &[GraphNode]) -> Vec<String> {
        let mut columns = vec![NODE_ID_KEY.to_string()];
        for node in nodes {
            for key in node.data().keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }
        columns[1..].sort();
        columns
    }

    fn format_table(nodes: &[GraphNode]) -> String {
        if nodes.is_empty() {
            return format!("{}\n", "No nodes found".yellow());
        }

        let columns = Self::columns(nodes);
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);

        let mut header = vec![
            Cell::new("#").fg(Color::Green),
            Cell::new("reference").fg(Color::Green),
        ];
        header.extend(columns.iter().map(|c| Cell::new(c).fg(Color::Green)));
        header.push(Cell::new("ttl").fg(Color::Green));
        table.set_header(header);

        for (i, node) in nodes.iter().enumerate() {
            let mut row = vec![i.to_string(), node.reference().to_string()];
            row.extend(columns.iter().map(|c| {
                node.get(c)
                    .map(Self::value_to_string)
                    .unwrap_or_else(|| "NULL".to_string())
            }));
            row.push(
                node.remaining_ttl()
                    .map(|ttl| format!("{:.1}s", ttl.as_secs_f64()))
                    .unwrap_or_else(|| "-".to_string()),
            );
            table.add_row(row);
        }

        let mut output = format!("{} {}\n", "Nodes:".bold().green(), nodes.len());
        output.push_str(&table.to_string());
        output.push('\n');
        output
    }

    fn format_json(nodes: &[GraphNode]) -> String {
        let rows: Vec<serde_json::Value> = nodes
            .iter()
            .map(|node| {
                let data: serde_json::Map<String, serde_json::Value> = node
                    .data()
                    .iter()
                    .map(|(k, v)| (k.clone(), Self::value_to_json(v)))
                    .collect();
                serde_json::json!({
                    "reference": node.reference().as_str(),
                    "data": data,
                    "ttl_secs": node.remaining_ttl().map(|t| t.as_secs_f64()),
                })
            })
            .collect();

        let mut output = serde_json::to_string_pretty(&rows).unwrap_or_else(|_| {
            "{\"status\": \"error\", \"error\": \"Could not serialize nodes to JSON\"}".to_string()
        });
        output.push('\n');
        output
    }

    fn value_to_string(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    fn value_to_json(value: &Value) -> serde_json::Value {
        match value {
            Value::Number(n) => serde_json::json!(n),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Self::value_to_json).collect())
            }
            Value::Null => serde_json::Value::Null,
        }
    }
}
