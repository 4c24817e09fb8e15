//! Deterministic Mermaid rendering of both graphs.
//!
//! Nodes are sorted by id and renamed `N<i>` / `F<i>` so the output stays
//! valid Mermaid regardless of what the original ids contain. `max_nodes`
//! caps the node set; edges whose endpoints were cut are dropped. Two
//! logically equal graphs render byte-identically.

use std::collections::HashMap;

use crate::model::{CallGraph, DependencyGraph};

fn escape_label(label: &str) -> String {
    label.replace('"', "'")
}

/// Render the call graph as `graph TD` with nodes `N0..Nk`.
pub fn export_call_graph(graph: &CallGraph, max_nodes: usize) -> String {
    let mut ids = graph.sorted_ids();
    ids.truncate(max_nodes);
    let numbering: HashMap<&str, usize> = ids
        .iter()
        .enumerate()
        .map(|(i, id)| (id.as_str(), i))
        .collect();

    let mut out = String::from("graph TD\n");
    for (i, id) in ids.iter().enumerate() {
        out.push_str(&format!("    N{i}[\"{}\"]\n", escape_label(id)));
    }

    let mut edge_lines: Vec<(usize, usize)> = graph
        .edges()
        .into_iter()
        .filter_map(|(from, to, _)| {
            Some((*numbering.get(from.as_str())?, *numbering.get(to.as_str())?))
        })
        .collect();
    edge_lines.sort_unstable();
    edge_lines.dedup();
    for (from, to) in edge_lines {
        out.push_str(&format!("    N{from} --> N{to}\n"));
    }
    out
}

/// Render the dependency graph as `graph LR` with nodes `F0..Fk`.
pub fn export_dependency_graph(graph: &DependencyGraph, max_nodes: usize) -> String {
    let mut ids = graph.sorted_ids();
    ids.truncate(max_nodes);
    let numbering: HashMap<&str, usize> = ids
        .iter()
        .enumerate()
        .map(|(i, id)| (id.as_str(), i))
        .collect();

    let mut out = String::from("graph LR\n");
    for (i, id) in ids.iter().enumerate() {
        out.push_str(&format!("    F{i}[\"{}\"]\n", escape_label(id)));
    }

    let mut edge_lines: Vec<(usize, usize)> = graph
        .edges()
        .into_iter()
        .filter_map(|(from, to, _)| {
            Some((*numbering.get(from.as_str())?, *numbering.get(to.as_str())?))
        })
        .collect();
    edge_lines.sort_unstable();
    edge_lines.dedup();
    for (from, to) in edge_lines {
        out.push_str(&format!("    F{from} --> F{to}\n"));
    }
    out
}
