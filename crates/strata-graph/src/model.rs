//! Graph storage: interned string ids over petgraph adjacency.
//!
//! Call and dependency graphs are cyclic by construction, so nodes never own
//! each other; both graphs are a `DiGraph` with a side map interning string
//! ids to node indices. Adjacency queries return ids in edge insertion
//! order.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::{Deserialize, Serialize};

/// A callable function node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallNode {
    /// `package.name` for Go, `file:name` for TS/JS/Vue.
    pub id: String,
    pub name: String,
    /// Empty for callees only seen at call sites (e.g. stdlib functions).
    pub file: String,
    pub line: u32,
    pub package: Option<String>,
    pub signature: String,
}

/// A call site: the edge payload between two call nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallSiteMeta {
    pub file: String,
    pub line: u32,
    /// Always "direct" for the extraction implemented here.
    pub call_type: String,
}

/// An import edge between two files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportMeta {
    /// The import specifier as written in source.
    pub import_text: String,
    pub line: u32,
}

/// Directed graph keyed by string node ids, interned to petgraph indices.
#[derive(Debug)]
pub struct IdGraph<N, E> {
    graph: DiGraph<N, E>,
    ids: HashMap<String, NodeIndex>,
    /// Reverse map: node index position -> id. Nodes are never removed, so
    /// indices stay contiguous.
    names: Vec<String>,
}

impl<N, E> Default for IdGraph<N, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N, E> IdGraph<N, E> {
    pub fn new() -> Self {
        IdGraph {
            graph: DiGraph::new(),
            ids: HashMap::new(),
            names: Vec::new(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains_key(id)
    }

    pub fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.ids.get(id).copied()
    }

    /// Intern `id`, creating its node with `weight` on first sight.
    pub fn intern_with(&mut self, id: &str, weight: impl FnOnce() -> N) -> NodeIndex {
        if let Some(&idx) = self.ids.get(id) {
            return idx;
        }
        let idx = self.graph.add_node(weight());
        self.ids.insert(id.to_string(), idx);
        self.names.push(id.to_string());
        idx
    }

    pub fn weight(&self, id: &str) -> Option<&N> {
        self.index_of(id).map(|idx| &self.graph[idx])
    }

    pub fn weight_mut(&mut self, id: &str) -> Option<&mut N> {
        self.index_of(id).map(|idx| &mut self.graph[idx])
    }

    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex, meta: E) {
        self.graph.add_edge(from, to, meta);
    }

    pub fn id_at(&self, idx: NodeIndex) -> &str {
        self.names.get(idx.index()).map(String::as_str).unwrap_or("")
    }

    /// Neighbor ids one hop away, in edge insertion order. petgraph iterates
    /// newest edge first, so the collected list is reversed.
    pub fn neighbor_ids(&self, id: &str, direction: Direction) -> Vec<String> {
        let Some(idx) = self.index_of(id) else {
            return Vec::new();
        };
        let mut out: Vec<String> = self
            .graph
            .neighbors_directed(idx, direction)
            .map(|n| self.id_of(n))
            .collect();
        out.reverse();
        out
    }

    fn id_of(&self, idx: NodeIndex) -> String {
        self.id_at(idx).to_string()
    }

    /// Neighbor indices in edge insertion order.
    pub fn neighbors(&self, idx: NodeIndex, direction: Direction) -> Vec<NodeIndex> {
        let mut out: Vec<NodeIndex> = self.graph.neighbors_directed(idx, direction).collect();
        out.reverse();
        out
    }

    /// All ids, sorted for deterministic iteration.
    pub fn sorted_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.ids.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// All edges as (from_id, to_id, meta), in insertion order.
    pub fn edges(&self) -> Vec<(String, String, &E)> {
        self.graph
            .edge_indices()
            .filter_map(|e| {
                let (from, to) = self.graph.edge_endpoints(e)?;
                Some((self.id_of(from), self.id_of(to), &self.graph[e]))
            })
            .collect()
    }
}

/// The function call graph.
pub type CallGraph = IdGraph<CallNode, CallSiteMeta>;

/// The file-level import dependency graph; node weights are the file paths.
pub type DependencyGraph = IdGraph<String, ImportMeta>;

impl CallGraph {
    /// Ids of functions calling `id`, one hop.
    pub fn callers(&self, id: &str) -> Vec<String> {
        self.neighbor_ids(id, Direction::Incoming)
    }

    /// Ids of functions `id` calls, one hop.
    pub fn callees(&self, id: &str) -> Vec<String> {
        self.neighbor_ids(id, Direction::Outgoing)
    }

    pub fn node(&self, id: &str) -> Option<&CallNode> {
        self.weight(id)
    }
}

impl DependencyGraph {
    /// Files that `file` imports, one hop.
    pub fn dependencies_of(&self, file: &str) -> Vec<String> {
        self.neighbor_ids(file, Direction::Outgoing)
    }

    /// Files importing `file`, one hop.
    pub fn dependents_of(&self, file: &str) -> Vec<String> {
        self.neighbor_ids(file, Direction::Incoming)
    }
}
