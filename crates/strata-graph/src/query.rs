//! Traversal queries over the call and dependency graphs.
//!
//! Unknown ids never fail; they produce empty results. Ordering rules:
//! breadth-first results are sorted by first-reach depth (queue order breaks
//! ties), call-chain enumeration follows callee insertion order, and cycle
//! discovery iterates roots in sorted id order.

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::Direction;
use serde::{Deserialize, Serialize};

use crate::model::{CallGraph, DependencyGraph};

/// Traversal direction for [`transitive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalDirection {
    Callers,
    Callees,
}

/// A node reached by a breadth-first traversal, with the depth at which it
/// was first seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReachedNode {
    pub id: String,
    pub depth: u32,
}

/// A cycle through the dependency graph. `files` is a rotation of the
/// members with the starting node repeated at the end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cycle {
    pub files: Vec<String>,
    pub kind: String,
}

/// Breadth-first reachability from `id`, up to `max_depth` hops. The start
/// node itself is not reported.
pub fn transitive(
    graph: &CallGraph,
    id: &str,
    max_depth: u32,
    direction: TraversalDirection,
) -> Vec<ReachedNode> {
    let petgraph_direction = match direction {
        TraversalDirection::Callers => Direction::Incoming,
        TraversalDirection::Callees => Direction::Outgoing,
    };
    let Some(start) = graph.index_of(id) else {
        return Vec::new();
    };

    let mut visited = HashSet::from([start]);
    let mut queue = VecDeque::from([(start, 0u32)]);
    let mut reached = Vec::new();

    while let Some((node, depth)) = queue.pop_front() {
        if depth >= max_depth {
            continue;
        }
        for next in graph.neighbors(node, petgraph_direction) {
            if visited.insert(next) {
                reached.push(ReachedNode {
                    id: graph.id_at(next).to_string(),
                    depth: depth + 1,
                });
                queue.push_back((next, depth + 1));
            }
        }
    }

    // BFS discovers in depth order already; keep it explicit and stable.
    reached.sort_by_key(|n| n.depth);
    reached
}

/// Transitive callers: everything that would be affected by changing `id`.
pub fn impact(graph: &CallGraph, id: &str, max_depth: u32) -> Vec<ReachedNode> {
    transitive(graph, id, max_depth, TraversalDirection::Callers)
}

/// Enumerate simple call paths `from -> ... -> to` of at most `max_depth`
/// edges. Depth-bounded DFS; the visited set is cleared on backtrack so
/// every distinct simple path is reported.
pub fn call_chain(
    graph: &CallGraph,
    from: &str,
    to: &str,
    max_depth: u32,
) -> Vec<Vec<String>> {
    let (Some(start), Some(goal)) = (graph.index_of(from), graph.index_of(to)) else {
        return Vec::new();
    };

    let mut paths = Vec::new();
    let mut path = vec![start];
    let mut on_path = HashSet::from([start]);
    dfs_paths(graph, start, goal, max_depth, &mut path, &mut on_path, &mut paths);
    paths
        .into_iter()
        .map(|p| p.into_iter().map(|i| graph.id_at(i).to_string()).collect())
        .collect()
}

fn dfs_paths(
    graph: &CallGraph,
    node: petgraph::graph::NodeIndex,
    goal: petgraph::graph::NodeIndex,
    remaining: u32,
    path: &mut Vec<petgraph::graph::NodeIndex>,
    on_path: &mut HashSet<petgraph::graph::NodeIndex>,
    paths: &mut Vec<Vec<petgraph::graph::NodeIndex>>,
) {
    if node == goal && path.len() > 1 {
        paths.push(path.clone());
        return;
    }
    if remaining == 0 {
        return;
    }
    for next in graph.neighbors(node, Direction::Outgoing) {
        if on_path.contains(&next) {
            continue;
        }
        path.push(next);
        on_path.insert(next);
        dfs_paths(graph, next, goal, remaining - 1, path, on_path, paths);
        on_path.remove(&next);
        path.pop();
    }
}

/// Shortest import path between two files, breadth-first. Returns the node
/// sequence including both endpoints, or `None` when unreachable within
/// `max_depth` hops.
pub fn dependency_path(
    graph: &DependencyGraph,
    from_file: &str,
    to_file: &str,
    max_depth: u32,
) -> Option<Vec<String>> {
    let start = graph.index_of(from_file)?;
    let goal = graph.index_of(to_file)?;
    if start == goal {
        return Some(vec![from_file.to_string()]);
    }

    let mut parent: HashMap<petgraph::graph::NodeIndex, petgraph::graph::NodeIndex> =
        HashMap::new();
    let mut visited = HashSet::from([start]);
    let mut queue = VecDeque::from([(start, 0u32)]);

    while let Some((node, depth)) = queue.pop_front() {
        if depth >= max_depth {
            continue;
        }
        for next in graph.neighbors(node, Direction::Outgoing) {
            if !visited.insert(next) {
                continue;
            }
            parent.insert(next, node);
            if next == goal {
                let mut chain = vec![goal];
                let mut cursor = goal;
                while let Some(&prev) = parent.get(&cursor) {
                    chain.push(prev);
                    cursor = prev;
                }
                chain.reverse();
                return Some(
                    chain
                        .into_iter()
                        .map(|i| graph.id_at(i).to_string())
                        .collect(),
                );
            }
            queue.push_back((next, depth + 1));
        }
    }
    None
}

/// Find cycles in the dependency graph with a recursion-stack DFS. On
/// hitting a node already on the stack, the cycle is `stack[k..] + [node]`
/// where `k` is the node's first position on the stack. Each cycle is
/// reported once per discovery and tagged "file".
pub fn cyclic_dependencies(graph: &DependencyGraph) -> Vec<Cycle> {
    let mut cycles = Vec::new();
    let mut visited: HashSet<String> = HashSet::new();

    for id in graph.sorted_ids() {
        if visited.contains(&id) {
            continue;
        }
        let Some(start) = graph.index_of(&id) else {
            continue;
        };
        let mut stack: Vec<petgraph::graph::NodeIndex> = Vec::new();
        dfs_cycles(graph, start, &mut stack, &mut visited, &mut cycles);
    }
    cycles
}

fn dfs_cycles(
    graph: &DependencyGraph,
    node: petgraph::graph::NodeIndex,
    stack: &mut Vec<petgraph::graph::NodeIndex>,
    visited: &mut HashSet<String>,
    cycles: &mut Vec<Cycle>,
) {
    visited.insert(graph.id_at(node).to_string());
    stack.push(node);

    for next in graph.neighbors(node, Direction::Outgoing) {
        if let Some(k) = stack.iter().position(|&n| n == next) {
            let mut files: Vec<String> = stack[k..]
                .iter()
                .map(|&i| graph.id_at(i).to_string())
                .collect();
            files.push(graph.id_at(next).to_string());
            cycles.push(Cycle {
                files,
                kind: "file".to_string(),
            });
        } else if !visited.contains(graph.id_at(next)) {
            dfs_cycles(graph, next, stack, visited, cycles);
        }
    }

    stack.pop();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CallNode, CallSiteMeta, ImportMeta};

    fn node(id: &str) -> CallNode {
        CallNode {
            id: id.to_string(),
            name: id.to_string(),
            file: String::new(),
            line: 0,
            package: None,
            signature: String::new(),
        }
    }

    fn site() -> CallSiteMeta {
        CallSiteMeta {
            file: String::new(),
            line: 0,
            call_type: "direct".to_string(),
        }
    }

    fn meta(text: &str) -> ImportMeta {
        ImportMeta {
            import_text: text.to_string(),
            line: 1,
        }
    }

    /// a -> b -> c, a -> c, c -> d
    fn diamond() -> CallGraph {
        let mut g = CallGraph::new();
        let a = g.intern_with("a", || node("a"));
        let b = g.intern_with("b", || node("b"));
        let c = g.intern_with("c", || node("c"));
        let d = g.intern_with("d", || node("d"));
        g.add_edge(a, b, site());
        g.add_edge(b, c, site());
        g.add_edge(a, c, site());
        g.add_edge(c, d, site());
        g
    }

    #[test]
    fn test_transitive_callees_sorted_by_depth() {
        let g = diamond();
        let reached = transitive(&g, "a", 10, TraversalDirection::Callees);
        let ids: Vec<&str> = reached.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "d"]);
        assert_eq!(reached[0].depth, 1);
        assert_eq!(reached[1].depth, 1);
        assert_eq!(reached[2].depth, 2);
    }

    #[test]
    fn test_transitive_depth_bound() {
        let g = diamond();
        let reached = transitive(&g, "a", 1, TraversalDirection::Callees);
        let ids: Vec<&str> = reached.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn test_impact_is_transitive_callers() {
        let g = diamond();
        let reached = impact(&g, "d", 10);
        let ids: Vec<&str> = reached.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_unknown_id_is_empty() {
        let g = diamond();
        assert!(transitive(&g, "zz", 5, TraversalDirection::Callees).is_empty());
        assert!(call_chain(&g, "zz", "a", 5).is_empty());
    }

    #[test]
    fn test_call_chain_multiple_paths() {
        let g = diamond();
        let chains = call_chain(&g, "a", "c", 5);
        assert_eq!(chains.len(), 2);
        // Callee insertion order: a->b explored before a->c.
        assert_eq!(chains[0], vec!["a", "b", "c"]);
        assert_eq!(chains[1], vec!["a", "c"]);
        for chain in &chains {
            assert!(chain.len() <= 6);
            assert_eq!(chain.first().map(String::as_str), Some("a"));
            assert_eq!(chain.last().map(String::as_str), Some("c"));
        }
    }

    #[test]
    fn test_call_chain_depth_bound() {
        let g = diamond();
        let chains = call_chain(&g, "a", "d", 1);
        assert!(chains.is_empty());
        let chains = call_chain(&g, "a", "d", 2);
        assert_eq!(chains, vec![vec!["a", "c", "d"]]);
    }

    fn dep_cycle() -> DependencyGraph {
        let mut g = DependencyGraph::new();
        let m1 = g.intern_with("m1.ts", || "m1.ts".to_string());
        let m2 = g.intern_with("m2.ts", || "m2.ts".to_string());
        let m3 = g.intern_with("m3.ts", || "m3.ts".to_string());
        g.add_edge(m1, m2, meta("./m2"));
        g.add_edge(m2, m3, meta("./m3"));
        g.add_edge(m3, m1, meta("./m1"));
        g
    }

    #[test]
    fn test_cycle_detection() {
        let cycles = cyclic_dependencies(&dep_cycle());
        assert_eq!(cycles.len(), 1);
        let cycle = &cycles[0];
        assert_eq!(cycle.kind, "file");
        assert_eq!(cycle.files.len(), 4);
        assert_eq!(cycle.files.first(), cycle.files.last());
        // Every member appears exactly once apart from the repeated
        // endpoint.
        let mut inner = cycle.files.clone();
        inner.pop();
        let unique: HashSet<&String> = inner.iter().collect();
        assert_eq!(unique.len(), inner.len());
    }

    #[test]
    fn test_acyclic_graph_reports_nothing() {
        let mut g = DependencyGraph::new();
        let a = g.intern_with("a.ts", || "a.ts".to_string());
        let b = g.intern_with("b.ts", || "b.ts".to_string());
        g.add_edge(a, b, meta("./b"));
        assert!(cyclic_dependencies(&g).is_empty());
    }

    #[test]
    fn test_self_import_cycle() {
        let mut g = DependencyGraph::new();
        let a = g.intern_with("a.ts", || "a.ts".to_string());
        g.add_edge(a, a, meta("./a"));
        let cycles = cyclic_dependencies(&g);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].files, vec!["a.ts", "a.ts"]);
    }

    #[test]
    fn test_dependency_path() {
        let g = dep_cycle();
        let path = dependency_path(&g, "m1.ts", "m3.ts", 10).unwrap();
        assert_eq!(path, vec!["m1.ts", "m2.ts", "m3.ts"]);
        assert!(dependency_path(&g, "m1.ts", "m3.ts", 1).is_none());
        assert_eq!(
            dependency_path(&g, "m1.ts", "m1.ts", 5).unwrap(),
            vec!["m1.ts"]
        );
    }
}
