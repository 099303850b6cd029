// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! The capability graph: a directed multigraph over media URNs, derived
//! from a block's registered caps.
//!
//! Nodes are the distinct media URNs appearing as a cap's `in` or `out`
//! tag; edges are cap-derived `in -> out` conversions. The graph is built
//! once from a snapshot (construction takes ownership of the edges it is
//! given) and never mutated afterward — later registry changes require
//! building a new graph.

use std::collections::{BTreeSet, HashMap, VecDeque};

use cb_urn::{CapUrn, MediaUrn};
use serde::{Deserialize, Serialize};

/// A single cap-derived conversion edge `in -> out`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Source media URN.
    pub from: MediaUrn,
    /// Destination media URN.
    pub to: MediaUrn,
    /// The cap URN this edge was derived from.
    pub cap: CapUrn,
    /// Name of the registry the cap's set was registered under.
    pub registry_name: String,
    /// Name of the cap set within that registry.
    pub set_name: String,
    /// The cap URN's specificity at the time the edge was built.
    pub specificity: usize,
}

/// Node and edge counts, plus how many distinct nodes ever appear as an
/// edge's source or destination respectively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    /// Total distinct media URN nodes.
    pub node_count: usize,
    /// Total edges (parallel edges counted separately).
    pub edge_count: usize,
    /// Distinct media URNs appearing as some edge's source.
    pub input_spec_count: usize,
    /// Distinct media URNs appearing as some edge's destination.
    pub output_spec_count: usize,
}

/// A directed multigraph over media URNs, built once from a block
/// snapshot and queried thereafter.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: BTreeSet<String>,
    edges: Vec<Edge>,
    outgoing: HashMap<String, Vec<usize>>,
    incoming: HashMap<String, Vec<usize>>,
}

impl Graph {
    /// Build a graph from the given edge set, deriving nodes as every
    /// distinct `from`/`to` media URN that appears.
    #[must_use]
    pub fn new(edges: Vec<Edge>) -> Self {
        let mut nodes = BTreeSet::new();
        let mut outgoing: HashMap<String, Vec<usize>> = HashMap::new();
        let mut incoming: HashMap<String, Vec<usize>> = HashMap::new();

        for (idx, edge) in edges.iter().enumerate() {
            let from = edge.from.to_string();
            let to = edge.to.to_string();
            nodes.insert(from.clone());
            nodes.insert(to.clone());
            outgoing.entry(from).or_default().push(idx);
            incoming.entry(to).or_default().push(idx);
        }

        for bucket in outgoing.values_mut().chain(incoming.values_mut()) {
            bucket.sort_by(|&a, &b| edges[b].specificity.cmp(&edges[a].specificity));
        }

        Self {
            nodes,
            edges,
            outgoing,
            incoming,
        }
    }

    /// Every distinct media URN appearing as a node, in canonical-string
    /// order.
    #[must_use]
    pub fn get_nodes(&self) -> &BTreeSet<String> {
        &self.nodes
    }

    /// Every edge in the graph, in construction order.
    #[must_use]
    pub fn get_edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Edges leaving `node`, sorted by specificity descending.
    #[must_use]
    pub fn get_outgoing(&self, node: &str) -> Vec<&Edge> {
        self.outgoing
            .get(node)
            .map(|idxs| idxs.iter().map(|&i| &self.edges[i]).collect())
            .unwrap_or_default()
    }

    /// Edges arriving at `node`, sorted by specificity descending.
    #[must_use]
    pub fn get_incoming(&self, node: &str) -> Vec<&Edge> {
        self.incoming
            .get(node)
            .map(|idxs| idxs.iter().map(|&i| &self.edges[i]).collect())
            .unwrap_or_default()
    }

    /// Parallel edges directly from `from` to `to`, sorted by specificity
    /// descending.
    #[must_use]
    pub fn get_direct_edges(&self, from: &str, to: &str) -> Vec<&Edge> {
        let mut found: Vec<&Edge> = self
            .get_outgoing(from)
            .into_iter()
            .filter(|e| e.to.to_string() == to)
            .collect();
        found.sort_by(|a, b| b.specificity.cmp(&a.specificity));
        found
    }

    /// `true` iff `to` is reachable from `from` via outgoing edges.
    /// `from == to` is trivially reachable.
    #[must_use]
    pub fn can_convert(&self, from: &str, to: &str) -> bool {
        if from == to {
            return true;
        }
        self.bfs_shortest(from, to).is_some()
    }

    /// The shortest path (by edge count) from `from` to `to`, with ties
    /// among equal-length paths broken by higher specificity at the
    /// earliest point of divergence.
    ///
    /// Returns `Some(vec![])` when `from == to`, `None` when unreachable.
    #[must_use]
    pub fn find_path(&self, from: &str, to: &str) -> Option<Vec<Edge>> {
        if from == to {
            return Some(Vec::new());
        }
        self.bfs_shortest(from, to)
    }

    fn bfs_shortest(&self, from: &str, to: &str) -> Option<Vec<Edge>> {
        // BFS layer by layer so at each depth we pick the highest-specificity
        // continuation first, which (combined with first-arrival-wins)
        // implements "ties broken by higher specificity at earliest
        // divergence" without needing a full path comparison.
        let mut visited: BTreeSet<String> = BTreeSet::new();
        let mut frontier: VecDeque<(String, Vec<Edge>)> = VecDeque::new();
        visited.insert(from.to_string());
        frontier.push_back((from.to_string(), Vec::new()));

        while let Some((node, path)) = frontier.pop_front() {
            for edge in self.get_outgoing(&node) {
                let next = edge.to.to_string();
                if next == to {
                    let mut full = path.clone();
                    full.push(edge.clone());
                    return Some(full);
                }
                if visited.insert(next.clone()) {
                    let mut next_path = path.clone();
                    next_path.push(edge.clone());
                    frontier.push_back((next, next_path));
                }
            }
        }
        None
    }

    /// All simple paths from `from` to `to` of at most `max_depth` edges,
    /// sorted by path length ascending, then by summed specificity
    /// descending.
    #[must_use]
    pub fn find_all_paths(&self, from: &str, to: &str, max_depth: usize) -> Vec<Vec<Edge>> {
        let mut results = Vec::new();
        let mut visiting: BTreeSet<String> = BTreeSet::new();
        let mut path: Vec<Edge> = Vec::new();
        visiting.insert(from.to_string());
        self.dfs_paths(from, to, max_depth, &mut visiting, &mut path, &mut results);

        results.sort_by(|a, b| {
            a.len().cmp(&b.len()).then_with(|| {
                let sa: usize = a.iter().map(|e| e.specificity).sum();
                let sb: usize = b.iter().map(|e| e.specificity).sum();
                sb.cmp(&sa)
            })
        });
        results
    }

    fn dfs_paths(
        &self,
        node: &str,
        to: &str,
        remaining_depth: usize,
        visiting: &mut BTreeSet<String>,
        path: &mut Vec<Edge>,
        results: &mut Vec<Vec<Edge>>,
    ) {
        if remaining_depth == 0 {
            return;
        }
        for edge in self.get_outgoing(node) {
            let next = edge.to.to_string();
            if next == to {
                let mut found = path.clone();
                found.push(edge.clone());
                results.push(found);
                continue;
            }
            if visiting.contains(&next) {
                continue;
            }
            visiting.insert(next.clone());
            path.push(edge.clone());
            self.dfs_paths(&next, to, remaining_depth - 1, visiting, path, results);
            path.pop();
            visiting.remove(&next);
        }
    }

    /// Node/edge counts, and how many distinct nodes serve as some edge's
    /// source or destination.
    #[must_use]
    pub fn stats(&self) -> GraphStats {
        GraphStats {
            node_count: self.nodes.len(),
            edge_count: self.edges.len(),
            input_spec_count: self.outgoing.len(),
            output_spec_count: self.incoming.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(from: &str, to: &str, specificity: usize) -> Edge {
        Edge {
            from: MediaUrn::parse(from).unwrap(),
            to: MediaUrn::parse(to).unwrap(),
            cap: CapUrn::parse("cap:op=convert").unwrap(),
            registry_name: "r".into(),
            set_name: "s".into(),
            specificity,
        }
    }

    #[test]
    fn s3_transitive_graph_path() {
        let graph = Graph::new(vec![
            edge("media:binary", "media:string", 2),
            edge("media:string", "media:object", 2),
        ]);
        assert!(graph.can_convert("media:binary", "media:object"));
        let path = graph.find_path("media:binary", "media:object").unwrap();
        assert_eq!(path.len(), 2);
        assert_eq!(path[0].to.to_string(), "media:string");
        assert_eq!(path[1].to.to_string(), "media:object");
    }

    #[test]
    fn find_path_same_node_is_empty_not_none() {
        let graph = Graph::new(vec![edge("media:binary", "media:string", 1)]);
        assert_eq!(graph.find_path("media:binary", "media:binary"), Some(vec![]));
    }

    #[test]
    fn find_path_unreachable_is_none() {
        let graph = Graph::new(vec![edge("media:binary", "media:string", 1)]);
        assert_eq!(graph.find_path("media:string", "media:binary"), None);
    }

    #[test]
    fn parallel_edges_sorted_by_specificity_desc() {
        let graph = Graph::new(vec![
            edge("media:binary", "media:string", 1),
            edge("media:binary", "media:string", 3),
            edge("media:binary", "media:string", 2),
        ]);
        let direct = graph.get_direct_edges("media:binary", "media:string");
        let specificities: Vec<usize> = direct.iter().map(|e| e.specificity).collect();
        assert_eq!(specificities, vec![3, 2, 1]);
    }

    #[test]
    fn find_all_paths_sorted_by_length_then_specificity() {
        let graph = Graph::new(vec![
            edge("media:a", "media:b", 1),
            edge("media:b", "media:c", 1),
            edge("media:a", "media:c", 5),
        ]);
        let paths = graph.find_all_paths("media:a", "media:c", 4);
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0].len(), 1);
        assert_eq!(paths[0][0].specificity, 5);
        assert_eq!(paths[1].len(), 2);
    }

    #[test]
    fn find_all_paths_respects_max_depth() {
        let graph = Graph::new(vec![
            edge("media:a", "media:b", 1),
            edge("media:b", "media:c", 1),
            edge("media:c", "media:d", 1),
        ]);
        assert!(graph.find_all_paths("media:a", "media:d", 2).is_empty());
        assert_eq!(graph.find_all_paths("media:a", "media:d", 3).len(), 1);
    }

    #[test]
    fn graph_recompute_is_stable_over_unchanged_input() {
        let edges = vec![edge("media:a", "media:b", 1)];
        let g1 = Graph::new(edges.clone());
        let g2 = Graph::new(edges);
        assert_eq!(g1.get_nodes(), g2.get_nodes());
        assert_eq!(g1.get_edges(), g2.get_edges());
    }

    #[test]
    fn stats_counts_nodes_and_edges() {
        let graph = Graph::new(vec![
            edge("media:a", "media:b", 1),
            edge("media:a", "media:c", 1),
        ]);
        let stats = graph.stats();
        assert_eq!(stats.node_count, 3);
        assert_eq!(stats.edge_count, 2);
        assert_eq!(stats.input_spec_count, 1);
        assert_eq!(stats.output_spec_count, 2);
    }

    proptest::proptest! {
        #[test]
        fn law5_graph_completeness_on_a_single_chain(
            specs in proptest::collection::vec(1usize..5, 1..6),
        ) {
            // A straight chain media:n0 -> media:n1 -> ... built from random
            // per-edge specificities: every node is reachable from node 0,
            // and `find_path`'s length always matches the BFS hop count.
            let mut edges = Vec::new();
            for (i, specificity) in specs.iter().enumerate() {
                edges.push(edge(&format!("media:n{i}"), &format!("media:n{}", i + 1), *specificity));
            }
            let graph = Graph::new(edges);
            let last = format!("media:n{}", specs.len());
            proptest::prop_assert!(graph.can_convert("media:n0", &last));
            let path = graph.find_path("media:n0", &last).unwrap();
            proptest::prop_assert_eq!(path.len(), specs.len());
        }

        #[test]
        fn find_all_paths_never_exceeds_max_depth(
            specs in proptest::collection::vec(1usize..5, 1..6),
            max_depth in 1usize..8,
        ) {
            let mut edges = Vec::new();
            for (i, specificity) in specs.iter().enumerate() {
                edges.push(edge(&format!("media:n{i}"), &format!("media:n{}", i + 1), *specificity));
            }
            let graph = Graph::new(edges);
            let last = format!("media:n{}", specs.len());
            let paths = graph.find_all_paths("media:n0", &last, max_depth);
            for path in &paths {
                proptest::prop_assert!(path.len() <= max_depth);
            }
        }
    }
}
