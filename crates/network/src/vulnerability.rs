//! Single-point-of-failure detection.
//!
//! Articulation points are computed on an undirected projection of the
//! network: two companies are adjacent if a route exists in either direction.
//! The projection is a separate structure; the directed graph is never modified.

use crate::graph::NetworkGraph;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Kind of weakness found in the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VulnerabilityKind {
    SinglePointOfFailure,
}

/// A finding about a single company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vulnerability {
    #[serde(rename = "type")]
    pub kind: VulnerabilityKind,
    /// Company id.
    pub node: String,
    /// Company display name.
    pub name: String,
    pub description: String,
}

/// Undirected, simple adjacency built from a directed graph.
///
/// Parallel and opposite routes collapse to one edge; self loops are dropped.
#[derive(Debug, Clone)]
pub struct UndirectedProjection {
    adjacency: Vec<Vec<usize>>,
}

impl UndirectedProjection {
    pub fn from_graph(graph: &NetworkGraph) -> Self {
        let n = graph.node_count();
        let mut sets = vec![BTreeSet::new(); n];
        for u in 0..n {
            for &(v, _) in graph.successors(u) {
                if u != v {
                    sets[u].insert(v);
                    sets[v].insert(u);
                }
            }
        }
        Self {
            adjacency: sets.into_iter().map(|s| s.into_iter().collect()).collect(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn neighbours(&self, u: usize) -> &[usize] {
        &self.adjacency[u]
    }

    /// Number of connected components, ignoring the node `removed` if given.
    pub fn component_count(&self, removed: Option<usize>) -> usize {
        let n = self.node_count();
        let mut seen = vec![false; n];
        if let Some(r) = removed {
            seen[r] = true;
        }

        let mut components = 0;
        let mut stack = Vec::new();
        for root in 0..n {
            if seen[root] {
                continue;
            }
            components += 1;
            seen[root] = true;
            stack.push(root);
            while let Some(u) = stack.pop() {
                for &v in self.neighbours(u) {
                    if !seen[v] {
                        seen[v] = true;
                        stack.push(v);
                    }
                }
            }
        }
        components
    }

    /// Positions of every cut vertex, ascending.
    ///
    /// Iterative Tarjan low-link DFS so deep chains cannot overflow the call stack.
    pub fn articulation_points(&self) -> Vec<usize> {
        let n = self.node_count();
        let mut disc: Vec<Option<usize>> = vec![None; n];
        let mut low = vec![0usize; n];
        let mut parent: Vec<Option<usize>> = vec![None; n];
        let mut is_cut = vec![false; n];
        let mut clock = 0usize;

        for root in 0..n {
            if disc[root].is_some() {
                continue;
            }
            disc[root] = Some(clock);
            low[root] = clock;
            clock += 1;

            let mut root_children = 0usize;
            // (node, index of the next neighbour to visit)
            let mut stack: Vec<(usize, usize)> = vec![(root, 0)];

            while let Some(frame) = stack.last_mut() {
                let (u, cursor) = *frame;
                let neighbours = self.neighbours(u);

                if cursor < neighbours.len() {
                    frame.1 += 1;
                    let v = neighbours[cursor];
                    match disc[v] {
                        None => {
                            disc[v] = Some(clock);
                            low[v] = clock;
                            clock += 1;
                            parent[v] = Some(u);
                            if u == root {
                                root_children += 1;
                            }
                            stack.push((v, 0));
                        }
                        Some(dv) if parent[u] != Some(v) => {
                            low[u] = low[u].min(dv);
                        }
                        Some(_) => {}
                    }
                    continue;
                }

                stack.pop();
                if let Some(p) = parent[u] {
                    low[p] = low[p].min(low[u]);
                    let dp = disc[p].unwrap_or_default();
                    if p != root && low[u] >= dp {
                        is_cut[p] = true;
                    }
                }
            }

            if root_children >= 2 {
                is_cut[root] = true;
            }
        }

        (0..n).filter(|&i| is_cut[i]).collect()
    }
}

/// Vulnerability queries over a borrowed graph.
pub struct VulnerabilityAnalyzer<'a> {
    graph: &'a NetworkGraph,
}

impl<'a> VulnerabilityAnalyzer<'a> {
    pub fn new(graph: &'a NetworkGraph) -> Self {
        Self { graph }
    }

    /// Ids of every company whose removal disconnects part of the network,
    /// in company insertion order.
    pub fn articulation_points(&self) -> Vec<String> {
        UndirectedProjection::from_graph(self.graph)
            .articulation_points()
            .into_iter()
            .map(|i| self.graph.company_at(i).id.clone())
            .collect()
    }

    /// One finding per articulation point.
    pub fn detect_vulnerabilities(&self) -> Vec<Vulnerability> {
        UndirectedProjection::from_graph(self.graph)
            .articulation_points()
            .into_iter()
            .map(|i| {
                let company = self.graph.company_at(i);
                Vulnerability {
                    kind: VulnerabilityKind::SinglePointOfFailure,
                    node: company.id.clone(),
                    name: company.name.clone(),
                    description: format!("{} is a critical node", company.name),
                }
            })
            .collect()
    }
}
