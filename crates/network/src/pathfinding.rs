//! Shortest-path and simple-path queries over a [`NetworkGraph`].
//!
//! Shortest paths use Dijkstra's algorithm, which is valid because route
//! weights are non-negative (enforced by [`NetworkGraph::add_edge`]). When
//! several paths share the minimum weight, which one is returned is
//! unspecified and may change between releases.
//!
//! [`PathFinder::all_simple_paths`] is exponential in the worst case. It is
//! meant for sparse supply-chain networks; dense graphs can produce an
//! unbounded number of paths and the enumeration is not capped.

use crate::graph::{NetworkGraph, Result, WeightKey};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Result of a shortest-path query.
///
/// An unreachable destination is a result, not an error: the path is empty
/// and the total is infinite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortestPath {
    /// Node ids from start to end, inclusive.
    pub path: Vec<String>,
    /// Sum of the chosen weight along the path.
    pub total: f64,
}

impl ShortestPath {
    pub fn unreachable() -> Self {
        Self {
            path: Vec::new(),
            total: f64::INFINITY,
        }
    }

    pub fn is_found(&self) -> bool {
        !self.path.is_empty()
    }
}

/// Heap entry ordered so that `BinaryHeap` pops the cheapest node first.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    cost: f64,
    node: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

/// Path queries over a borrowed graph.
pub struct PathFinder<'a> {
    graph: &'a NetworkGraph,
}

impl<'a> PathFinder<'a> {
    pub fn new(graph: &'a NetworkGraph) -> Self {
        Self { graph }
    }

    /// Minimum-total-weight path from `start` to `end`.
    ///
    /// Fails with `NodeNotFound` if either endpoint is absent from the graph.
    pub fn shortest_path(&self, start: &str, end: &str, key: WeightKey) -> Result<ShortestPath> {
        let source = self.graph.require(start)?;
        let target = self.graph.require(end)?;

        let n = self.graph.node_count();
        let mut dist = vec![f64::INFINITY; n];
        let mut prev: Vec<Option<usize>> = vec![None; n];
        let mut heap = BinaryHeap::new();

        dist[source] = 0.0;
        heap.push(Candidate {
            cost: 0.0,
            node: source,
        });

        while let Some(Candidate { cost, node }) = heap.pop() {
            if node == target {
                break;
            }
            if cost > dist[node] {
                continue;
            }
            for &(next, route) in self.graph.successors(node) {
                let candidate = cost + self.graph.route_at(route).weight(key);
                if candidate < dist[next] {
                    dist[next] = candidate;
                    prev[next] = Some(node);
                    heap.push(Candidate {
                        cost: candidate,
                        node: next,
                    });
                }
            }
        }

        if dist[target].is_infinite() {
            return Ok(ShortestPath::unreachable());
        }

        let mut order = vec![target];
        let mut cursor = target;
        while let Some(p) = prev[cursor] {
            order.push(p);
            cursor = p;
        }
        order.reverse();

        Ok(ShortestPath {
            path: self.ids(&order),
            total: dist[target],
        })
    }

    /// Every path from `start` to `end` that visits no node twice, in no particular order.
    ///
    /// Returns an empty list when `end` is unreachable or equal to `start`.
    pub fn all_simple_paths(&self, start: &str, end: &str) -> Result<Vec<Vec<String>>> {
        let source = self.graph.require(start)?;
        let target = self.graph.require(end)?;

        let mut paths = Vec::new();
        if source == target {
            return Ok(paths);
        }

        let mut on_path = vec![false; self.graph.node_count()];
        // (node, index of the next successor to explore)
        let mut stack: Vec<(usize, usize)> = vec![(source, 0)];
        on_path[source] = true;

        while let Some(frame) = stack.last_mut() {
            let (node, cursor) = *frame;
            let successors = self.graph.successors(node);

            if cursor >= successors.len() {
                on_path[node] = false;
                stack.pop();
                continue;
            }
            frame.1 += 1;

            let next = successors[cursor].0;
            if on_path[next] {
                continue;
            }
            if next == target {
                let mut order: Vec<usize> = stack.iter().map(|&(n, _)| n).collect();
                order.push(target);
                paths.push(self.ids(&order));
                continue;
            }
            on_path[next] = true;
            stack.push((next, 0));
        }

        Ok(paths)
    }

    fn ids(&self, order: &[usize]) -> Vec<String> {
        order
            .iter()
            .map(|&i| self.graph.company_at(i).id.clone())
            .collect()
    }
}
