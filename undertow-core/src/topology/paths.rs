//! Reference shortest paths computed with full topology knowledge
//!
//! Independent of the distance-vector protocol; used to cross-check converged
//! routing tables and to answer path queries.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use crate::routing::{Cost, NodeId};

/// Single-source shortest paths.
#[derive(Debug, Clone)]
pub struct ShortestPaths {
    source: NodeId,
    costs: BTreeMap<NodeId, Cost>,
    predecessors: BTreeMap<NodeId, NodeId>,
}

impl ShortestPaths {
    /// Runs Dijkstra from `source` over an adjacency list.
    pub fn dijkstra(adjacency: &BTreeMap<NodeId, BTreeMap<NodeId, Cost>>, source: &NodeId) -> Self {
        let mut costs: BTreeMap<NodeId, Cost> = adjacency
            .keys()
            .map(|node| (node.clone(), Cost::INFINITY))
            .collect();
        let mut predecessors = BTreeMap::new();
        let mut heap = BinaryHeap::new();

        costs.insert(source.clone(), Cost::ZERO);
        heap.push(Reverse((Cost::ZERO, source.clone())));

        while let Some(Reverse((cost, node))) = heap.pop() {
            if cost > costs.get(&node).copied().unwrap_or(Cost::INFINITY) {
                continue;
            }
            let Some(neighbors) = adjacency.get(&node) else {
                continue;
            };
            for (neighbor, link) in neighbors {
                let candidate = cost + *link;
                if candidate < costs.get(neighbor).copied().unwrap_or(Cost::INFINITY) {
                    costs.insert(neighbor.clone(), candidate);
                    predecessors.insert(neighbor.clone(), node.clone());
                    heap.push(Reverse((candidate, neighbor.clone())));
                }
            }
        }

        Self {
            source: source.clone(),
            costs,
            predecessors,
        }
    }

    /// Returns the source router.
    pub fn source(&self) -> &NodeId {
        &self.source
    }

    /// Returns the cost to `dest`, infinity when unreachable or unknown.
    pub fn cost_to(&self, dest: &NodeId) -> Cost {
        self.costs.get(dest).copied().unwrap_or(Cost::INFINITY)
    }

    /// Returns all costs keyed by destination.
    pub fn costs(&self) -> &BTreeMap<NodeId, Cost> {
        &self.costs
    }

    /// Returns the hop sequence from the source to `dest`, inclusive.
    pub fn path_to(&self, dest: &NodeId) -> Option<Vec<NodeId>> {
        if self.cost_to(dest).is_infinite() {
            return None;
        }

        let mut path = vec![dest.clone()];
        let mut current = dest;
        while current != &self.source {
            current = self.predecessors.get(current)?;
            path.push(current.clone());
        }
        path.reverse();
        Some(path)
    }
}
