//! Structural statistics of a topology

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::routing::{Cost, NodeId};

/// Summary of a topology's shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologyStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub average_degree: f64,
    /// Largest hop distance between two routers of the same component
    pub hop_diameter: usize,
    /// Whether every router can reach every other router
    pub connected: bool,
}

impl TopologyStats {
    /// Computes statistics from an adjacency list.
    pub fn compute(adjacency: &BTreeMap<NodeId, BTreeMap<NodeId, Cost>>) -> Self {
        let node_count = adjacency.len();
        let degree_sum: usize = adjacency.values().map(BTreeMap::len).sum();
        let edge_count = degree_sum / 2;
        let average_degree = if node_count == 0 {
            0.0
        } else {
            degree_sum as f64 / node_count as f64
        };

        let mut hop_diameter = 0;
        let mut connected = true;
        for source in adjacency.keys() {
            let hops = hop_distances(adjacency, source);
            if hops.len() < node_count {
                connected = false;
            }
            hop_diameter = hop_diameter.max(hops.values().copied().max().unwrap_or(0));
        }

        Self {
            node_count,
            edge_count,
            average_degree,
            hop_diameter,
            connected,
        }
    }

    /// Round budget under which a static topology must converge.
    ///
    /// Node count times hop diameter, plus the quiescent round that confirms
    /// convergence.
    pub fn convergence_round_bound(&self) -> usize {
        self.node_count * self.hop_diameter.max(1) + 1
    }
}

fn hop_distances(
    adjacency: &BTreeMap<NodeId, BTreeMap<NodeId, Cost>>,
    source: &NodeId,
) -> BTreeMap<NodeId, usize> {
    let mut hops = BTreeMap::new();
    let mut queue = VecDeque::new();
    hops.insert(source.clone(), 0);
    queue.push_back(source.clone());

    while let Some(node) = queue.pop_front() {
        let distance = hops.get(&node).copied().unwrap_or(0);
        if let Some(neighbors) = adjacency.get(&node) {
            for neighbor in neighbors.keys() {
                if !hops.contains_key(neighbor) {
                    hops.insert(neighbor.clone(), distance + 1);
                    queue.push_back(neighbor.clone());
                }
            }
        }
    }

    hops
}

#[cfg(test)]
mod tests {
    use crate::topology::{EdgeRecord, Topology};

    #[test]
    fn test_chain_stats() {
        let topology = Topology::from_records(vec![
            EdgeRecord::new("A", "B", 1),
            EdgeRecord::new("B", "C", 1),
            EdgeRecord::new("C", "D", 1),
        ])
        .unwrap();

        let stats = topology.stats();
        assert_eq!(stats.node_count, 4);
        assert_eq!(stats.edge_count, 3);
        assert_eq!(stats.hop_diameter, 3);
        assert!(stats.connected);
        assert!((stats.average_degree - 1.5).abs() < f64::EPSILON);
        assert_eq!(stats.convergence_round_bound(), 13);
    }

    #[test]
    fn test_disconnected_stats() {
        let topology = Topology::from_records(vec![
            EdgeRecord::new("A", "B", 1),
            EdgeRecord::new("C", "D", 1),
        ])
        .unwrap();

        let stats = topology.stats();
        assert!(!stats.connected);
        assert_eq!(stats.hop_diameter, 1);
    }
}
