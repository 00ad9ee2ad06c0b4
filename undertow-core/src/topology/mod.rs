//! Validated network topology built from parsed edge records
//!
//! The topology collaborator hands over an ordered list of edge records; this
//! module checks them once at load time and produces the undirected edge set
//! the network is built from.

pub mod paths;
pub mod stats;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

pub use paths::ShortestPaths;
pub use stats::TopologyStats;

use crate::routing::{Cost, NodeId};

/// Raw edge record as produced by a topology loader.
///
/// The cost is signed so that non-positive values can be reported instead of
/// being lost in a conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub a: NodeId,
    pub b: NodeId,
    pub cost: i64,
}

impl EdgeRecord {
    /// Creates an edge record.
    pub fn new(a: impl Into<NodeId>, b: impl Into<NodeId>, cost: i64) -> Self {
        Self {
            a: a.into(),
            b: b.into(),
            cost,
        }
    }
}

/// Unordered pair of routers, stored with the smaller identifier first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeKey {
    low: NodeId,
    high: NodeId,
}

impl EdgeKey {
    /// Creates a normalized key; argument order does not matter.
    pub fn new(a: NodeId, b: NodeId) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    /// Returns the endpoint with the smaller identifier.
    pub fn low(&self) -> &NodeId {
        &self.low
    }

    /// Returns the endpoint with the larger identifier.
    pub fn high(&self) -> &NodeId {
        &self.high
    }

    /// Returns true if `node` is one of the endpoints.
    pub fn touches(&self, node: &NodeId) -> bool {
        self.low == *node || self.high == *node
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.low, self.high)
    }
}

/// Undirected link with its current cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub key: EdgeKey,
    pub cost: Cost,
}

/// Errors rejecting a topology at load time.
///
/// Every variant names the zero-based index of the offending record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopologyError {
    #[error("Topology contains no edges")]
    Empty,

    #[error("Record {index}: self-loop on router {node}")]
    SelfLoop { index: usize, node: NodeId },

    #[error("Record {index}: link {a}-{b} has non-positive cost {cost}")]
    NonPositiveCost {
        index: usize,
        a: NodeId,
        b: NodeId,
        cost: i64,
    },

    #[error("Record {index}: link {a}-{b} cost {cost} exceeds the maximum finite cost")]
    CostTooLarge {
        index: usize,
        a: NodeId,
        b: NodeId,
        cost: i64,
    },

    #[error("Record {index}: link {a}-{b} redeclared with cost {second}, previously {first}")]
    ConflictingDuplicate {
        index: usize,
        a: NodeId,
        b: NodeId,
        first: Cost,
        second: Cost,
    },
}

/// Validated set of routers and symmetric link costs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    nodes: BTreeSet<NodeId>,
    edges: BTreeMap<EdgeKey, Cost>,
}

impl Topology {
    /// Validates edge records and builds the topology.
    ///
    /// Exact duplicate records (same pair, same cost, either direction) are
    /// collapsed into one link.
    ///
    /// # Errors
    /// - `TopologyError::Empty` - No records supplied
    /// - `TopologyError::SelfLoop` - Record connects a router to itself
    /// - `TopologyError::NonPositiveCost` - Cost is zero or negative
    /// - `TopologyError::CostTooLarge` - Cost collides with the infinite sentinel
    /// - `TopologyError::ConflictingDuplicate` - Pair redeclared with a different cost
    pub fn from_records<I>(records: I) -> Result<Self, TopologyError>
    where
        I: IntoIterator<Item = EdgeRecord>,
    {
        let mut nodes = BTreeSet::new();
        let mut edges = BTreeMap::new();

        for (index, record) in records.into_iter().enumerate() {
            let EdgeRecord { a, b, cost } = record;

            if a == b {
                return Err(TopologyError::SelfLoop { index, node: a });
            }
            if cost <= 0 {
                return Err(TopologyError::NonPositiveCost { index, a, b, cost });
            }
            if cost >= i64::from(Cost::INFINITY.as_u32()) {
                return Err(TopologyError::CostTooLarge { index, a, b, cost });
            }

            let cost_value = Cost::from_i64_clamped(cost);
            let key = EdgeKey::new(a.clone(), b.clone());
            if let Some(&first) = edges.get(&key) {
                if first != cost_value {
                    return Err(TopologyError::ConflictingDuplicate {
                        index,
                        a,
                        b,
                        first,
                        second: cost_value,
                    });
                }
                tracing::debug!("Record {}: duplicate link {} ignored", index, key);
                continue;
            }

            nodes.insert(a);
            nodes.insert(b);
            edges.insert(key, cost_value);
        }

        if edges.is_empty() {
            return Err(TopologyError::Empty);
        }

        tracing::debug!(
            "Topology loaded: {} routers, {} links",
            nodes.len(),
            edges.len()
        );

        Ok(Self { nodes, edges })
    }

    /// Returns every router in identifier order.
    pub fn nodes(&self) -> &BTreeSet<NodeId> {
        &self.nodes
    }

    /// Returns every undirected link with its cost.
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.edges.iter().map(|(key, cost)| Edge {
            key: key.clone(),
            cost: *cost,
        })
    }

    pub(crate) fn edge_map(&self) -> &BTreeMap<EdgeKey, Cost> {
        &self.edges
    }

    /// Returns the number of undirected links.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Returns the cost of the link between `a` and `b`.
    pub fn link_cost(&self, a: &NodeId, b: &NodeId) -> Option<Cost> {
        self.edges
            .get(&EdgeKey::new(a.clone(), b.clone()))
            .copied()
    }

    /// Returns the adjacency list with link costs.
    pub fn adjacency(&self) -> BTreeMap<NodeId, BTreeMap<NodeId, Cost>> {
        adjacency_of(&self.nodes, &self.edges)
    }

    /// Computes summary statistics.
    pub fn stats(&self) -> TopologyStats {
        TopologyStats::compute(&self.adjacency())
    }

    /// Computes reference shortest paths from `source`.
    pub fn shortest_paths(&self, source: &NodeId) -> ShortestPaths {
        ShortestPaths::dijkstra(&self.adjacency(), source)
    }
}

pub(crate) fn adjacency_of(
    nodes: &BTreeSet<NodeId>,
    edges: &BTreeMap<EdgeKey, Cost>,
) -> BTreeMap<NodeId, BTreeMap<NodeId, Cost>> {
    let mut adjacency: BTreeMap<NodeId, BTreeMap<NodeId, Cost>> = nodes
        .iter()
        .map(|node| (node.clone(), BTreeMap::new()))
        .collect();

    for (key, cost) in edges {
        adjacency
            .entry(key.low().clone())
            .or_default()
            .insert(key.high().clone(), *cost);
        adjacency
            .entry(key.high().clone())
            .or_default()
            .insert(key.low().clone(), *cost);
    }

    adjacency
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classic() -> Vec<EdgeRecord> {
        vec![
            EdgeRecord::new("A", "B", 2),
            EdgeRecord::new("A", "C", 5),
            EdgeRecord::new("B", "C", 1),
            EdgeRecord::new("B", "D", 3),
            EdgeRecord::new("C", "D", 2),
        ]
    }

    #[test]
    fn test_valid_topology() {
        let topology = Topology::from_records(classic()).unwrap();
        assert_eq!(topology.nodes().len(), 4);
        assert_eq!(topology.edge_count(), 5);
        assert_eq!(
            topology.link_cost(&NodeId::from("C"), &NodeId::from("B")),
            Some(Cost::new(1))
        );
    }

    #[test]
    fn test_edge_key_is_unordered() {
        let forward = EdgeKey::new(NodeId::from("B"), NodeId::from("A"));
        let backward = EdgeKey::new(NodeId::from("A"), NodeId::from("B"));
        assert_eq!(forward, backward);
        assert_eq!(forward.low().as_str(), "A");
        assert_eq!(forward.to_string(), "A-B");
    }

    #[test]
    fn test_self_loop_rejected() {
        let mut records = classic();
        records.push(EdgeRecord::new("D", "D", 1));
        let err = Topology::from_records(records).unwrap_err();
        assert_eq!(
            err,
            TopologyError::SelfLoop {
                index: 5,
                node: NodeId::from("D")
            }
        );
    }

    #[test]
    fn test_non_positive_cost_rejected() {
        let err = Topology::from_records(vec![EdgeRecord::new("A", "B", 0)]).unwrap_err();
        assert!(matches!(err, TopologyError::NonPositiveCost { index: 0, cost: 0, .. }));

        let err = Topology::from_records(vec![
            EdgeRecord::new("A", "B", 1),
            EdgeRecord::new("B", "C", -3),
        ])
        .unwrap_err();
        assert!(matches!(err, TopologyError::NonPositiveCost { index: 1, .. }));
    }

    #[test]
    fn test_sentinel_cost_rejected() {
        let err = Topology::from_records(vec![EdgeRecord::new("A", "B", i64::from(u32::MAX))])
            .unwrap_err();
        assert!(matches!(err, TopologyError::CostTooLarge { index: 0, .. }));
    }

    #[test]
    fn test_conflicting_duplicate_rejected() {
        let mut records = classic();
        records.push(EdgeRecord::new("C", "A", 7));
        let err = Topology::from_records(records).unwrap_err();
        assert_eq!(
            err,
            TopologyError::ConflictingDuplicate {
                index: 5,
                a: NodeId::from("C"),
                b: NodeId::from("A"),
                first: Cost::new(5),
                second: Cost::new(7),
            }
        );
    }

    #[test]
    fn test_exact_duplicate_collapsed() {
        let mut records = classic();
        records.push(EdgeRecord::new("D", "C", 2));
        let topology = Topology::from_records(records).unwrap();
        assert_eq!(topology.edge_count(), 5);
    }

    #[test]
    fn test_empty_topology_rejected() {
        assert_eq!(
            Topology::from_records(Vec::new()).unwrap_err(),
            TopologyError::Empty
        );
    }

    #[test]
    fn test_adjacency_is_symmetric() {
        let topology = Topology::from_records(classic()).unwrap();
        let adjacency = topology.adjacency();
        for (node, neighbors) in &adjacency {
            for (neighbor, cost) in neighbors {
                assert_eq!(adjacency[neighbor].get(node), Some(cost));
            }
        }
    }
}
