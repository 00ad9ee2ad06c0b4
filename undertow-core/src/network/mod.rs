//! Network of routers and the protocol that drives them
//!
//! The network owns every router and every link. It is the only place link
//! costs change, and the only place routers talk to each other: through the
//! synchronous exchange round in [`exchange`].

pub mod convergence;
pub mod exchange;
pub mod mutation;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

pub use convergence::{ConvergenceDetector, ConvergenceStatus};
pub use exchange::{Announcement, RoundOutcome};
pub use mutation::{CostRange, LinkCostChange, LinkCostMutator};

use crate::routing::{
    Cost, DistanceVector, MessageCounts, NodeId, RouteChange, RouterState, RoutingError,
    RoutingTable,
};
use crate::topology::{Edge, EdgeKey, ShortestPaths, Topology, TopologyStats, adjacency_of};

/// Set of routers exchanging distance vectors over symmetric links.
#[derive(Debug, Clone)]
pub struct Network {
    nodes: BTreeSet<NodeId>,
    routers: BTreeMap<NodeId, RouterState>,
    edges: BTreeMap<EdgeKey, Cost>,
    rounds: u64,
    messages_sent: u64,
    quiescent: bool,
}

impl Network {
    /// Creates one router per topology node and initializes every table.
    pub fn from_topology(topology: &Topology) -> Self {
        let nodes = topology.nodes().clone();
        let routers = topology
            .adjacency()
            .into_iter()
            .map(|(id, neighbors)| {
                let mut router = RouterState::with_neighbors(id.clone(), neighbors);
                router.initialize(&nodes);
                (id, router)
            })
            .collect();

        tracing::debug!(
            "Network created with {} routers and {} links",
            nodes.len(),
            topology.edge_count()
        );

        Self {
            nodes,
            routers,
            edges: topology.edge_map().clone(),
            rounds: 0,
            messages_sent: 0,
            quiescent: false,
        }
    }

    /// Returns router identifiers in order.
    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.iter()
    }

    /// Returns the number of routers.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if `node` is a router of this network.
    pub fn contains(&self, node: &NodeId) -> bool {
        self.routers.contains_key(node)
    }

    /// Returns the state of one router.
    ///
    /// # Errors
    /// - `RoutingError::UnknownNode` - No router with this identifier
    pub fn router(&self, node: &NodeId) -> Result<&RouterState, RoutingError> {
        self.routers
            .get(node)
            .ok_or_else(|| RoutingError::UnknownNode { node: node.clone() })
    }

    /// Iterates routers in identifier order.
    pub fn routers(&self) -> impl Iterator<Item = &RouterState> {
        self.routers.values()
    }

    /// Returns the routing table of `node`.
    ///
    /// # Errors
    /// - `RoutingError::UnknownNode` - No router with this identifier
    pub fn routing_table(&self, node: &NodeId) -> Result<&RoutingTable, RoutingError> {
        self.router(node).map(RouterState::routing_table)
    }

    /// Returns the distance vector of `node`.
    ///
    /// # Errors
    /// - `RoutingError::UnknownNode` - No router with this identifier
    pub fn distance_vector(&self, node: &NodeId) -> Result<DistanceVector, RoutingError> {
        self.router(node).map(RouterState::distance_vector)
    }

    /// Returns the direct neighbors of `node` with their link costs.
    ///
    /// # Errors
    /// - `RoutingError::UnknownNode` - No router with this identifier
    pub fn neighbors(&self, node: &NodeId) -> Result<&BTreeMap<NodeId, Cost>, RoutingError> {
        self.router(node).map(RouterState::neighbors)
    }

    /// Returns message counters of `node`.
    ///
    /// # Errors
    /// - `RoutingError::UnknownNode` - No router with this identifier
    pub fn message_counts(&self, node: &NodeId) -> Result<MessageCounts, RoutingError> {
        self.router(node).map(RouterState::message_counts)
    }

    /// Returns every link with its current cost.
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.edges.iter().map(|(key, cost)| Edge {
            key: key.clone(),
            cost: *cost,
        })
    }

    /// Returns the number of links.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Returns the current cost of the link between `a` and `b`.
    ///
    /// # Errors
    /// - `RoutingError::UnknownNode` - Either endpoint is not a router
    /// - `RoutingError::NotNeighbors` - No link joins the two routers
    pub fn link_cost(&self, a: &NodeId, b: &NodeId) -> Result<Cost, RoutingError> {
        for node in [a, b] {
            if !self.contains(node) {
                return Err(RoutingError::UnknownNode { node: node.clone() });
            }
        }
        self.edges
            .get(&EdgeKey::new(a.clone(), b.clone()))
            .copied()
            .ok_or_else(|| RoutingError::NotNeighbors {
                a: a.clone(),
                b: b.clone(),
            })
    }

    /// Returns the number of completed exchange rounds.
    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    /// Returns the number of distance vectors sent so far.
    pub fn total_messages(&self) -> u64 {
        self.messages_sent
    }

    /// Returns true when the last exchange round changed nothing and no link
    /// cost has changed since.
    pub fn is_converged(&self) -> bool {
        self.quiescent
    }

    /// Computes topology statistics over the current links.
    pub fn stats(&self) -> TopologyStats {
        TopologyStats::compute(&self.adjacency())
    }

    /// Computes reference shortest paths from `source` over the current links.
    ///
    /// # Errors
    /// - `RoutingError::UnknownNode` - No router with this identifier
    pub fn reference_paths(&self, source: &NodeId) -> Result<ShortestPaths, RoutingError> {
        self.router(source)?;
        Ok(ShortestPaths::dijkstra(&self.adjacency(), source))
    }

    /// Returns the vector `sender` would announce to `receiver`.
    ///
    /// # Errors
    /// - `RoutingError::UnknownNode` - Either endpoint is not a router
    /// - `RoutingError::NotNeighbors` - No link joins the two routers
    pub fn announce(&self, sender: &NodeId, receiver: &NodeId) -> Result<DistanceVector, RoutingError> {
        self.link_cost(sender, receiver)?;
        self.router(sender).map(|router| router.announce(receiver))
    }

    /// Returns every router's cost to every destination.
    ///
    /// Only meaningful once the protocol has settled, so the matrix is refused
    /// until a quiescent round has run over the current link costs.
    ///
    /// # Errors
    /// - `RoutingError::NotConverged` - No quiescent round since the last change
    pub fn all_pairs_shortest_cost(&self) -> Result<ShortestCostMatrix, RoutingError> {
        if !self.quiescent {
            return Err(RoutingError::NotConverged);
        }

        let costs = self
            .routers
            .iter()
            .map(|(id, router)| {
                let row = router
                    .routing_table()
                    .iter()
                    .map(|(dest, entry)| (dest.clone(), entry.cost))
                    .collect();
                (id.clone(), row)
            })
            .collect();
        Ok(ShortestCostMatrix { costs })
    }

    /// Changes the cost of an existing link on both endpoints.
    ///
    /// Returns the previous cost and the route changes of the cascade.
    pub(crate) fn set_link_cost(
        &mut self,
        edge: &EdgeKey,
        new_cost: Cost,
    ) -> Result<(Cost, Vec<RouteChange>), RoutingError> {
        let old_cost = self.link_cost(edge.low(), edge.high())?;

        let mut changes = Vec::new();
        for (node, neighbor) in [(edge.low(), edge.high()), (edge.high(), edge.low())] {
            if let Some(router) = self.routers.get_mut(node) {
                changes.extend(router.set_neighbor_cost(neighbor, new_cost));
            }
        }
        self.edges.insert(edge.clone(), new_cost);
        self.quiescent = false;

        Ok((old_cost, changes))
    }

    pub(crate) fn routers_mut(&mut self) -> &mut BTreeMap<NodeId, RouterState> {
        &mut self.routers
    }

    pub(crate) fn record_round(&mut self, messages: usize, any_changed: bool) -> u64 {
        self.rounds += 1;
        self.messages_sent += messages as u64;
        self.quiescent = !any_changed;
        self.rounds
    }

    fn adjacency(&self) -> BTreeMap<NodeId, BTreeMap<NodeId, Cost>> {
        adjacency_of(&self.nodes, &self.edges)
    }
}

/// Cost from every router to every destination, taken from converged tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShortestCostMatrix {
    costs: BTreeMap<NodeId, BTreeMap<NodeId, Cost>>,
}

impl ShortestCostMatrix {
    /// Returns the cost from `source` to `dest`.
    pub fn cost(&self, source: &NodeId, dest: &NodeId) -> Option<Cost> {
        self.costs.get(source)?.get(dest).copied()
    }

    /// Returns the row of `source`.
    pub fn row(&self, source: &NodeId) -> Option<&BTreeMap<NodeId, Cost>> {
        self.costs.get(source)
    }

    /// Iterates rows in source order.
    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &BTreeMap<NodeId, Cost>)> {
        self.costs.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{NullObserver, RecordingObserver};
    use crate::routing::RoutingEntry;
    use crate::topology::EdgeRecord;

    pub(crate) fn classic() -> Network {
        let topology = Topology::from_records(vec![
            EdgeRecord::new("A", "B", 2),
            EdgeRecord::new("A", "C", 5),
            EdgeRecord::new("B", "C", 1),
            EdgeRecord::new("B", "D", 3),
            EdgeRecord::new("C", "D", 2),
        ])
        .unwrap();
        Network::from_topology(&topology)
    }

    fn node(name: &str) -> NodeId {
        NodeId::from(name)
    }

    #[test]
    fn test_initial_tables() {
        let network = classic();
        let table = network.routing_table(&node("A")).unwrap();

        assert_eq!(table.get(&node("A")), Some(&RoutingEntry::via(Cost::ZERO, node("A"))));
        assert_eq!(table.get(&node("B")), Some(&RoutingEntry::via(Cost::new(2), node("B"))));
        assert_eq!(table.get(&node("C")), Some(&RoutingEntry::via(Cost::new(5), node("C"))));
        assert_eq!(table.get(&node("D")), Some(&RoutingEntry::unreachable()));
        assert_eq!(network.rounds(), 0);
        assert!(!network.is_converged());
    }

    #[test]
    fn test_unknown_router_queries() {
        let network = classic();
        let err = network.routing_table(&node("Z")).unwrap_err();
        assert_eq!(err, RoutingError::UnknownNode { node: node("Z") });
        assert!(network.distance_vector(&node("Z")).is_err());
        assert!(network.message_counts(&node("Z")).is_err());
    }

    #[test]
    fn test_link_cost_queries() {
        let network = classic();
        assert_eq!(network.link_cost(&node("C"), &node("B")), Ok(Cost::new(1)));
        assert_eq!(
            network.link_cost(&node("A"), &node("D")),
            Err(RoutingError::NotNeighbors {
                a: node("A"),
                b: node("D")
            })
        );
        assert_eq!(
            network.announce(&node("A"), &node("D")),
            Err(RoutingError::NotNeighbors {
                a: node("A"),
                b: node("D")
            })
        );
    }

    #[test]
    fn test_all_pairs_refused_before_convergence() {
        let mut network = classic();
        assert_eq!(network.all_pairs_shortest_cost(), Err(RoutingError::NotConverged));

        let outcome = network.exchange_round(&mut NullObserver);
        assert!(outcome.any_changed());
        assert_eq!(network.all_pairs_shortest_cost(), Err(RoutingError::NotConverged));

        let outcome = network.exchange_round(&mut NullObserver);
        assert!(!outcome.any_changed());
        let matrix = network.all_pairs_shortest_cost().unwrap();
        assert_eq!(matrix.cost(&node("A"), &node("D")), Some(Cost::new(5)));
        assert_eq!(matrix.cost(&node("D"), &node("A")), Some(Cost::new(5)));
    }

    #[test]
    fn test_set_link_cost_is_symmetric_and_clears_convergence() {
        let mut network = classic();
        ConvergenceDetector::new(10).run(&mut network, &mut NullObserver);
        assert!(network.is_converged());

        let key = EdgeKey::new(node("C"), node("B"));
        let (old, changes) = network.set_link_cost(&key, Cost::new(8)).unwrap();

        assert_eq!(old, Cost::new(1));
        assert_eq!(network.link_cost(&node("B"), &node("C")), Ok(Cost::new(8)));
        let b = network.router(&node("B")).unwrap();
        let c = network.router(&node("C")).unwrap();
        assert_eq!(b.neighbor_cost(&node("C")), Some(Cost::new(8)));
        assert_eq!(c.neighbor_cost(&node("B")), Some(Cost::new(8)));
        // B-C on both sides plus C's route to A, which went through B.
        assert_eq!(changes.len(), 3);
        assert!(!network.is_converged());
    }

    #[test]
    fn test_reference_paths_track_current_costs() {
        let mut network = classic();
        let key = EdgeKey::new(node("B"), node("C"));
        network.set_link_cost(&key, Cost::new(8)).unwrap();

        let paths = network.reference_paths(&node("A")).unwrap();
        assert_eq!(paths.cost_to(&node("C")), Cost::new(5));
        assert_eq!(paths.cost_to(&node("D")), Cost::new(5));
    }

    #[test]
    fn test_message_counters() {
        let mut network = classic();
        let mut observer = RecordingObserver::new();
        network.exchange_round(&mut observer);

        // Every router sends one vector per link endpoint.
        assert_eq!(network.total_messages(), 10);
        let b = network.message_counts(&node("B")).unwrap();
        assert_eq!(b.sent, 3);
        assert_eq!(b.received, 3);
    }
}
