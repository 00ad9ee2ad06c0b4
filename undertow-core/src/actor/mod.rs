//! Actor-model variant of the network
//!
//! Every router runs in its own tokio task and exclusively owns its
//! [`RouterState`]. Rounds keep the synchronous batch semantics of
//! [`Network::exchange_round`](crate::Network::exchange_round): all
//! announcements are collected before any is delivered. Receivers relax
//! concurrently, each one processing its messages in sender order, so the
//! resulting tables match the single-threaded network exactly.

pub mod commands;
pub mod handle;
pub mod router;

use std::collections::BTreeMap;

use futures::future::try_join_all;

pub use commands::RouterCommand;
pub use handle::RouterHandle;
pub use router::spawn_router;

use crate::events::{RouteEvent, RouteObserver};
use crate::network::{ConvergenceStatus, CostRange, LinkCostChange, RoundOutcome};
use crate::routing::{
    Cost, DistanceVector, MessageCounts, NodeId, RouterState, RoutingError, RoutingTable,
};
use crate::topology::{EdgeKey, Topology};

/// Network whose routers are independent actors.
#[derive(Debug)]
pub struct ActorNetwork {
    handles: BTreeMap<NodeId, RouterHandle>,
    edges: BTreeMap<EdgeKey, Cost>,
    cost_range: CostRange,
    rounds: u64,
    messages_sent: u64,
    quiescent: bool,
}

impl ActorNetwork {
    /// Spawns one initialized router actor per topology node.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(topology: &Topology) -> Self {
        let nodes = topology.nodes();
        let handles = topology
            .adjacency()
            .into_iter()
            .map(|(id, neighbors)| {
                let mut state = RouterState::with_neighbors(id.clone(), neighbors);
                state.initialize(nodes);
                (id, spawn_router(state))
            })
            .collect();

        Self {
            handles,
            edges: topology.edge_map().clone(),
            cost_range: CostRange::default(),
            rounds: 0,
            messages_sent: 0,
            quiescent: false,
        }
    }

    /// Restricts the costs [`set_link_cost`](Self::set_link_cost) accepts.
    pub fn with_cost_range(mut self, range: CostRange) -> Self {
        self.cost_range = range;
        self
    }

    pub fn cost_range(&self) -> CostRange {
        self.cost_range
    }

    /// Returns router identifiers in order.
    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.handles.keys()
    }

    /// Returns the handle of one router.
    ///
    /// # Errors
    /// - `RoutingError::UnknownNode` - No router with this identifier
    pub fn handle(&self, node: &NodeId) -> Result<&RouterHandle, RoutingError> {
        self.handles
            .get(node)
            .ok_or_else(|| RoutingError::UnknownNode { node: node.clone() })
    }

    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    pub fn total_messages(&self) -> u64 {
        self.messages_sent
    }

    /// Returns true when the last round changed nothing and no link changed since.
    pub fn is_converged(&self) -> bool {
        self.quiescent
    }

    /// Runs one synchronous round across all actors.
    ///
    /// Route changes are reported receiver by receiver, in identifier order.
    ///
    /// # Errors
    /// - `RoutingError::RouterShutdown` - An actor stopped mid-round
    pub async fn exchange_round<O>(&mut self, observer: &mut O) -> Result<RoundOutcome, RoutingError>
    where
        O: RouteObserver + ?Sized,
    {
        let round = self.rounds + 1;
        observer.on_event(&RouteEvent::RoundStart { round });

        let announcements =
            try_join_all(self.handles.values().map(|handle| handle.announce_all())).await?;

        let mut inboxes: BTreeMap<NodeId, Vec<(NodeId, DistanceVector)>> = BTreeMap::new();
        let mut messages_sent = 0;
        for (sender, outgoing) in self.handles.keys().zip(announcements) {
            for (receiver, vector) in outgoing {
                messages_sent += 1;
                inboxes
                    .entry(receiver)
                    .or_default()
                    .push((sender.clone(), vector));
            }
        }

        let deliveries = inboxes.into_iter().filter_map(|(receiver, messages)| {
            self.handles
                .get(&receiver)
                .map(|handle| handle.relax_batch(messages))
        });
        let changes = try_join_all(deliveries).await?;

        let mut routes_changed = 0;
        for change in changes.into_iter().flatten() {
            routes_changed += 1;
            observer.on_event(&RouteEvent::from(change));
        }

        self.rounds = round;
        self.messages_sent += messages_sent as u64;
        self.quiescent = routes_changed == 0;
        tracing::debug!(
            "Actor round {}: {} messages, {} route changes",
            round,
            messages_sent,
            routes_changed
        );

        Ok(RoundOutcome {
            round,
            messages_sent,
            routes_changed,
        })
    }

    /// Repeats rounds until one is quiescent or `max_rounds` is reached.
    ///
    /// # Errors
    /// - `RoutingError::RouterShutdown` - An actor stopped mid-run
    pub async fn converge<O>(
        &mut self,
        max_rounds: usize,
        observer: &mut O,
    ) -> Result<ConvergenceStatus, RoutingError>
    where
        O: RouteObserver + ?Sized,
    {
        for rounds in 1..=max_rounds {
            if !self.exchange_round(observer).await?.any_changed() {
                observer.on_event(&RouteEvent::Converged { rounds });
                return Ok(ConvergenceStatus::Converged { rounds });
            }
        }

        tracing::warn!("Actor network did not converge within {} rounds", max_rounds);
        observer.on_event(&RouteEvent::NotConverged { rounds: max_rounds });
        Ok(ConvergenceStatus::NotConverged { rounds: max_rounds })
    }

    /// Changes the cost of an existing link on both endpoint actors.
    ///
    /// The lower endpoint is updated first. If the higher endpoint then fails,
    /// the lower one is given its old link cost back and the edge keeps its
    /// old cost; no events are emitted.
    ///
    /// # Errors
    /// - `RoutingError::InvalidCost` - `new_cost` is zero or infinite
    /// - `RoutingError::CostOutOfRange` - `new_cost` is outside the configured range
    /// - `RoutingError::UnknownNode` - An endpoint is not a router
    /// - `RoutingError::NotNeighbors` - The endpoints share no link
    /// - `RoutingError::UnchangedCost` - `new_cost` equals the current cost
    /// - `RoutingError::RouterShutdown` - An endpoint actor has stopped
    pub async fn set_link_cost<O>(
        &mut self,
        edge: &EdgeKey,
        new_cost: Cost,
        observer: &mut O,
    ) -> Result<LinkCostChange, RoutingError>
    where
        O: RouteObserver + ?Sized,
    {
        if new_cost == Cost::ZERO || new_cost.is_infinite() {
            return Err(RoutingError::InvalidCost { cost: new_cost });
        }
        if !self.cost_range.contains(new_cost) {
            return Err(RoutingError::CostOutOfRange {
                cost: new_cost,
                lo: self.cost_range.lo(),
                hi: self.cost_range.hi(),
            });
        }
        let low = self.handle(edge.low())?.clone();
        let high = self.handle(edge.high())?.clone();
        let old_cost = self
            .edges
            .get(edge)
            .copied()
            .ok_or_else(|| RoutingError::NotNeighbors {
                a: edge.low().clone(),
                b: edge.high().clone(),
            })?;
        if old_cost == new_cost {
            return Err(RoutingError::UnchangedCost {
                a: edge.low().clone(),
                b: edge.high().clone(),
                cost: old_cost,
            });
        }

        let mut changes = low.set_neighbor_cost(edge.high().clone(), new_cost).await?;
        self.quiescent = false;
        match high.set_neighbor_cost(edge.low().clone(), new_cost).await {
            Ok(high_changes) => changes.extend(high_changes),
            Err(e) => {
                if let Err(rollback) = low.set_neighbor_cost(edge.high().clone(), old_cost).await {
                    tracing::warn!(
                        "Router {}: could not restore link cost {} to {}: {}",
                        low.id(),
                        old_cost,
                        high.id(),
                        rollback
                    );
                }
                return Err(e);
            }
        }
        self.edges.insert(edge.clone(), new_cost);

        observer.on_event(&RouteEvent::LinkCostChanged {
            a: edge.low().clone(),
            b: edge.high().clone(),
            old: old_cost,
            new: new_cost,
        });
        for change in changes {
            observer.on_event(&RouteEvent::from(change));
        }

        Ok(LinkCostChange {
            edge: edge.clone(),
            old_cost,
            new_cost,
        })
    }

    /// Returns a snapshot of the routing table of `node`.
    ///
    /// # Errors
    /// - `RoutingError::UnknownNode` - No router with this identifier
    /// - `RoutingError::RouterShutdown` - The actor has stopped
    pub async fn routing_table(&self, node: &NodeId) -> Result<RoutingTable, RoutingError> {
        self.handle(node)?.routing_table().await
    }

    /// Returns a snapshot of the distance vector of `node`.
    ///
    /// # Errors
    /// - `RoutingError::UnknownNode` - No router with this identifier
    /// - `RoutingError::RouterShutdown` - The actor has stopped
    pub async fn distance_vector(&self, node: &NodeId) -> Result<DistanceVector, RoutingError> {
        self.handle(node)?.distance_vector().await
    }

    /// Returns message counters of `node`.
    ///
    /// # Errors
    /// - `RoutingError::UnknownNode` - No router with this identifier
    /// - `RoutingError::RouterShutdown` - The actor has stopped
    pub async fn message_counts(&self, node: &NodeId) -> Result<MessageCounts, RoutingError> {
        self.handle(node)?.message_counts().await
    }

    /// Stops every router actor.
    pub async fn shutdown(self) {
        for handle in self.handles.values() {
            if let Err(e) = handle.shutdown().await {
                tracing::debug!("Router {} already stopped: {}", handle.id(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{NullObserver, RecordingObserver};
    use crate::network::{ConvergenceDetector, Network};
    use crate::routing::RoutingEntry;
    use crate::topology::EdgeRecord;

    fn classic() -> Topology {
        Topology::from_records(vec![
            EdgeRecord::new("A", "B", 2),
            EdgeRecord::new("A", "C", 5),
            EdgeRecord::new("B", "C", 1),
            EdgeRecord::new("B", "D", 3),
            EdgeRecord::new("C", "D", 2),
        ])
        .unwrap()
    }

    fn node(name: &str) -> NodeId {
        NodeId::from(name)
    }

    #[tokio::test]
    async fn test_actor_network_converges_on_classic_topology() {
        let mut network = ActorNetwork::spawn(&classic());
        let mut observer = RecordingObserver::new();

        let status = network.converge(50, &mut observer).await.unwrap();

        assert_eq!(status, ConvergenceStatus::Converged { rounds: 2 });
        let table = network.routing_table(&node("A")).await.unwrap();
        assert_eq!(table.get(&node("C")), Some(&RoutingEntry::via(Cost::new(3), node("B"))));
        assert_eq!(table.get(&node("D")), Some(&RoutingEntry::via(Cost::new(5), node("B"))));
        assert_eq!(network.total_messages(), 20);

        network.shutdown().await;
    }

    #[tokio::test]
    async fn test_actor_tables_match_sequential_network() {
        let topology = classic();
        let mut actors = ActorNetwork::spawn(&topology);
        let mut sequential = Network::from_topology(&topology);

        for _ in 0..3 {
            let actor_round = actors.exchange_round(&mut NullObserver).await.unwrap();
            let sequential_round = sequential.exchange_round(&mut NullObserver);
            assert_eq!(actor_round, sequential_round);
        }

        let bc = EdgeKey::new(node("B"), node("C"));
        actors
            .set_link_cost(&bc, Cost::new(8), &mut NullObserver)
            .await
            .unwrap();
        crate::network::LinkCostMutator::default()
            .mutate(&mut sequential, &bc, Cost::new(8), &mut NullObserver)
            .unwrap();

        let status = actors.converge(10, &mut NullObserver).await.unwrap();
        let expected = ConvergenceDetector::new(10).run(&mut sequential, &mut NullObserver);
        assert_eq!(status, expected);

        for id in sequential.node_ids() {
            let actor_table = actors.routing_table(id).await.unwrap();
            assert_eq!(&actor_table, sequential.routing_table(id).unwrap());
            assert_eq!(
                actors.message_counts(id).await.unwrap(),
                sequential.message_counts(id).unwrap()
            );
        }

        actors.shutdown().await;
    }

    #[tokio::test]
    async fn test_link_cost_outside_range_is_rejected() {
        let mut network = ActorNetwork::spawn(&classic())
            .with_cost_range(CostRange::new(1, 10).unwrap());
        let mut observer = RecordingObserver::new();
        let bc = EdgeKey::new(node("B"), node("C"));
        let before = network.routing_table(&node("B")).await.unwrap();

        assert_eq!(
            network.set_link_cost(&bc, Cost::new(11), &mut observer).await,
            Err(RoutingError::CostOutOfRange {
                cost: Cost::new(11),
                lo: Cost::new(1),
                hi: Cost::new(10),
            })
        );
        assert!(observer.events().is_empty());
        assert_eq!(network.routing_table(&node("B")).await.unwrap(), before);

        network
            .set_link_cost(&bc, Cost::new(10), &mut observer)
            .await
            .unwrap();
        assert_eq!(network.edges[&bc], Cost::new(10));

        network.shutdown().await;
    }

    #[tokio::test]
    async fn test_failed_endpoint_restores_link_cost() {
        let mut network = ActorNetwork::spawn(&classic());
        network.converge(10, &mut NullObserver).await.unwrap();
        let b_before = network.routing_table(&node("B")).await.unwrap();

        network.handle(&node("C")).unwrap().shutdown().await.unwrap();

        let mut observer = RecordingObserver::new();
        let bc = EdgeKey::new(node("B"), node("C"));
        assert_eq!(
            network.set_link_cost(&bc, Cost::new(8), &mut observer).await,
            Err(RoutingError::RouterShutdown { node: node("C") })
        );

        assert_eq!(network.edges[&bc], Cost::new(1));
        assert!(observer.events().is_empty());
        let b_after = network.routing_table(&node("B")).await.unwrap();
        assert_eq!(b_after, b_before);
        assert_eq!(b_after.cost_to(&node("C")), Cost::new(1));

        network.shutdown().await;
    }

    #[tokio::test]
    async fn test_stopped_actor_reports_shutdown() {
        let network = ActorNetwork::spawn(&classic());
        let handle = network.handle(&node("A")).unwrap().clone();

        handle.shutdown().await.unwrap();

        assert_eq!(
            handle.routing_table().await,
            Err(RoutingError::RouterShutdown { node: node("A") })
        );
        assert!(matches!(
            network.routing_table(&node("Z")).await,
            Err(RoutingError::UnknownNode { .. })
        ));
    }
}
