//! Handle for talking to a router actor.

use tokio::sync::{mpsc, oneshot};

use super::commands::RouterCommand;
use crate::routing::{
    Cost, DistanceVector, MessageCounts, NodeId, RouteChange, RoutingError, RoutingTable,
};

/// Cloneable async front of a single router actor.
///
/// Every method fails with `RoutingError::RouterShutdown` once the actor has
/// stopped.
#[derive(Debug, Clone)]
pub struct RouterHandle {
    id: NodeId,
    sender: mpsc::Sender<RouterCommand>,
}

impl RouterHandle {
    pub(crate) fn new(id: NodeId, sender: mpsc::Sender<RouterCommand>) -> Self {
        Self { id, sender }
    }

    /// Returns the router this handle talks to.
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    /// Computes announcements for every neighbor, in neighbor order.
    ///
    /// Counts one sent message per neighbor.
    pub async fn announce_all(&self) -> Result<Vec<(NodeId, DistanceVector)>, RoutingError> {
        self.request(|responder| RouterCommand::AnnounceAll { responder })
            .await
    }

    /// Relaxes received vectors in order and returns every route change.
    pub async fn relax_batch(
        &self,
        messages: Vec<(NodeId, DistanceVector)>,
    ) -> Result<Vec<RouteChange>, RoutingError> {
        self.request(|responder| RouterCommand::RelaxBatch {
            messages,
            responder,
        })
        .await
    }

    /// Applies a new direct link cost to `neighbor`.
    pub async fn set_neighbor_cost(
        &self,
        neighbor: NodeId,
        cost: Cost,
    ) -> Result<Vec<RouteChange>, RoutingError> {
        self.request(|responder| RouterCommand::SetNeighborCost {
            neighbor,
            cost,
            responder,
        })
        .await
    }

    /// Returns a snapshot of the routing table.
    pub async fn routing_table(&self) -> Result<RoutingTable, RoutingError> {
        self.request(|responder| RouterCommand::GetRoutingTable { responder })
            .await
    }

    /// Returns a snapshot of the distance vector.
    pub async fn distance_vector(&self) -> Result<DistanceVector, RoutingError> {
        self.request(|responder| RouterCommand::GetDistanceVector { responder })
            .await
    }

    /// Returns message counters.
    pub async fn message_counts(&self) -> Result<MessageCounts, RoutingError> {
        self.request(|responder| RouterCommand::GetMessageCounts { responder })
            .await
    }

    /// Stops the actor.
    pub async fn shutdown(&self) -> Result<(), RoutingError> {
        self.request(|responder| RouterCommand::Shutdown { responder })
            .await
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> RouterCommand,
    ) -> Result<T, RoutingError> {
        let (responder, rx) = oneshot::channel();
        self.sender
            .send(build(responder))
            .await
            .map_err(|_| self.shutdown_error())?;
        rx.await.map_err(|_| self.shutdown_error())
    }

    fn shutdown_error(&self) -> RoutingError {
        RoutingError::RouterShutdown {
            node: self.id.clone(),
        }
    }
}
