//! Commands accepted by a router actor.

use tokio::sync::oneshot;

use crate::routing::{Cost, DistanceVector, MessageCounts, NodeId, RouteChange, RoutingTable};

/// Messages a router actor processes, one at a time, in arrival order.
///
/// Each request carries the oneshot sender the actor replies on.
pub enum RouterCommand {
    /// Compute the poison-reverse announcement for every neighbor.
    AnnounceAll {
        responder: oneshot::Sender<Vec<(NodeId, DistanceVector)>>,
    },
    /// Relax a batch of received vectors in the given order.
    RelaxBatch {
        messages: Vec<(NodeId, DistanceVector)>,
        responder: oneshot::Sender<Vec<RouteChange>>,
    },
    /// Apply a new direct link cost.
    SetNeighborCost {
        neighbor: NodeId,
        cost: Cost,
        responder: oneshot::Sender<Vec<RouteChange>>,
    },
    GetRoutingTable {
        responder: oneshot::Sender<RoutingTable>,
    },
    GetDistanceVector {
        responder: oneshot::Sender<DistanceVector>,
    },
    GetMessageCounts {
        responder: oneshot::Sender<MessageCounts>,
    },
    /// Stop the actor after replying.
    Shutdown { responder: oneshot::Sender<()> },
}
