//! Distance-vector routing primitives
//!
//! Router identifiers, saturating link costs, routing tables and the per-router
//! state machine that performs Bellman-Ford relaxation.

pub mod cost;
pub mod router;
pub mod table;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use cost::Cost;
pub use router::{MessageCounts, RouterState};
pub use table::{DistanceVector, RouteChange, RoutingEntry, RoutingTable};

/// Opaque identifier of a router in the simulated network.
///
/// Identifiers are totally ordered so every walk over routers, neighbors and
/// destinations happens in the same order on every run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Creates NodeId from any string-like name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for NodeId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors that can occur while querying or mutating a running network.
///
/// All of these are recoverable: the network state is left untouched when
/// one is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoutingError {
    #[error("Unknown router {node}")]
    UnknownNode { node: NodeId },

    #[error("Routers {a} and {b} are not neighbors")]
    NotNeighbors { a: NodeId, b: NodeId },

    #[error("Network has no links to mutate")]
    NoEdges,

    #[error("Link cost {cost} is not a positive finite value")]
    InvalidCost { cost: Cost },

    #[error("Cost range [{lo}, {hi}] is empty or not finite")]
    InvalidCostRange { lo: u32, hi: u32 },

    #[error("Link cost {cost} outside configured range [{lo}, {hi}]")]
    CostOutOfRange { cost: Cost, lo: Cost, hi: Cost },

    #[error("Link cost {cost} equals the current cost of {a}-{b}")]
    UnchangedCost { a: NodeId, b: NodeId, cost: Cost },

    #[error("Cost range [{lo}, {hi}] offers no value other than the current cost {current}")]
    NoAlternativeCost { lo: Cost, hi: Cost, current: Cost },

    #[error("Network has not converged")]
    NotConverged,

    #[error("Router {node} actor has shut down")]
    RouterShutdown { node: NodeId },
}
