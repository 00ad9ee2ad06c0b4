//! Undertow Core - Distance-vector routing state machine and exchange protocol
//!
//! This crate provides the routing building blocks: per-router state with
//! Bellman-Ford relaxation and poison reverse, a network that runs synchronous
//! exchange rounds, convergence detection, link-cost churn, and an observer
//! interface that decouples the algorithm from presentation.

pub mod actor;
pub mod config;
pub mod events;
pub mod network;
pub mod routing;
pub mod topology;

// Re-export main types for convenient access
pub use actor::{ActorNetwork, RouterHandle};
pub use config::{ConvergenceConfig, MutationConfig, SimulationConfig, UndertowConfig};
pub use events::{NullObserver, RecordingObserver, RouteEvent, RouteObserver, TracingObserver};
pub use network::{
    ConvergenceDetector, ConvergenceStatus, CostRange, LinkCostChange, LinkCostMutator, Network,
    RoundOutcome, ShortestCostMatrix,
};
pub use routing::{
    Cost, DistanceVector, MessageCounts, NodeId, RouteChange, RouterState, RoutingEntry,
    RoutingError, RoutingTable,
};
pub use topology::{Edge, EdgeKey, EdgeRecord, ShortestPaths, Topology, TopologyError, TopologyStats};

/// Core errors that can bubble up from any Undertow subsystem.
///
/// High-level error type aggregating topology loading and routing failures.
#[derive(Debug, thiserror::Error)]
pub enum UndertowError {
    #[error("Invalid topology: {0}")]
    Topology(#[from] TopologyError),

    #[error("Routing error: {0}")]
    Routing(#[from] RoutingError),

    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl UndertowError {
    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            UndertowError::Topology(e) => format!("The topology could not be loaded: {e}"),
            UndertowError::Routing(e) => match e {
                RoutingError::UnknownNode { node } => format!("Router {node} does not exist"),
                RoutingError::NotNeighbors { a, b } => {
                    format!("Routers {a} and {b} are not directly connected")
                }
                RoutingError::NotConverged => {
                    "The network has not converged yet; run more exchange rounds".to_string()
                }
                _ => "Routing error occurred".to_string(),
            },
            UndertowError::Configuration { reason } => format!("Configuration error: {reason}"),
            UndertowError::Io(_) => "File system error occurred".to_string(),
        }
    }

    /// Checks if this error prevents a network from being built at all.
    ///
    /// Load-time topology errors are the only errors fatal to initialization.
    pub fn is_fatal(&self) -> bool {
        matches!(self, UndertowError::Topology(_))
    }
}

pub type Result<T> = std::result::Result<T, UndertowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topology_errors_are_fatal() {
        let err = UndertowError::from(TopologyError::Empty);
        assert!(err.is_fatal());

        let err = UndertowError::from(RoutingError::UnknownNode {
            node: NodeId::from("Z"),
        });
        assert!(!err.is_fatal());
        assert_eq!(err.user_message(), "Router Z does not exist");
    }
}
