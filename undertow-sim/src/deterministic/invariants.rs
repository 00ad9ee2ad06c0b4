//! Routing invariants checked between ticks.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use undertow_core::{Cost, Network, NodeId};

/// Violation of a routing invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvariantViolation {
    /// Name of the violated invariant
    pub invariant: String,
    pub description: String,
    /// Simulated time of the check
    pub at: Duration,
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invariant '{}' violated at {:.1}s: {}",
            self.invariant,
            self.at.as_secs_f64(),
            self.description
        )
    }
}

/// Property every router table must satisfy at a tick boundary.
pub trait RoutingInvariant: Send + Sync {
    /// Checks the invariant against the current network.
    ///
    /// # Errors
    /// Returns an `InvariantViolation` naming the first offending router.
    fn check(&self, network: &Network, at: Duration) -> Result<(), InvariantViolation>;

    fn name(&self) -> &str;

    fn violation(&self, description: String, at: Duration) -> InvariantViolation {
        InvariantViolation {
            invariant: self.name().to_string(),
            description,
            at,
        }
    }
}

/// Every router reaches itself at zero cost through itself.
pub struct SelfRouteInvariant;

impl RoutingInvariant for SelfRouteInvariant {
    fn check(&self, network: &Network, at: Duration) -> Result<(), InvariantViolation> {
        for router in network.routers() {
            let entry = router.routing_table().get(router.id());
            let holds = entry
                .is_some_and(|entry| entry.cost == Cost::ZERO && entry.routes_through(router.id()));
            if !holds {
                return Err(self.violation(
                    format!("router {} has self-entry {:?}", router.id(), entry),
                    at,
                ));
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "SelfRoute"
    }
}

/// Every finite route leaves through a current neighbor.
pub struct NextHopIsNeighborInvariant;

impl RoutingInvariant for NextHopIsNeighborInvariant {
    fn check(&self, network: &Network, at: Duration) -> Result<(), InvariantViolation> {
        for router in network.routers() {
            for (dest, entry) in router.routing_table() {
                if dest == router.id() || entry.cost.is_infinite() {
                    continue;
                }
                let valid = entry
                    .next_hop
                    .as_ref()
                    .is_some_and(|hop| router.neighbors().contains_key(hop));
                if !valid {
                    return Err(self.violation(
                        format!(
                            "router {} routes to {} via {:?}, not a neighbor",
                            router.id(),
                            dest,
                            entry.next_hop
                        ),
                        at,
                    ));
                }
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "NextHopIsNeighbor"
    }
}

/// No announcement offers a finite cost back to the next hop it came from.
pub struct PoisonReverseInvariant;

impl RoutingInvariant for PoisonReverseInvariant {
    fn check(&self, network: &Network, at: Duration) -> Result<(), InvariantViolation> {
        for router in network.routers() {
            for neighbor in router.neighbors().keys() {
                let announced = router.announce(neighbor);
                let leaked: Option<&NodeId> = router
                    .routing_table()
                    .iter()
                    .filter(|(dest, entry)| *dest != router.id() && entry.routes_through(neighbor))
                    .map(|(dest, _)| dest)
                    .find(|dest| announced.get(dest).is_some_and(Cost::is_finite));
                if let Some(dest) = leaked {
                    return Err(self.violation(
                        format!(
                            "router {} announces a finite route to {} back to its next hop {}",
                            router.id(),
                            dest,
                            neighbor
                        ),
                        at,
                    ));
                }
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "PoisonReverse"
    }
}

/// The invariants every simulation run checks.
pub fn default_invariants() -> Vec<Box<dyn RoutingInvariant>> {
    vec![
        Box::new(SelfRouteInvariant),
        Box::new(NextHopIsNeighborInvariant),
        Box::new(PoisonReverseInvariant),
    ]
}
