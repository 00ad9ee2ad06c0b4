//! Structured routing events and the observer interface
//!
//! The protocol never writes to a console or file. It reports what happens to
//! an injected [`RouteObserver`]; rendering is entirely the observer's job.

use serde::{Deserialize, Serialize};

use crate::routing::{Cost, NodeId, RouteChange};

/// Event emitted while the protocol runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RouteEvent {
    /// An exchange round is about to deliver its batch
    RoundStart { round: u64 },
    /// A routing table entry changed
    RouteChanged {
        router: NodeId,
        dest: NodeId,
        old_cost: Cost,
        new_cost: Cost,
        next_hop: Option<NodeId>,
    },
    /// A round produced no change after `rounds` rounds of a convergence run
    Converged { rounds: usize },
    /// A convergence run exhausted its round bound
    NotConverged { rounds: usize },
    /// A link cost was changed on both endpoints
    LinkCostChanged {
        a: NodeId,
        b: NodeId,
        old: Cost,
        new: Cost,
    },
}

impl RouteEvent {
    /// Returns the event name for metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteEvent::RoundStart { .. } => "ROUND_START",
            RouteEvent::RouteChanged { .. } => "ROUTE_CHANGED",
            RouteEvent::Converged { .. } => "CONVERGED",
            RouteEvent::NotConverged { .. } => "NOT_CONVERGED",
            RouteEvent::LinkCostChanged { .. } => "LINK_COST_CHANGED",
        }
    }
}

impl From<RouteChange> for RouteEvent {
    fn from(change: RouteChange) -> Self {
        RouteEvent::RouteChanged {
            router: change.router,
            dest: change.dest,
            old_cost: change.old_cost,
            new_cost: change.new_cost,
            next_hop: change.next_hop,
        }
    }
}

/// Receives protocol events.
pub trait RouteObserver {
    /// Called once per event, in the order events happen.
    fn on_event(&mut self, event: &RouteEvent);
}

impl<O: RouteObserver + ?Sized> RouteObserver for &mut O {
    fn on_event(&mut self, event: &RouteEvent) {
        (**self).on_event(event);
    }
}

impl<O: RouteObserver + ?Sized> RouteObserver for Box<O> {
    fn on_event(&mut self, event: &RouteEvent) {
        (**self).on_event(event);
    }
}

/// Observer that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl RouteObserver for NullObserver {
    fn on_event(&mut self, _event: &RouteEvent) {}
}

/// Observer that keeps every event in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    events: Vec<RouteEvent>,
}

impl RecordingObserver {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns recorded events in arrival order.
    pub fn events(&self) -> &[RouteEvent] {
        &self.events
    }

    /// Returns the number of recorded events with the given name.
    pub fn count(&self, name: &str) -> usize {
        self.events.iter().filter(|event| event.as_str() == name).count()
    }

    /// Returns every route change recorded for `router`.
    pub fn route_changes_for<'a>(
        &'a self,
        router: &'a NodeId,
    ) -> impl Iterator<Item = &'a RouteEvent> + 'a {
        self.events.iter().filter(move |event| {
            matches!(event, RouteEvent::RouteChanged { router: changed, .. } if changed == router)
        })
    }

    /// Drops recorded events.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl RouteObserver for RecordingObserver {
    fn on_event(&mut self, event: &RouteEvent) {
        self.events.push(event.clone());
    }
}

/// Observer that forwards events to `tracing`.
///
/// Round and route events go to `debug`/`trace`, convergence and link changes
/// to `info`, non-convergence to `warn`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl RouteObserver for TracingObserver {
    fn on_event(&mut self, event: &RouteEvent) {
        match event {
            RouteEvent::RoundStart { round } => {
                tracing::debug!(round = *round, "Exchange round start");
            }
            RouteEvent::RouteChanged {
                router,
                dest,
                old_cost,
                new_cost,
                next_hop,
            } => {
                let next_hop = next_hop.as_ref().map_or("none", NodeId::as_str);
                tracing::trace!(
                    "Router {}: route to {} {} -> {} via {}",
                    router,
                    dest,
                    old_cost,
                    new_cost,
                    next_hop
                );
            }
            RouteEvent::Converged { rounds } => {
                tracing::info!("Network converged after {} rounds", rounds);
            }
            RouteEvent::NotConverged { rounds } => {
                tracing::warn!("Network did not converge within {} rounds", rounds);
            }
            RouteEvent::LinkCostChanged { a, b, old, new } => {
                tracing::info!("Link {}-{} cost changed from {} to {}", a, b, old, new);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_observer_counts_by_name() {
        let mut observer = RecordingObserver::new();
        observer.on_event(&RouteEvent::RoundStart { round: 1 });
        observer.on_event(&RouteEvent::RoundStart { round: 2 });
        observer.on_event(&RouteEvent::Converged { rounds: 2 });

        assert_eq!(observer.count("ROUND_START"), 2);
        assert_eq!(observer.count("CONVERGED"), 1);
        assert_eq!(observer.events().len(), 3);
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let event = RouteEvent::LinkCostChanged {
            a: NodeId::from("B"),
            b: NodeId::from("C"),
            old: Cost::new(1),
            new: Cost::new(8),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "LINK_COST_CHANGED");
        assert_eq!(json["old"], 1);
        assert_eq!(json["new"], 8);
    }

    #[test]
    fn test_route_change_conversion() {
        let change = RouteChange {
            router: NodeId::from("A"),
            dest: NodeId::from("C"),
            old_cost: Cost::new(5),
            new_cost: Cost::new(3),
            next_hop: Some(NodeId::from("B")),
        };
        let event = RouteEvent::from(change);
        assert_eq!(event.as_str(), "ROUTE_CHANGED");

        let mut observer = RecordingObserver::new();
        observer.on_event(&event);
        let router = NodeId::from("A");
        assert_eq!(observer.route_changes_for(&router).count(), 1);
    }
}
