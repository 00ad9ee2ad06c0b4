//! Counters collected while a simulation runs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use undertow_core::{RouteEvent, RouteObserver};

/// Aggregated counters over every event a run emitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationMetrics {
    /// Event name to number of occurrences
    pub events_by_type: BTreeMap<String, u64>,
    pub exchange_ticks: u64,
    pub mutation_ticks: u64,
    /// Largest number of route changes in one round or one link-change cascade
    pub peak_round_changes: u64,
    #[serde(skip)]
    current_round_changes: u64,
}

impl SimulationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one event.
    pub fn record_event(&mut self, event: &RouteEvent) {
        *self
            .events_by_type
            .entry(event.as_str().to_string())
            .or_insert(0) += 1;

        match event {
            RouteEvent::RoundStart { .. } | RouteEvent::LinkCostChanged { .. } => {
                self.current_round_changes = 0;
            }
            RouteEvent::RouteChanged { .. } => {
                self.current_round_changes += 1;
                self.peak_round_changes = self.peak_round_changes.max(self.current_round_changes);
            }
            _ => {}
        }
    }

    /// Returns how often the event named `name` occurred.
    pub fn count(&self, name: &str) -> u64 {
        self.events_by_type.get(name).copied().unwrap_or(0)
    }
}

/// Forwards events to an inner observer while counting them.
pub(crate) struct MeteredObserver<'a, O: ?Sized> {
    pub(crate) inner: &'a mut O,
    pub(crate) metrics: &'a mut SimulationMetrics,
}

impl<O: RouteObserver + ?Sized> RouteObserver for MeteredObserver<'_, O> {
    fn on_event(&mut self, event: &RouteEvent) {
        self.metrics.record_event(event);
        self.inner.on_event(event);
    }
}

#[cfg(test)]
mod tests {
    use undertow_core::RecordingObserver;

    use super::*;

    #[test]
    fn test_metered_observer_counts_and_forwards() {
        let mut inner = RecordingObserver::new();
        let mut metrics = SimulationMetrics::new();
        let mut observer = MeteredObserver {
            inner: &mut inner,
            metrics: &mut metrics,
        };

        observer.on_event(&RouteEvent::RoundStart { round: 1 });
        observer.on_event(&RouteEvent::Converged { rounds: 1 });

        assert_eq!(inner.events().len(), 2);
        assert_eq!(metrics.count("ROUND_START"), 1);
        assert_eq!(metrics.count("CONVERGED"), 1);
        assert_eq!(metrics.count("ROUTE_CHANGED"), 0);
    }
}
