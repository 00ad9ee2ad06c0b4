//! Final report of a simulation run.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use undertow_core::{ConvergenceStatus, LinkCostChange, MessageCounts, NodeId, RoutingTable};

use super::invariants::InvariantViolation;
use super::metrics::SimulationMetrics;

/// Link-cost change stamped with the simulated time it happened at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedLinkChange {
    pub at: Duration,
    pub change: LinkCostChange,
}

/// Final state of one router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterReport {
    pub messages: MessageCounts,
    pub table: RoutingTable,
}

/// Result of a simulation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationReport {
    /// Seed used for link and cost selection
    pub seed: u64,
    /// Simulated time at which the run stopped
    pub simulated_time: Duration,
    /// Whether the run was stopped before its configured duration
    pub cancelled: bool,
    /// Exchange rounds over the whole run, convergence passes included
    pub rounds: u64,
    pub total_messages: u64,
    pub metrics: SimulationMetrics,
    pub link_changes: Vec<TimedLinkChange>,
    /// Outcome of the convergence pass before the report
    pub final_status: ConvergenceStatus,
    pub routers: BTreeMap<NodeId, RouterReport>,
    pub violations: Vec<InvariantViolation>,
}

impl SimulationReport {
    /// Returns true if the final convergence pass reached a quiescent round.
    pub fn converged(&self) -> bool {
        self.final_status.is_converged()
    }

    /// Serializes the report as pretty-printed JSON.
    ///
    /// # Errors
    /// - `serde_json::Error` - Serialization failed
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Generates human-readable summary.
    pub fn summary(&self) -> String {
        let mut summary = String::new();
        summary.push_str(&format!("Simulation Report (seed: {})\n", self.seed));
        summary.push_str(&format!(
            "Simulated time: {:.1}s{}\n",
            self.simulated_time.as_secs_f64(),
            if self.cancelled { " (cancelled)" } else { "" }
        ));
        summary.push_str(&format!(
            "Ticks: {} exchange, {} mutation\n",
            self.metrics.exchange_ticks, self.metrics.mutation_ticks
        ));
        summary.push_str(&format!("Exchange rounds: {}\n", self.rounds));
        summary.push_str(&format!("Messages exchanged: {}\n", self.total_messages));
        summary.push_str(&format!(
            "Average messages per round: {:.2}\n",
            self.total_messages as f64 / self.rounds.max(1) as f64
        ));
        summary.push_str(&format!("Link cost changes: {}\n", self.link_changes.len()));
        summary.push_str(&match self.final_status {
            ConvergenceStatus::Converged { rounds } => {
                format!("Final state: converged after {rounds} rounds\n")
            }
            ConvergenceStatus::NotConverged { rounds } => {
                format!("Final state: NOT converged within {rounds} rounds\n")
            }
        });

        if !self.link_changes.is_empty() {
            summary.push_str("\nLink cost history:\n");
            for TimedLinkChange { at, change } in &self.link_changes {
                summary.push_str(&format!(
                    "  [{:>6.1}s] {}: {} -> {}\n",
                    at.as_secs_f64(),
                    change.edge,
                    change.old_cost,
                    change.new_cost
                ));
            }
        }

        summary.push_str("\nRouter | Sent | Received | Total\n");
        for (id, router) in &self.routers {
            summary.push_str(&format!(
                "{:6} | {:4} | {:8} | {:5}\n",
                id.as_str(),
                router.messages.sent,
                router.messages.received,
                router.messages.total()
            ));
        }

        if !self.violations.is_empty() {
            summary.push_str("\nInvariant violations:\n");
            for violation in &self.violations {
                summary.push_str(&format!("  - {violation}\n"));
            }
        }

        summary
    }
}
