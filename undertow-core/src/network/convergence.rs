//! Convergence detection over repeated exchange rounds

use serde::{Deserialize, Serialize};

use super::Network;
use crate::events::{RouteEvent, RouteObserver};

/// Outcome of a bounded convergence run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConvergenceStatus {
    /// A round changed nothing; `rounds` includes that quiescent round
    Converged { rounds: usize },
    /// The round bound ran out while tables were still changing
    NotConverged { rounds: usize },
}

impl ConvergenceStatus {
    /// Returns true if the run reached a quiescent round.
    pub fn is_converged(&self) -> bool {
        matches!(self, ConvergenceStatus::Converged { .. })
    }

    /// Returns the number of rounds executed.
    pub fn rounds(&self) -> usize {
        match self {
            ConvergenceStatus::Converged { rounds } | ConvergenceStatus::NotConverged { rounds } => {
                *rounds
            }
        }
    }
}

/// Repeats exchange rounds until one of them is quiescent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvergenceDetector {
    max_rounds: usize,
}

impl ConvergenceDetector {
    /// Creates a detector that gives up after `max_rounds` rounds.
    pub fn new(max_rounds: usize) -> Self {
        Self { max_rounds }
    }

    /// Returns the round bound.
    pub fn max_rounds(&self) -> usize {
        self.max_rounds
    }

    /// Runs rounds until quiescence or the bound.
    ///
    /// Emits `CONVERGED` on success and `NOT_CONVERGED` when the bound is
    /// exhausted. A bound of zero runs nothing and reports non-convergence.
    pub fn run<O>(&self, network: &mut Network, observer: &mut O) -> ConvergenceStatus
    where
        O: RouteObserver + ?Sized,
    {
        for rounds in 1..=self.max_rounds {
            let outcome = network.exchange_round(observer);
            if !outcome.any_changed() {
                tracing::debug!("Converged after {} rounds", rounds);
                observer.on_event(&RouteEvent::Converged { rounds });
                return ConvergenceStatus::Converged { rounds };
            }
        }

        tracing::warn!(
            "No quiescent round within {} rounds, tables may still be settling",
            self.max_rounds
        );
        observer.on_event(&RouteEvent::NotConverged {
            rounds: self.max_rounds,
        });
        ConvergenceStatus::NotConverged {
            rounds: self.max_rounds,
        }
    }
}
