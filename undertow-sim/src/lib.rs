//! Undertow Simulation - Deterministic periodic routing exchange with link churn
//!
//! Drives an `undertow_core::Network` through exchange and link-mutation ticks
//! on a simulated clock, checks routing invariants between ticks, and produces
//! a reproducible report for a given seed.

#![warn(clippy::missing_errors_doc)]
#![deny(clippy::missing_panics_doc)]

pub mod deterministic;
pub mod scenarios;

pub use deterministic::{
    CancellationFlag, DeterministicClock, DeterministicRng, ExchangeTick, InvariantViolation,
    MutationTick, RoutingInvariant, SimulationDriver, SimulationError, SimulationMetrics,
    SimulationReport,
};
