//! Deterministic simulation of periodic routing exchange and link churn.
//!
//! Time is simulated: ticks are pulled from a priority queue and the clock
//! jumps to each one, so a 90 second run finishes instantly unless a tick
//! delay is configured. All randomness comes from one seeded ChaCha8
//! generator, so a seed fully determines which links change and to what.

pub mod cancellation;
pub mod clock;
pub mod driver;
pub mod events;
pub mod invariants;
pub mod metrics;
pub mod report;

#[cfg(test)]
mod tests;

pub use cancellation::CancellationFlag;
pub use clock::{DeterministicClock, DeterministicRng};
pub use driver::{ExchangeTick, MutationTick, SimulationDriver, SimulationError};
pub use events::{EventPriority, ScheduledTick, TickKind};
pub use invariants::{
    InvariantViolation, NextHopIsNeighborInvariant, PoisonReverseInvariant, RoutingInvariant,
    SelfRouteInvariant, default_invariants,
};
pub use metrics::SimulationMetrics;
pub use report::{RouterReport, SimulationReport, TimedLinkChange};
