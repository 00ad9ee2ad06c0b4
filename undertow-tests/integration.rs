//! Integration tests for Undertow
//!
//! These tests exercise the routing core, the actor variant and the
//! simulation driver together on generated topologies.

#[path = "integration/actor_equivalence.rs"]
mod actor_equivalence;
#[path = "integration/convergence_properties.rs"]
mod convergence_properties;
#[path = "integration/link_churn.rs"]
mod link_churn;
#[path = "integration/simulation_driver.rs"]
mod simulation_driver;
