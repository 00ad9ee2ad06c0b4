use std::time::Duration;

use undertow_core::{
    ConvergenceStatus, Cost, EdgeKey, Network, NodeId, NullObserver, RecordingObserver,
    RouteEvent, Topology, UndertowConfig,
};

use super::*;
use crate::scenarios;

fn node(name: &str) -> NodeId {
    NodeId::from(name)
}

fn seeded_config(seed: u64) -> UndertowConfig {
    let mut config = UndertowConfig::default();
    config.simulation.seed = Some(seed);
    config
}

#[test]
fn test_default_schedule_tick_counts() {
    let topology = scenarios::classic().unwrap();
    let mut driver = SimulationDriver::new(&topology, seeded_config(7), NullObserver).unwrap();

    let report = driver.run().unwrap();

    // Exchange at 5..=85s, mutation at 30s and 60s; 90s is the end, not a tick.
    assert_eq!(report.metrics.exchange_ticks, 17);
    assert_eq!(report.metrics.mutation_ticks, 2);
    assert_eq!(report.link_changes.len(), 2);
    assert_eq!(report.link_changes[0].at, Duration::from_secs(30));
    assert_eq!(report.link_changes[1].at, Duration::from_secs(60));
    assert_eq!(report.simulated_time, Duration::from_secs(90));
    assert!(!report.cancelled);
    assert_eq!(report.seed, 7);
    assert!(report.violations.is_empty(), "{:?}", report.violations);
}

#[test]
fn test_same_seed_same_report() {
    let topology = scenarios::classic().unwrap();

    let first = SimulationDriver::new(&topology, seeded_config(99), NullObserver)
        .unwrap()
        .run()
        .unwrap();
    let second = SimulationDriver::new(&topology, seeded_config(99), NullObserver)
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_exchange_runs_before_mutation_at_same_instant() {
    let topology = scenarios::classic().unwrap();
    let mut config = seeded_config(3);
    config.simulation.duration = Duration::from_secs(31);
    config.simulation.exchange_interval = Duration::from_secs(30);
    config.simulation.mutation_interval = Duration::from_secs(30);

    let mut driver = SimulationDriver::new(&topology, config, RecordingObserver::new()).unwrap();
    driver.run().unwrap();
    let events = driver.into_observer().events().to_vec();

    let first_round = events
        .iter()
        .position(|e| matches!(e, RouteEvent::RoundStart { .. }))
        .unwrap();
    let link_change = events
        .iter()
        .position(|e| matches!(e, RouteEvent::LinkCostChanged { .. }))
        .unwrap();
    assert!(first_round < link_change);
    assert_eq!(events[first_round], RouteEvent::RoundStart { round: 1 });
}

#[test]
fn test_manual_ticks_reproduce_classic_scenario() {
    let topology = scenarios::classic().unwrap();
    let mut driver = SimulationDriver::new(&topology, seeded_config(1), NullObserver).unwrap();

    let tick = driver.trigger_exchange_round();
    assert_eq!(tick.round.round, 1);
    assert_eq!(tick.round.messages_sent, 10);
    assert_eq!(tick.round.routes_changed, 4);
    assert_eq!(tick.settle, Some(ConvergenceStatus::Converged { rounds: 1 }));

    let table = driver.network().routing_table(&node("A")).unwrap();
    assert_eq!(table.cost_to(&node("C")), Cost::new(3));
    assert_eq!(table.get(&node("C")).unwrap().next_hop, Some(node("B")));
    assert_eq!(table.cost_to(&node("D")), Cost::new(5));

    let edge = EdgeKey::new(node("B"), node("C"));
    let tick = driver
        .trigger_link_mutation(Some(edge.clone()), Some(Cost::new(8)))
        .unwrap();
    assert_eq!(tick.change.edge, edge);
    assert_eq!(tick.change.old_cost, Cost::new(1));
    assert_eq!(tick.change.new_cost, Cost::new(8));
    assert_eq!(tick.forced_round.routes_changed, 6);
    assert_eq!(tick.convergence, ConvergenceStatus::Converged { rounds: 1 });

    let table = driver.network().routing_table(&node("A")).unwrap();
    assert_eq!(table.cost_to(&node("C")), Cost::new(5));
    assert_eq!(table.get(&node("C")).unwrap().next_hop, Some(node("C")));
    assert_eq!(table.cost_to(&node("D")), Cost::new(5));
}

#[test]
fn test_manual_mutation_rejects_unknown_link() {
    let topology = scenarios::classic().unwrap();
    let mut driver = SimulationDriver::new(&topology, seeded_config(1), NullObserver).unwrap();

    let err = driver
        .trigger_link_mutation(Some(EdgeKey::new(node("A"), node("D"))), Some(Cost::new(4)))
        .unwrap_err();
    assert!(matches!(err, SimulationError::Routing(_)));
    assert_eq!(driver.network().rounds(), 0);
}

#[test]
fn test_cancelled_before_start_still_reports() {
    let topology = scenarios::classic().unwrap();
    let mut driver = SimulationDriver::new(&topology, seeded_config(5), NullObserver).unwrap();
    driver.cancellation_flag().cancel();

    let report = driver.run().unwrap();

    assert!(report.cancelled);
    assert_eq!(report.simulated_time, Duration::ZERO);
    assert_eq!(report.metrics.exchange_ticks, 0);
    assert_eq!(report.final_status, ConvergenceStatus::Converged { rounds: 2 });
    assert!(report.summary().contains("(cancelled)"));
}

/// Requests a stop once the simulated clock reaches `at`.
struct StopAt {
    flag: CancellationFlag,
    at: Duration,
}

impl RoutingInvariant for StopAt {
    fn check(&self, _network: &Network, at: Duration) -> Result<(), InvariantViolation> {
        if at >= self.at {
            self.flag.cancel();
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "StopAt"
    }
}

#[test]
fn test_cancelled_mid_run_stops_at_next_tick() {
    let topology = scenarios::classic().unwrap();
    let mut driver =
        SimulationDriver::new(&topology, seeded_config(5), RecordingObserver::new()).unwrap();
    driver.add_invariant(Box::new(StopAt {
        flag: driver.cancellation_flag(),
        at: Duration::from_secs(20),
    }));

    let report = driver.run().unwrap();

    // Exchanges at 5, 10, 15 and 20s ran; the 25s tick saw the flag.
    assert!(report.cancelled);
    assert_eq!(report.simulated_time, Duration::from_secs(20));
    assert_eq!(report.metrics.exchange_ticks, 4);
    assert_eq!(report.metrics.mutation_ticks, 0);
    assert!(report.link_changes.is_empty());

    // The final convergence pass still ran on top of the four ticks.
    assert_eq!(report.final_status, ConvergenceStatus::Converged { rounds: 1 });
    assert_eq!(report.rounds, 5);
    assert!(report.violations.is_empty(), "{:?}", report.violations);
    assert!(report.summary().contains("(cancelled)"));

    let observer = driver.into_observer();
    assert_eq!(observer.count("ROUND_START"), 5);
    assert_eq!(observer.count("CONVERGED"), 1);
}

#[test]
fn test_run_twice_fails() {
    let topology = scenarios::classic().unwrap();
    let mut driver = SimulationDriver::new(&topology, seeded_config(5), NullObserver).unwrap();

    driver.run().unwrap();
    assert!(matches!(driver.run(), Err(SimulationError::AlreadyFinished)));
}

#[test]
fn test_invalid_configuration_rejected() {
    let topology = scenarios::classic().unwrap();

    let mut config = seeded_config(1);
    config.simulation.exchange_interval = Duration::ZERO;
    assert!(matches!(
        SimulationDriver::new(&topology, config, NullObserver),
        Err(SimulationError::InvalidConfiguration { .. })
    ));

    let mut config = seeded_config(1);
    config.mutation.min_cost = 50;
    config.mutation.max_cost = 10;
    assert!(matches!(
        SimulationDriver::new(&topology, config, NullObserver),
        Err(SimulationError::InvalidConfiguration { .. })
    ));
}

#[test]
fn test_mutation_without_alternative_cost_is_skipped() {
    let topology = Topology::from_records([undertow_core::EdgeRecord::new("A", "B", 1)]).unwrap();
    let mut config = seeded_config(2);
    config.mutation.min_cost = 1;
    config.mutation.max_cost = 1;

    let report = SimulationDriver::new(&topology, config, NullObserver)
        .unwrap()
        .run()
        .unwrap();

    assert!(report.link_changes.is_empty());
    assert_eq!(report.metrics.mutation_ticks, 0);
    assert!(report.converged());
}

#[test]
fn test_missing_seed_is_drawn_and_reported() {
    let topology = scenarios::classic().unwrap();
    let config = UndertowConfig::default();
    assert!(config.simulation.seed.is_none());

    let mut driver = SimulationDriver::new(&topology, config, NullObserver).unwrap();
    let seed = driver.seed();
    let report = driver.run().unwrap();
    assert_eq!(report.seed, seed);
}

#[test]
fn test_report_summary_and_json() {
    let topology = scenarios::classic().unwrap();
    let report = SimulationDriver::new(&topology, seeded_config(7), NullObserver)
        .unwrap()
        .run()
        .unwrap();

    let summary = report.summary();
    assert!(summary.contains("Simulation Report (seed: 7)"));
    assert!(summary.contains("Link cost changes: 2"));
    assert!(summary.contains("Router | Sent | Received | Total"));

    let parsed: SimulationReport = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(parsed.routers, report.routers);
    assert_eq!(parsed.link_changes, report.link_changes);
    assert_eq!(parsed.final_status, report.final_status);
    assert_eq!(parsed.metrics.events_by_type, report.metrics.events_by_type);
}
