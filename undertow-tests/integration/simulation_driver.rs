//! Full simulation runs on generated topologies.

use std::time::Duration;

use undertow_core::{Network, NullObserver, RecordingObserver, UndertowConfig};
use undertow_sim::deterministic::{InvariantViolation, RoutingInvariant};
use undertow_sim::{SimulationDriver, scenarios};

fn config(seed: u64) -> UndertowConfig {
    let mut config = UndertowConfig::for_testing();
    config.simulation.seed = Some(seed);
    config.mutation.max_cost = 20;
    config
}

#[test]
fn test_observer_does_not_change_outcome() {
    let topology = scenarios::grid(3).unwrap();

    let mut quiet = SimulationDriver::new(&topology, config(17), NullObserver).unwrap();
    let quiet_report = quiet.run().unwrap();

    let mut recorded =
        SimulationDriver::new(&topology, config(17), RecordingObserver::new()).unwrap();
    let recorded_report = recorded.run().unwrap();

    assert_eq!(quiet_report, recorded_report);

    let observer = recorded.into_observer();
    for name in ["ROUND_START", "ROUTE_CHANGED", "LINK_COST_CHANGED", "CONVERGED"] {
        assert_eq!(
            recorded_report.metrics.count(name),
            observer.count(name) as u64,
            "{name}"
        );
    }
    assert_eq!(
        observer.count("ROUND_START") as u64,
        recorded_report.rounds
    );
}

#[test]
fn test_converged_run_matches_reference_paths() {
    let topology = scenarios::ring(7).unwrap();
    let mut driver = SimulationDriver::new(&topology, config(5), NullObserver).unwrap();
    let report = driver.run().unwrap();

    // for_testing: 60s with mutations at 30s only
    assert_eq!(report.link_changes.len(), 1);
    assert_eq!(report.metrics.exchange_ticks, 11);
    assert!(report.violations.is_empty(), "{:?}", report.violations);

    if report.converged() {
        let network: &Network = driver.network();
        let matrix = network.all_pairs_shortest_cost().unwrap();
        for source in network.node_ids() {
            let reference = network.reference_paths(source).unwrap();
            for dest in network.node_ids() {
                assert_eq!(matrix.cost(source, dest), Some(reference.cost_to(dest)));
            }
            assert_eq!(
                report.routers[source].table,
                *network.routing_table(source).unwrap()
            );
        }
    }
}

struct AlwaysViolated;

impl RoutingInvariant for AlwaysViolated {
    fn check(&self, _network: &Network, at: Duration) -> Result<(), InvariantViolation> {
        Err(self.violation("forced".to_string(), at))
    }

    fn name(&self) -> &str {
        "AlwaysViolated"
    }
}

#[test]
fn test_custom_invariant_violations_are_reported_not_fatal() {
    let topology = scenarios::classic().unwrap();
    let mut driver = SimulationDriver::new(&topology, config(9), NullObserver).unwrap();
    driver.add_invariant(Box::new(AlwaysViolated));

    let report = driver.run().unwrap();

    // 11 exchange ticks, 1 mutation tick, 1 final check
    assert_eq!(report.violations.len(), 13);
    assert!(report.violations.iter().all(|v| v.invariant == "AlwaysViolated"));
    assert_eq!(report.violations[0].at, Duration::from_secs(5));
    assert!(report.summary().contains("Invariant 'AlwaysViolated' violated at 5.0s: forced"));
}

#[test]
fn test_report_json_names_events() {
    let topology = scenarios::classic().unwrap();
    let report = SimulationDriver::new(&topology, config(3), NullObserver)
        .unwrap()
        .run()
        .unwrap();

    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(json["seed"], 3);
    assert!(json["metrics"]["events_by_type"]["ROUND_START"].as_u64().unwrap() > 0);
    assert!(json["final_status"]["status"].is_string());
    assert_eq!(json["routers"]["A"]["table"]["A"]["cost"], 0);
}
