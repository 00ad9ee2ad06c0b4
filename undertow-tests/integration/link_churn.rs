//! Link cost changes on a converged network.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use undertow_core::{
    ConvergenceDetector, ConvergenceStatus, Cost, CostRange, EdgeKey, LinkCostMutator, Network,
    NodeId, NullObserver, RecordingObserver, RouteEvent, RoutingError,
};
use undertow_sim::scenarios;

fn node(name: &str) -> NodeId {
    NodeId::from(name)
}

fn converged_classic() -> Network {
    let mut network = Network::from_topology(&scenarios::classic().unwrap());
    let status = ConvergenceDetector::new(10).run(&mut network, &mut NullObserver);
    assert_eq!(status, ConvergenceStatus::Converged { rounds: 2 });
    network
}

#[test]
fn test_classic_increase_reroutes_over_direct_link() {
    let mut network = converged_classic();
    let mut observer = RecordingObserver::new();
    let edge = EdgeKey::new(node("B"), node("C"));

    let change = LinkCostMutator::default()
        .mutate(&mut network, &edge, Cost::new(8), &mut observer)
        .unwrap();
    assert_eq!(change.old_cost, Cost::new(1));
    assert_eq!(network.link_cost(&node("C"), &node("B")).unwrap(), Cost::new(8));

    // The link change is announced before the endpoints' cascades.
    assert!(matches!(
        observer.events().first(),
        Some(RouteEvent::LinkCostChanged { .. })
    ));
    let cascade: Vec<(NodeId, NodeId, Cost)> = observer
        .events()
        .iter()
        .filter_map(|event| match event {
            RouteEvent::RouteChanged {
                router,
                dest,
                new_cost,
                ..
            } => Some((router.clone(), dest.clone(), *new_cost)),
            _ => None,
        })
        .collect();
    assert_eq!(cascade.len(), 3);
    assert!(cascade.contains(&(node("B"), node("C"), Cost::new(8))));
    assert!(cascade.contains(&(node("C"), node("B"), Cost::new(8))));
    assert!(cascade.contains(&(node("C"), node("A"), Cost::new(10))));

    assert_eq!(
        network.all_pairs_shortest_cost(),
        Err(RoutingError::NotConverged)
    );

    let status = ConvergenceDetector::new(10).run(&mut network, &mut observer);
    assert!(status.is_converged());

    let a = network.routing_table(&node("A")).unwrap();
    assert_eq!(a.cost_to(&node("C")), Cost::new(5));
    assert_eq!(a.get(&node("C")).unwrap().next_hop, Some(node("C")));
    assert_eq!(a.cost_to(&node("D")), Cost::new(5));
    assert_eq!(a.get(&node("D")).unwrap().next_hop, Some(node("B")));

    let b = network.routing_table(&node("B")).unwrap();
    assert_eq!(b.cost_to(&node("C")), Cost::new(5));
    assert_eq!(b.get(&node("C")).unwrap().next_hop, Some(node("D")));

    let matrix = network.all_pairs_shortest_cost().unwrap();
    assert_eq!(matrix.cost(&node("C"), &node("A")), Some(Cost::new(5)));
}

#[test]
fn test_rejected_changes_leave_network_untouched() {
    let mut network = converged_classic();
    let mutator = LinkCostMutator::new(CostRange::new(1, 50).unwrap());
    let before = network.routing_table(&node("A")).unwrap().clone();
    let mut observer = RecordingObserver::new();

    let bc = EdgeKey::new(node("B"), node("C"));
    assert!(matches!(
        mutator.mutate(&mut network, &bc, Cost::new(1), &mut observer),
        Err(RoutingError::UnchangedCost { .. })
    ));
    assert!(matches!(
        mutator.mutate(&mut network, &bc, Cost::new(51), &mut observer),
        Err(RoutingError::CostOutOfRange { .. })
    ));
    assert!(matches!(
        mutator.mutate(&mut network, &bc, Cost::ZERO, &mut observer),
        Err(RoutingError::InvalidCost { .. })
    ));
    assert!(matches!(
        mutator.mutate(
            &mut network,
            &EdgeKey::new(node("A"), node("D")),
            Cost::new(4),
            &mut observer
        ),
        Err(RoutingError::NotNeighbors { .. })
    ));
    assert!(matches!(
        mutator.mutate(
            &mut network,
            &EdgeKey::new(node("A"), node("Z")),
            Cost::new(4),
            &mut observer
        ),
        Err(RoutingError::UnknownNode { .. })
    ));

    assert!(observer.events().is_empty());
    assert_eq!(network.routing_table(&node("A")).unwrap(), &before);
    assert!(network.is_converged());
}

#[test]
fn test_seeded_churn_on_grid_keeps_tables_correct() {
    let mut network = Network::from_topology(&scenarios::grid(4).unwrap());
    let mutator = LinkCostMutator::new(CostRange::new(1, 10).unwrap());
    let mut rng = ChaCha8Rng::seed_from_u64(2024);
    ConvergenceDetector::new(100).run(&mut network, &mut NullObserver);

    for _ in 0..20 {
        mutator
            .mutate_random(&mut network, &mut rng, &mut NullObserver)
            .unwrap();
        let status = ConvergenceDetector::new(500).run(&mut network, &mut NullObserver);
        assert!(status.is_converged());

        let matrix = network.all_pairs_shortest_cost().unwrap();
        for source in network.node_ids() {
            let reference = network.reference_paths(source).unwrap();
            for (dest, cost) in matrix.row(source).unwrap() {
                assert_eq!(*cost, reference.cost_to(dest), "{source} -> {dest}");
            }
        }
    }
}
