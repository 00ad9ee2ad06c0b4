//! Property tests: converged tables match an independent shortest-path search.

use std::collections::BTreeMap;

use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use undertow_core::{
    ConvergenceDetector, Cost, LinkCostMutator, Network, NodeId, NullObserver, Topology,
};
use undertow_sim::scenarios;

fn random_topology(nodes: usize, extra: usize, seed: u64) -> Topology {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    scenarios::random_connected(nodes, extra, 20, &mut rng).unwrap()
}

/// Panics with the first table entry that disagrees with Dijkstra.
fn assert_matches_reference(network: &Network) {
    for source in network.node_ids() {
        let reference = network.reference_paths(source).unwrap();
        let table = network.routing_table(source).unwrap();
        for dest in network.node_ids() {
            assert_eq!(
                table.cost_to(dest),
                reference.cost_to(dest),
                "{source} -> {dest}"
            );
        }
    }
}

fn table_costs(network: &Network) -> BTreeMap<(NodeId, NodeId), Cost> {
    let mut costs = BTreeMap::new();
    for source in network.node_ids() {
        for (dest, entry) in network.routing_table(source).unwrap() {
            costs.insert((source.clone(), dest.clone()), entry.cost);
        }
    }
    costs
}

/// Largest hop count over the current shortest paths between any two routers.
fn max_shortest_path_hops(network: &Network) -> usize {
    let mut hops = 0;
    for source in network.node_ids() {
        let reference = network.reference_paths(source).unwrap();
        for dest in network.node_ids() {
            let path = reference.path_to(dest).unwrap();
            hops = hops.max(path.len() - 1);
        }
    }
    hops
}

fn assert_no_cost_rose(
    before: &BTreeMap<(NodeId, NodeId), Cost>,
    after: &BTreeMap<(NodeId, NodeId), Cost>,
) {
    for (key, cost) in after {
        assert!(
            *cost <= before[key],
            "{} -> {} rose from {} to {}",
            key.0,
            key.1,
            before[key],
            cost
        );
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn converges_to_shortest_costs_within_bound(
        nodes in 2..10usize,
        extra in 0..10usize,
        seed in any::<u64>(),
    ) {
        let topology = random_topology(nodes, extra, seed);
        let bound = topology.stats().convergence_round_bound();
        let mut network = Network::from_topology(&topology);

        let status = ConvergenceDetector::new(bound).run(&mut network, &mut NullObserver);
        prop_assert!(status.is_converged(), "{status:?} with bound {bound}");
        assert_matches_reference(&network);

        let matrix = network.all_pairs_shortest_cost().unwrap();
        for source in topology.nodes() {
            let reference = topology.shortest_paths(source);
            for dest in topology.nodes() {
                prop_assert_eq!(matrix.cost(source, dest), Some(reference.cost_to(dest)));
            }
        }
    }

    #[test]
    fn quiescent_network_stays_put(
        nodes in 2..9usize,
        extra in 0..8usize,
        seed in any::<u64>(),
    ) {
        let topology = random_topology(nodes, extra, seed);
        let mut network = Network::from_topology(&topology);
        ConvergenceDetector::new(100).run(&mut network, &mut NullObserver);

        let before: Vec<_> = network
            .routers()
            .map(|router| router.routing_table().clone())
            .collect();
        let outcome = network.exchange_round(&mut NullObserver);
        let after: Vec<_> = network
            .routers()
            .map(|router| router.routing_table().clone())
            .collect();

        prop_assert_eq!(outcome.routes_changed, 0);
        prop_assert_eq!(before, after);
    }

    #[test]
    fn announcements_poison_routes_back_to_next_hop(
        nodes in 2..9usize,
        extra in 0..8usize,
        seed in any::<u64>(),
        rounds in 0..6usize,
    ) {
        let topology = random_topology(nodes, extra, seed);
        let mut network = Network::from_topology(&topology);
        for _ in 0..rounds {
            network.exchange_round(&mut NullObserver);
        }

        for router in network.routers() {
            for neighbor in router.neighbors().keys() {
                let announced = router.announce(neighbor);
                for (dest, entry) in router.routing_table() {
                    if dest != router.id() && entry.routes_through(neighbor) {
                        prop_assert!(
                            announced.get(dest).is_none_or(Cost::is_infinite),
                            "{} leaks {} back to {}",
                            router.id(),
                            dest,
                            neighbor
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn reconverges_after_cost_change(
        nodes in 3..8usize,
        extra in 1..6usize,
        seed in any::<u64>(),
        new_cost in 1..60u32,
    ) {
        let topology = random_topology(nodes, extra, seed);
        let mut network = Network::from_topology(&topology);
        ConvergenceDetector::new(100).run(&mut network, &mut NullObserver);

        let mut rng = ChaCha8Rng::seed_from_u64(seed ^ 0x5eed);
        let mutator = LinkCostMutator::default();
        let edge = mutator.pick_random_edge(&network, &mut rng).unwrap();
        let current = network.link_cost(edge.low(), edge.high()).unwrap();
        prop_assume!(current != Cost::new(new_cost));

        mutator
            .mutate(&mut network, &edge, Cost::new(new_cost), &mut NullObserver)
            .unwrap();
        let status = ConvergenceDetector::new(2_000).run(&mut network, &mut NullObserver);

        prop_assert!(status.is_converged(), "{status:?}");
        assert_matches_reference(&network);
    }

    #[test]
    fn lowered_link_only_lowers_costs(
        nodes in 3..10usize,
        extra in 0..10usize,
        seed in any::<u64>(),
        pick in any::<prop::sample::Index>(),
    ) {
        let topology = random_topology(nodes, extra, seed);
        let mut network = Network::from_topology(&topology);
        let status = ConvergenceDetector::new(200).run(&mut network, &mut NullObserver);
        prop_assert!(status.is_converged());

        let candidates: Vec<_> = topology
            .edges()
            .filter(|edge| edge.cost > Cost::new(1))
            .collect();
        prop_assume!(!candidates.is_empty());
        let edge = pick.get(&candidates).key.clone();

        let mut previous = table_costs(&network);
        LinkCostMutator::default()
            .mutate(&mut network, &edge, Cost::new(1), &mut NullObserver)
            .unwrap();
        let mut current = table_costs(&network);
        assert_no_cost_rose(&previous, &current);

        let bound = max_shortest_path_hops(&network) + 1;
        let mut quiescent = false;
        for _ in 0..bound {
            let outcome = network.exchange_round(&mut NullObserver);
            previous = current;
            current = table_costs(&network);
            assert_no_cost_rose(&previous, &current);
            if outcome.routes_changed == 0 {
                quiescent = true;
                break;
            }
        }

        prop_assert!(quiescent, "{edge:?} lowered to 1: still changing after {bound} rounds");
        assert_matches_reference(&network);
    }
}
