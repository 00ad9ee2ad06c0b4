//! The task-per-router network must produce the tables of the sequential one.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use undertow_core::{
    ActorNetwork, ConvergenceDetector, Cost, LinkCostMutator, Network, NodeId, NullObserver,
    RecordingObserver, Topology,
};
use undertow_sim::scenarios;

async fn assert_same_tables(actors: &ActorNetwork, network: &Network) {
    for node in network.node_ids() {
        let actor_table = actors.routing_table(node).await.unwrap();
        assert_eq!(&actor_table, network.routing_table(node).unwrap(), "router {node}");
        assert_eq!(
            actors.message_counts(node).await.unwrap(),
            network.message_counts(node).unwrap()
        );
    }
}

async fn check_topology(topology: &Topology, seed: u64) {
    let mut network = Network::from_topology(topology);
    let mut actors = ActorNetwork::spawn(topology);

    let sequential = ConvergenceDetector::new(200).run(&mut network, &mut NullObserver);
    let concurrent = actors.converge(200, &mut NullObserver).await.unwrap();
    assert_eq!(sequential, concurrent);
    assert_eq!(network.total_messages(), actors.total_messages());
    assert_same_tables(&actors, &network).await;

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mutator = LinkCostMutator::default();
    for _ in 0..3 {
        let change = mutator
            .mutate_random(&mut network, &mut rng, &mut NullObserver)
            .unwrap();
        let mirrored = actors
            .set_link_cost(&change.edge, change.new_cost, &mut NullObserver)
            .await
            .unwrap();
        assert_eq!(mirrored, change);

        let sequential = ConvergenceDetector::new(2_000).run(&mut network, &mut NullObserver);
        let concurrent = actors.converge(2_000, &mut NullObserver).await.unwrap();
        assert_eq!(sequential, concurrent);
        assert_same_tables(&actors, &network).await;
    }

    actors.shutdown().await;
}

#[tokio::test]
async fn test_actor_network_matches_sequential_on_builders() {
    check_topology(&scenarios::classic().unwrap(), 1).await;
    check_topology(&scenarios::ring(6).unwrap(), 2).await;
    check_topology(&scenarios::grid(3).unwrap(), 3).await;
}

#[tokio::test]
async fn test_actor_network_matches_sequential_on_random_graphs() {
    for seed in 0..8u64 {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let topology = scenarios::random_connected(7, 5, 30, &mut rng).unwrap();
        check_topology(&topology, seed).await;
    }
}

#[tokio::test]
async fn test_actor_events_cover_same_route_changes() {
    let topology = scenarios::classic().unwrap();
    let mut network = Network::from_topology(&topology);
    let mut actors = ActorNetwork::spawn(&topology);

    let mut sequential = RecordingObserver::new();
    let mut concurrent = RecordingObserver::new();
    ConvergenceDetector::new(10).run(&mut network, &mut sequential);
    actors.converge(10, &mut concurrent).await.unwrap();

    assert_eq!(sequential.count("ROUTE_CHANGED"), 4);
    assert_eq!(concurrent.count("ROUTE_CHANGED"), 4);
    assert_eq!(concurrent.count("CONVERGED"), 1);

    let a = NodeId::from("A");
    let table = actors.routing_table(&a).await.unwrap();
    assert_eq!(table.cost_to(&NodeId::from("C")), Cost::new(3));
    assert_eq!(table.cost_to(&NodeId::from("D")), Cost::new(5));

    actors.shutdown().await;
}
