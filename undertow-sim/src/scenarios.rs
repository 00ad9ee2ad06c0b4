//! Topology builders for simulations, tests and benchmarks.

use rand::Rng;
use undertow_core::{EdgeRecord, Topology, TopologyError};

/// Four routers, five links: A-B 2, A-C 5, B-C 1, B-D 3, C-D 2.
///
/// A reaches C cheaper through B than over its direct link, which makes this
/// the smallest topology where relaxation and link churn are both visible.
///
/// # Errors
/// Never fails in practice; the error is kept to match the other builders.
pub fn classic() -> Result<Topology, TopologyError> {
    Topology::from_records([
        EdgeRecord::new("A", "B", 2),
        EdgeRecord::new("A", "C", 5),
        EdgeRecord::new("B", "C", 1),
        EdgeRecord::new("B", "D", 3),
        EdgeRecord::new("C", "D", 2),
    ])
}

/// Routers `R00 - R01 - ... - R(n-1)` joined by unit-cost links.
///
/// # Errors
/// - `TopologyError::Empty` - Fewer than two routers requested
pub fn chain(n: usize) -> Result<Topology, TopologyError> {
    Topology::from_records((1..n).map(|i| EdgeRecord::new(name(i - 1), name(i), 1)))
}

/// Chain closed into a cycle.
///
/// # Errors
/// - `TopologyError::Empty` - Fewer than two routers requested
pub fn ring(n: usize) -> Result<Topology, TopologyError> {
    let closing = (n > 2).then(|| EdgeRecord::new(name(n - 1), name(0), 1));
    Topology::from_records(
        (1..n)
            .map(|i| EdgeRecord::new(name(i - 1), name(i), 1))
            .chain(closing),
    )
}

/// `side × side` grid with unit-cost links between horizontal and vertical
/// neighbors.
///
/// # Errors
/// - `TopologyError::Empty` - `side` below two
pub fn grid(side: usize) -> Result<Topology, TopologyError> {
    let mut records = Vec::new();
    for row in 0..side {
        for col in 0..side {
            let here = row * side + col;
            if col + 1 < side {
                records.push(EdgeRecord::new(name(here), name(here + 1), 1));
            }
            if row + 1 < side {
                records.push(EdgeRecord::new(name(here), name(here + side), 1));
            }
        }
    }
    Topology::from_records(records)
}

/// Random connected topology: a random spanning tree over `n` routers plus up
/// to `extra` additional links, every cost drawn from `1..=max_cost`.
///
/// Extra links that would duplicate an existing pair are dropped.
///
/// # Errors
/// - `TopologyError::Empty` - Fewer than two routers requested
pub fn random_connected<R: Rng>(
    n: usize,
    extra: usize,
    max_cost: u32,
    rng: &mut R,
) -> Result<Topology, TopologyError> {
    let max_cost = i64::from(max_cost.max(1));
    let mut pairs = std::collections::BTreeSet::new();
    let mut records = Vec::new();

    for i in 1..n {
        let parent = rng.random_range(0..i);
        pairs.insert((parent, i));
        records.push(EdgeRecord::new(
            name(parent),
            name(i),
            rng.random_range(1..=max_cost),
        ));
    }

    if n > 2 {
        for _ in 0..extra {
            let a = rng.random_range(0..n);
            let b = rng.random_range(0..n);
            let pair = (a.min(b), a.max(b));
            if a == b || !pairs.insert(pair) {
                continue;
            }
            records.push(EdgeRecord::new(
                name(pair.0),
                name(pair.1),
                rng.random_range(1..=max_cost),
            ));
        }
    }

    Topology::from_records(records)
}

fn name(index: usize) -> String {
    format!("R{index:02}")
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use undertow_core::NodeId;

    use super::*;

    #[test]
    fn test_classic_shape() {
        let topology = classic().unwrap();
        assert_eq!(topology.nodes().len(), 4);
        assert_eq!(topology.edge_count(), 5);
        assert_eq!(
            topology
                .link_cost(&NodeId::from("B"), &NodeId::from("C"))
                .map(|c| c.as_u32()),
            Some(1)
        );
    }

    #[test]
    fn test_builder_sizes() {
        assert_eq!(chain(5).unwrap().edge_count(), 4);
        assert_eq!(ring(5).unwrap().edge_count(), 5);
        assert_eq!(ring(2).unwrap().edge_count(), 1);
        assert_eq!(grid(3).unwrap().edge_count(), 12);
        assert_eq!(grid(3).unwrap().nodes().len(), 9);
        assert_eq!(chain(1), Err(TopologyError::Empty));
    }

    #[test]
    fn test_random_connected_is_connected_and_seeded() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let topology = random_connected(12, 6, 20, &mut rng).unwrap();
        assert_eq!(topology.nodes().len(), 12);
        assert!(topology.edge_count() >= 11);

        let source = NodeId::from("R00");
        let paths = topology.shortest_paths(&source);
        for node in topology.nodes() {
            assert!(paths.cost_to(node).is_finite(), "{node} unreachable");
        }

        let mut again = ChaCha8Rng::seed_from_u64(11);
        assert_eq!(random_connected(12, 6, 20, &mut again).unwrap(), topology);
    }

    mod proptests {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]

            #[test]
            fn random_topologies_are_connected(
                nodes in 2..20usize,
                extra in 0..20usize,
                seed in any::<u64>(),
            ) {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                let topology = random_connected(nodes, extra, 50, &mut rng).unwrap();
                let stats = topology.stats();
                prop_assert!(stats.connected);
                prop_assert_eq!(stats.node_count, nodes);
                prop_assert!(stats.edge_count >= nodes - 1);
            }
        }
    }
}
