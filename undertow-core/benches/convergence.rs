use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use undertow_core::{ConvergenceDetector, EdgeRecord, Network, NullObserver, Topology};

fn grid(side: usize) -> Topology {
    let name = |row: usize, col: usize| format!("R{row:02}{col:02}");
    let mut records = Vec::new();
    for row in 0..side {
        for col in 0..side {
            let cost = ((row * 7 + col * 3) % 9 + 1) as i64;
            if col + 1 < side {
                records.push(EdgeRecord::new(name(row, col), name(row, col + 1), cost));
            }
            if row + 1 < side {
                records.push(EdgeRecord::new(name(row, col), name(row + 1, col), cost + 1));
            }
        }
    }
    Topology::from_records(records).expect("grid topology is valid")
}

fn bench_grid_convergence(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid_convergence");
    for side in [4, 8, 12] {
        let topology = grid(side);
        let bound = topology.stats().convergence_round_bound();
        group.bench_with_input(BenchmarkId::from_parameter(side), &topology, |b, topology| {
            b.iter(|| {
                let mut network = Network::from_topology(topology);
                let status = ConvergenceDetector::new(bound).run(&mut network, &mut NullObserver);
                black_box(status)
            });
        });
    }
    group.finish();
}

fn bench_single_round(c: &mut Criterion) {
    let topology = grid(8);
    c.bench_function("exchange_round_grid_8", |b| {
        b.iter_batched(
            || Network::from_topology(&topology),
            |mut network| black_box(network.exchange_round(&mut NullObserver)),
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_grid_convergence, bench_single_round);
criterion_main!(benches);
