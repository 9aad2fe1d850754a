use blastwire_core::prelude::*;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

/// Detonator in the corner of an n x n sheet of wire, charge in the far corner
fn wired_sheet(n: i32) -> (NetworkEngine, hecs::Entity) {
    let mut engine = NetworkEngine::with_seed(n, n, NetworkSettings::default(), 9);
    let lever = engine.place_detonator(Cell::new(0, 0)).expect("lever");
    for x in 0..n {
        for z in 0..n {
            engine.place_wire(Cell::new(x, z)).expect("wire");
        }
    }
    engine
        .place_wired_charge(Cell::new(n - 1, n - 1), 1)
        .expect("charge");
    (engine, lever)
}

/// n x n mesh of relays spaced 4 apart, each reaching its neighbours
fn relay_mesh(n: i32) -> (NetworkEngine, hecs::Entity) {
    let size = n * 4 + 1;
    let mut engine = NetworkEngine::with_seed(size, size, NetworkSettings::default(), 9);
    let mut first = None;
    for x in 0..n {
        for z in 0..n {
            let cell = Cell::new(x * 4, z * 4);
            let node = engine
                .place_table(cell, WirelessNodeDef::relay(4.5), 1)
                .expect("node");
            engine.place_charge(Cell::new(x * 4 + 1, z * 4), 1).expect("charge");
            first.get_or_insert(node);
        }
    }
    (engine, first.expect("at least one node"))
}

fn bench_wired_flood(c: &mut Criterion) {
    let mut group = c.benchmark_group("wired_flood");
    for &n in &[16i32, 64, 128] {
        group.throughput(Throughput::Elements((n * n) as u64));
        let (mut engine, lever) = wired_sheet(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                let outcome = engine.fire(black_box(lever)).expect("fire");
                assert_eq!(outcome.target_count(), 1);
            })
        });
    }
    group.finish();
}

fn bench_wireless_reach(c: &mut Criterion) {
    let mut group = c.benchmark_group("wireless_reach");
    for &n in &[4i32, 16, 32] {
        group.throughput(Throughput::Elements((n * n) as u64));
        let (engine, start) = relay_mesh(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| {
                let found = engine
                    .find_receivers_in_network_range(black_box(start))
                    .expect("range");
                assert_eq!(found.len(), (n * n) as usize);
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_wired_flood, bench_wireless_reach);
criterion_main!(benches);
