//! Benchmarks for trust discovery.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use reconchain::core::{dedup_by_sid, EnumerationDomain};
use reconchain::directory::TrustType;
use reconchain::discovery::TrustDiscovery;
use reconchain::testing::FakeDirectory;
use std::sync::Arc;

/// A ring of `n` domains where every domain also trusts the root.
fn ring_directory(n: usize) -> FakeDirectory {
    let name = |i: usize| format!("d{i}.local");
    let mut directory = FakeDirectory::new(name(0));
    for i in 0..n {
        directory = directory.with_domain(name(i), format!("S-1-5-21-{i}"));
    }
    for i in 0..n {
        directory = directory
            .with_trust(&name(i), name((i + 1) % n), TrustType::External)
            .with_trust(&name(i), name(0), TrustType::ParentChild);
    }
    directory
}

fn discovery_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime");

    let mut group = c.benchmark_group("recursive_domains");
    for n in [10, 100, 1000] {
        let discovery = TrustDiscovery::new(Arc::new(ring_directory(n)));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| black_box(runtime.block_on(discovery.recursive_domains())))
        });
    }
    group.finish();

    let duplicated: Vec<EnumerationDomain> = (0..5000)
        .map(|i| EnumerationDomain::new(format!("D{i}"), format!("S-{}", i % 500)))
        .collect();
    c.bench_function("dedup_by_sid_5000", |b| {
        b.iter(|| black_box(dedup_by_sid(duplicated.clone())))
    });
}

criterion_group!(benches, discovery_benchmark);
criterion_main!(benches);
