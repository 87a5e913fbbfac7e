//! Performance benchmarks for admission control
//!
//! Measures the per-request admission decision and the background sweep.

use blogify_core::AdmissionConfig;
use blogify_web::{AdmissionController, ClientKey};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

fn controller(max_requests: usize) -> AdmissionController {
    AdmissionController::new(&AdmissionConfig {
        window_ms: 60_000,
        max_requests,
        ..AdmissionConfig::default()
    })
}

/// Admission decisions for a single hot client and for many distinct clients
fn benchmark_admit(c: &mut Criterion) {
    let mut group = c.benchmark_group("admit");

    group.bench_function("single_client_at_limit", |b| {
        let admission = controller(100);
        let key = ClientKey::new("10.0.0.1");
        let mut now = 0u64;
        b.iter(|| {
            now += 1;
            black_box(admission.admit(&key, now))
        })
    });

    for clients in [100usize, 10_000] {
        group.bench_with_input(BenchmarkId::new("spread_clients", clients), &clients, |b, &n| {
            let admission = controller(100);
            let keys: Vec<ClientKey> = (0..n).map(|i| ClientKey::new(format!("10.0.{}", i))).collect();
            let mut i = 0usize;
            b.iter(|| {
                i = (i + 1) % n;
                black_box(admission.admit(&keys[i], i as u64))
            })
        });
    }

    group.finish();
}

/// Sweeping a populated table where half of the clients have gone idle
fn benchmark_compact(c: &mut Criterion) {
    c.bench_function("compact_10k_clients", |b| {
        b.iter_batched(
            || {
                let admission = controller(10);
                for i in 0..10_000u64 {
                    let key = ClientKey::new(format!("client-{}", i));
                    let at = if i % 2 == 0 { 0 } else { 50_000 };
                    admission.admit(&key, at);
                }
                admission
            },
            |admission| black_box(admission.compact(90_000)),
            criterion::BatchSize::LargeInput,
        )
    });
}

criterion_group!(benches, benchmark_admit, benchmark_compact);
criterion_main!(benches);
