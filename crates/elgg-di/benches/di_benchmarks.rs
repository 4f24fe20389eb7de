//! Performance benchmarks for the DI container

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use elgg_di::{DIContainer, DIResult};
use std::sync::Arc;

/// Simple test service for benchmarking
#[derive(Debug, Clone)]
struct TestService {
    id: u32,
    data: Vec<u8>,
}

impl TestService {
    fn new(id: u32) -> Self {
        Self {
            id,
            data: vec![0; 1024], // 1KB of data
        }
    }
}

fn benchmark_service_definition(c: &mut Criterion) {
    c.bench_function("define_singleton_service", |b| {
        b.iter(|| {
            let container = DIContainer::new();
            let result = container.define("db", |_| Ok(Arc::new(TestService::new(black_box(42)))));
            black_box(result)
        })
    });

    c.bench_function("define_value_service", |b| {
        b.iter(|| {
            let container = DIContainer::new();
            let result = container.define_value("config", Arc::new(TestService::new(black_box(42))));
            black_box(result)
        })
    });
}

fn benchmark_service_resolution(c: &mut Criterion) {
    let container = DIContainer::new();
    container
        .define("db", |_| Ok(Arc::new(TestService::new(42))))
        .unwrap();
    container
        .define_transient("queryCounter", |_| Ok(Arc::new(TestService::new(42))))
        .unwrap();

    c.bench_function("resolve_cached_singleton", |b| {
        b.iter(|| {
            let result: DIResult<Arc<TestService>> = container.resolve(black_box("db"));
            black_box(result.map(|s| s.id + s.data.len() as u32))
        })
    });

    c.bench_function("resolve_transient_service", |b| {
        b.iter(|| {
            let result: DIResult<Arc<TestService>> = container.resolve(black_box("queryCounter"));
            black_box(result.map(|s| s.id))
        })
    });
}

fn benchmark_dependency_chain(c: &mut Criterion) {
    c.bench_function("resolve_fresh_chain_of_10", |b| {
        b.iter(|| {
            let container = DIContainer::new();
            for i in 0..10u32 {
                container
                    .define(format!("service{}", i), move |c| {
                        if i > 0 {
                            c.resolve::<TestService>(&format!("service{}", i - 1))?;
                        }
                        Ok(Arc::new(TestService::new(i)))
                    })
                    .unwrap();
            }
            black_box(container.resolve::<TestService>("service9").map(|s| s.id))
        })
    });
}

criterion_group!(
    benches,
    benchmark_service_definition,
    benchmark_service_resolution,
    benchmark_dependency_chain
);
criterion_main!(benches);
