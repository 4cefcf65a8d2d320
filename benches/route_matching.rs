//! Route matching benchmark suite.
//!
//! Measures the three hot paths of a request:
//! - Pattern compilation at registration time
//! - First-match lookup over tables of growing size
//! - Full dispatch through the registry to a handler
//!
//! Run with: cargo bench --bench route_matching
//! Results saved to: target/criterion/

use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use scheme_router::route::{Method, RouteTable};
use scheme_router::{ProtocolRegistry, RawRequest, RoutePattern, Router};
use tokio::runtime::Runtime;

// ============================================================================
// Benchmark Parameters
// ============================================================================

const TABLE_SIZES: &[usize] = &[1, 10, 100];

const PATTERNS: &[&str] = &[
    "/db/issues",
    "/db/issues/:id",
    "/db/issues/:id/periods/:period",
    "/static/*",
    r"/literal/\:colon/\*star",
];

// ============================================================================
// Benchmark: Compile
// ============================================================================

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");

    for pattern in PATTERNS {
        group.bench_with_input(BenchmarkId::from_parameter(pattern), pattern, |b, p| {
            b.iter(|| RoutePattern::compile(black_box(p)));
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Lookup
// ============================================================================

fn table_of(size: usize) -> RouteTable {
    let mut table = RouteTable::new();
    for i in 0..size {
        table
            .register(Method::Get, &format!("/db/table{i}/:id"), Arc::new(|_, _| {}))
            .expect("register");
    }
    table
}

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_match");

    for &size in TABLE_SIZES {
        let table = table_of(size);
        let last = format!("/db/table{}/42", size - 1);

        group.bench_with_input(BenchmarkId::new("last", size), &last, |b, path| {
            b.iter(|| table.find_match(Method::Get, black_box(path)).is_some());
        });
        group.bench_with_input(BenchmarkId::new("miss", size), &size, |b, _| {
            b.iter(|| table.find_match(Method::Get, black_box("/nowhere")).is_none());
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Dispatch
// ============================================================================

fn bench_dispatch(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");

    let registry = ProtocolRegistry::new();
    let mut router = Router::new();
    router
        .get("/db/issues/:id", |req, res| {
            let _ = res.send(req.param("id").unwrap_or_default().to_string());
        })
        .expect("register");
    router.listen(&registry).expect("listen");

    c.bench_function("dispatch", |b| {
        b.to_async(&rt).iter(|| async {
            registry
                .dispatch(RawRequest::new("GET", "backend:/db/issues/7"))
                .await
                .expect("dispatch")
        });
    });
}

criterion_group!(benches, bench_compile, bench_lookup, bench_dispatch);
criterion_main!(benches);
