//! Throughput benchmarks for the matching kernel and the WAL append path.

use criterion::{criterion_group, criterion_main, Criterion};
use matching_core::prelude::*;
use std::sync::Arc;
use tempfile::tempdir;

fn engine(dir: &std::path::Path) -> MatchingEngine {
    let config = EngineConfig::new(dir, DurabilityModeConfig::Async, StpPolicy::Allow);
    MatchingEngine::new(1, 1 << 24, config, Arc::new(NoopTradingShard::new())).unwrap()
}

fn bench_resting_inserts(c: &mut Criterion) {
    c.bench_function("process_order/resting_limit", |b| {
        let dir = tempdir().unwrap();
        let engine = engine(dir.path());
        let mut id = 1u64;
        b.iter(|| {
            engine
                .process_order(id, 1, Side::Buy, OrderType::Limit, 1_000 + (id as i64 % 50), 10)
                .unwrap();
            id += 1;
        });
    });
}

fn bench_crossing_orders(c: &mut Criterion) {
    c.bench_function("process_order/aggressive_cross", |b| {
        let dir = tempdir().unwrap();
        let engine = engine(dir.path());
        let mut id = 1u64;
        b.iter(|| {
            engine
                .process_order(id, 1, Side::Sell, OrderType::Limit, 100, 10)
                .unwrap();
            id += 1;
            engine
                .process_order(id, 2, Side::Buy, OrderType::Limit, 100, 10)
                .unwrap();
            id += 1;
        });
    });
}

fn bench_cancel(c: &mut Criterion) {
    c.bench_function("cancel_order", |b| {
        let dir = tempdir().unwrap();
        let engine = engine(dir.path());
        let mut id = 1u64;
        b.iter(|| {
            engine
                .process_order(id, 1, Side::Buy, OrderType::Limit, 1_000, 10)
                .unwrap();
            engine.cancel_order(id, 1).unwrap();
            id += 1;
        });
    });
}

criterion_group!(benches, bench_resting_inserts, bench_crossing_orders, bench_cancel);
criterion_main!(benches);
